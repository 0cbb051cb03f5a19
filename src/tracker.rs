use std::sync::Arc;

use crate::{CmdInformation, MultipleOutcomes, Outcome, SingleOutcome};

/// Outcome tracker of one command, chosen when its first outcome arrives.
#[derive(Debug)]
pub enum OutcomeTracker {
    Single(SingleOutcome),
    Multiple(Arc<MultipleOutcomes>),
}

impl OutcomeTracker {
    /// Creates a tracker holding `outcome`; `multiple` selects the unbounded
    /// representation sized to `expected_size`.
    pub fn start(
        outcome: Outcome,
        first_id: Option<i64>,
        multiple: bool,
        expected_size: usize,
    ) -> Self {
        if multiple {
            let outcomes = MultipleOutcomes::new(expected_size);
            push(&outcomes, outcome, first_id);
            Self::Multiple(Arc::new(outcomes))
        } else {
            Self::Single(match outcome {
                Outcome::UpdateCount(count) => SingleOutcome::update(count, first_id),
                Outcome::ResultSet => SingleOutcome::result_set(),
                Outcome::ExecuteFailed => SingleOutcome::failure(),
            })
        }
    }

    /// Appends an outcome, promoting a single tracker when a second outcome
    /// shows up.
    pub fn record(&mut self, outcome: Outcome, first_id: Option<i64>, expected_size: usize) {
        if let Self::Single(single) = self {
            #[cfg(feature = "tracing")]
            tracing::debug!("second outcome for a single-outcome command, promoting tracker");

            let promoted = MultipleOutcomes::new(expected_size);
            if !single.is_consumed() {
                push(&promoted, single.outcome(), Some(single.first_id()));
            }
            *self = Self::Multiple(Arc::new(promoted));
        }
        if let Self::Multiple(outcomes) = self {
            push(outcomes, outcome, first_id);
        }
    }

    /// Shared handle on the multiple-outcome queues, for a reader appending
    /// from another thread.
    pub fn shared(&self) -> Option<Arc<MultipleOutcomes>> {
        match self {
            Self::Single(_) => None,
            Self::Multiple(outcomes) => Some(Arc::clone(outcomes)),
        }
    }

    fn inner(&self) -> &dyn CmdInformation {
        match self {
            Self::Single(single) => single as &dyn CmdInformation,
            Self::Multiple(outcomes) => outcomes.as_ref() as &dyn CmdInformation,
        }
    }
}

fn push(outcomes: &MultipleOutcomes, outcome: Outcome, first_id: Option<i64>) {
    match outcome {
        Outcome::UpdateCount(count) => outcomes.record_update(count, first_id),
        Outcome::ResultSet => outcomes.record_result_set(),
        Outcome::ExecuteFailed => outcomes.record_failure(),
    }
}

impl CmdInformation for OutcomeTracker {
    fn current(&self) -> Option<Outcome> {
        self.inner().current()
    }

    fn advance(&self) -> bool {
        self.inner().advance()
    }

    fn len(&self) -> usize {
        self.inner().len()
    }

    fn large_update_counts(&self) -> Vec<i64> {
        self.inner().large_update_counts()
    }

    fn generated_keys(&self, step: i64) -> Vec<i64> {
        self.inner().generated_keys(step)
    }
}
