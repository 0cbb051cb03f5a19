use std::sync::atomic::{AtomicBool, Ordering};

use crate::{
    outcome::{push_key_range, CmdInformation},
    Outcome,
};

/// Tracker for a command that produces exactly one outcome.
#[derive(Debug)]
pub struct SingleOutcome {
    outcome: Outcome,
    first_id: i64,
    consumed: AtomicBool,
}

impl SingleOutcome {
    pub fn update(count: u64, first_id: Option<i64>) -> Self {
        Self::new(Outcome::UpdateCount(count), first_id.unwrap_or(0))
    }

    pub fn failure() -> Self {
        Self::new(Outcome::ExecuteFailed, 0)
    }

    pub fn result_set() -> Self {
        Self::new(Outcome::ResultSet, 0)
    }

    fn new(outcome: Outcome, first_id: i64) -> Self {
        Self {
            outcome,
            first_id,
            consumed: AtomicBool::new(false),
        }
    }

    /// The recorded outcome, whether or not it was consumed.
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// First generated id, `0` when none was reported.
    pub fn first_id(&self) -> i64 {
        self.first_id
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }
}

impl CmdInformation for SingleOutcome {
    fn current(&self) -> Option<Outcome> {
        (!self.is_consumed()).then_some(self.outcome)
    }

    fn advance(&self) -> bool {
        self.consumed.store(true, Ordering::Release);
        false
    }

    fn len(&self) -> usize {
        1
    }

    fn large_update_counts(&self) -> Vec<i64> {
        vec![self.outcome.code()]
    }

    fn generated_keys(&self, step: i64) -> Vec<i64> {
        let mut keys = Vec::new();
        if let Outcome::UpdateCount(count) = self.outcome {
            if self.first_id != 0 {
                push_key_range(&mut keys, self.first_id, count, step);
            }
        }
        keys
    }
}
