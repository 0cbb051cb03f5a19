use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    CmdInformation, ExecutionOptions, MultipleOutcomes, Outcome, OutcomeTracker, Protocol,
    Result, ResultSetSource, ResultsError, ScrollType, NO_UPDATE_COUNT,
};

/// Position of the caller in the results of a command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResultState {
    NoResult,
    HasUpdateCount,
    HasResultSet,
    Exhausted,
}

/// What happens to the active result set when moving to the next result.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CurrentResult {
    /// Close it, discarding rows not read yet.
    Close,
    /// Load its remaining rows and keep it available.
    Keep,
    /// Close it and every result set kept so far.
    CloseAll,
}

/// Results of one command: the outcome of every statement, the result sets
/// waiting to be delivered, and the caller's position among them.
#[derive(Debug)]
pub struct Results<R> {
    statement: Option<String>,
    options: ExecutionOptions,
    tracker: Option<OutcomeTracker>,
    backlog: VecDeque<R>,
    result_set: Option<R>,
    callable_result_set: Option<R>,
    kept: Vec<R>,
    state: ResultState,
}

impl<R: ResultSetSource> Results<R> {
    /// Results not attached to a statement.
    pub fn new(options: ExecutionOptions) -> Self {
        Self {
            statement: None,
            options,
            tracker: None,
            backlog: VecDeque::new(),
            result_set: None,
            callable_result_set: None,
            kept: Vec::new(),
            state: ResultState::NoResult,
        }
    }

    /// Results owned by the statement labelled `statement`; the label is
    /// attached to round-trip errors.
    pub fn for_statement(statement: impl Into<String>, options: ExecutionOptions) -> Self {
        Self {
            statement: Some(statement.into()),
            ..Self::new(options)
        }
    }

    /// Re-arms these results for a new command of the same statement.
    pub fn reset(&mut self, options: ExecutionOptions) {
        self.options = options;
        self.tracker = None;
        self.backlog.clear();
        self.result_set = None;
        self.callable_result_set = None;
        self.kept.clear();
        self.state = ResultState::NoResult;
    }

    /// Records the update count of a successful statement.
    pub fn record_outcome(
        &mut self,
        update_count: u64,
        generated_id: Option<i64>,
        more_pending: bool,
    ) {
        self.track(Outcome::UpdateCount(update_count), generated_id, more_pending);
    }

    /// Records a failed statement.
    pub fn record_failure(&mut self, more_pending: bool) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            statement = self.statement.as_deref().unwrap_or("<detached>"),
            "statement failed inside command"
        );

        self.track(Outcome::ExecuteFailed, None, more_pending);
    }

    /// Buffers a result set. Procedure-call output goes to its own slot and
    /// takes no position among the outcomes.
    pub fn record_result_set(&mut self, result_set: R, more_pending: bool) {
        if result_set.is_callable() {
            self.callable_result_set = Some(result_set);
            return;
        }
        self.backlog.push_back(result_set);
        self.track(Outcome::ResultSet, None, more_pending);
    }

    fn track(&mut self, outcome: Outcome, first_id: Option<i64>, more_pending: bool) {
        let expected_size = self.options.expected_size;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.record(outcome, first_id, expected_size);
            return;
        }
        let multiple = more_pending || self.options.batch || expected_size > 1;
        self.tracker = Some(OutcomeTracker::start(
            outcome,
            first_id,
            multiple,
            expected_size,
        ));
    }

    /// Marks the end of a statement: exposes the result set at the front of
    /// the outcomes, if any.
    pub fn command_end(&mut self) {
        if self.current_outcome() == Some(Outcome::ResultSet) {
            if self.result_set.is_none() {
                self.result_set = self.backlog.pop_front();
            }
        } else {
            self.result_set = None;
        }

        self.state = if self.result_set.is_some() {
            ResultState::HasResultSet
        } else if self.current_outcome().is_some() {
            ResultState::HasUpdateCount
        } else {
            ResultState::NoResult
        };
    }

    /// Moves to the next result of the command.
    ///
    /// Returns `true` when another update count or result set is now current,
    /// `false` once every outcome has been consumed. A failed statement counts
    /// as a result whose update count is [`EXECUTE_FAILED`](crate::EXECUTE_FAILED).
    pub async fn advance_results<P>(
        &mut self,
        current: CurrentResult,
        protocol: &Mutex<P>,
    ) -> Result<bool>
    where
        P: Protocol<ResultSet = R>,
    {
        let mut conn = protocol.lock().await;
        let released = self.release_and_read(current, &mut *conn).await;
        drop(conn);
        let released = released.map_err(|source| self.round_trip_error(source))?;

        let retired = self.retire(current, released).await;
        retired.map_err(|source| self.round_trip_error(source))?;

        let has_update_count = self.tracker.as_ref().is_some_and(|tracker| tracker.advance());
        if has_update_count {
            self.state = ResultState::HasUpdateCount;
            return Ok(true);
        }

        match self.current_outcome() {
            Some(Outcome::ResultSet) => {
                let Some(result_set) = self.backlog.pop_front() else {
                    self.state = ResultState::Exhausted;
                    return Err(ResultsError::ProtocolInconsistency(
                        "result set position without a buffered result set".to_owned(),
                    ));
                };
                self.result_set = Some(result_set);
                self.state = ResultState::HasResultSet;
                Ok(true)
            }
            Some(_) => {
                self.state = ResultState::HasUpdateCount;
                Ok(true)
            }
            None => {
                self.result_set = self.backlog.pop_front();
                self.state = if self.result_set.is_some() {
                    ResultState::HasResultSet
                } else {
                    ResultState::Exhausted
                };
                Ok(self.result_set.is_some())
            }
        }
    }

    /// Reads every result still pending on the wire.
    ///
    /// In partial-fetch mode the active result set (or the first buffered one)
    /// is closed when `discard` is set and fully loaded otherwise, and
    /// partial fetch is switched off.
    pub async fn load_all_pending<P>(&mut self, discard: bool, protocol: &Mutex<P>) -> Result<()>
    where
        P: Protocol<ResultSet = R>,
    {
        let mut conn = protocol.lock().await;
        let loaded = self.load_fully(discard, &mut *conn).await;
        drop(conn);
        loaded.map_err(|source| self.round_trip_error(source))
    }

    /// Releases the active result set in partial-fetch mode, then pulls in
    /// pending results. Returns whether a result set was released.
    async fn release_and_read<P>(&mut self, current: CurrentResult, conn: &mut P) -> Result<bool>
    where
        P: Protocol<ResultSet = R>,
    {
        let mut released = false;
        if self.options.fetch_size != 0 {
            if let Some(result_set) = self.result_set.as_mut() {
                match current {
                    CurrentResult::Keep => result_set.fetch_remaining().await?,
                    CurrentResult::Close | CurrentResult::CloseAll => result_set.close().await?,
                }
                released = true;
            }
        }
        if conn.has_more_results() {
            #[cfg(feature = "tracing")]
            tracing::debug!("reading pending results before advancing");

            conn.read_next(self).await?;
        }
        Ok(released)
    }

    async fn load_fully<P>(&mut self, discard: bool, conn: &mut P) -> Result<()>
    where
        P: Protocol<ResultSet = R>,
    {
        if self.options.fetch_size != 0 {
            self.options.fetch_size = 0;
            let head = self.result_set.as_mut().or(self.backlog.front_mut());
            if let Some(result_set) = head {
                if discard {
                    result_set.close().await?;
                } else {
                    result_set.fetch_remaining().await?;
                }
            }
        }
        while conn.has_more_results() {
            conn.read_next(self).await?;
        }
        Ok(())
    }

    /// Applies `current` to the active result set and the kept ones. The
    /// active slot is only emptied once every close succeeded.
    async fn retire(&mut self, current: CurrentResult, released: bool) -> Result<()> {
        if current != CurrentResult::Keep && !released {
            if let Some(result_set) = self.result_set.as_mut() {
                result_set.close().await?;
            }
        }
        if current == CurrentResult::CloseAll {
            for result_set in &mut self.kept {
                result_set.close().await?;
            }
            self.kept.clear();
        }

        let previous = self.result_set.take();
        if current == CurrentResult::Keep {
            self.kept.extend(previous);
        }
        Ok(())
    }

    fn round_trip_error(&self, source: ResultsError) -> ResultsError {
        ResultsError::RoundTrip {
            statement: self
                .statement
                .clone()
                .unwrap_or_else(|| "<closed>".to_owned()),
            source: Box::new(source),
        }
    }

    /// Detaches these results from their statement and leaves partial-fetch
    /// mode.
    pub fn close(&mut self) {
        self.statement = None;
        self.options.fetch_size = 0;
    }

    fn current_outcome(&self) -> Option<Outcome> {
        self.tracker.as_ref().and_then(|tracker| tracker.current())
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    pub fn tracker(&self) -> Option<&OutcomeTracker> {
        self.tracker.as_ref()
    }

    /// Handle for a reader appending outcomes from another thread, available
    /// once a multiple-outcome tracker exists.
    pub fn shared_outcomes(&self) -> Option<Arc<MultipleOutcomes>> {
        self.tracker.as_ref().and_then(OutcomeTracker::shared)
    }

    /// Outcomes recorded and not consumed yet.
    pub fn current_stat_number(&self) -> usize {
        self.tracker.as_ref().map_or(0, |tracker| tracker.len())
    }

    pub fn update_counts(&self) -> Vec<i32> {
        self.tracker
            .as_ref()
            .map_or_else(Vec::new, |tracker| tracker.update_counts())
    }

    pub fn large_update_counts(&self) -> Vec<i64> {
        self.tracker
            .as_ref()
            .map_or_else(Vec::new, |tracker| tracker.large_update_counts())
    }

    /// Current update count, or [`NO_UPDATE_COUNT`] when none is available.
    pub fn update_count(&self) -> i32 {
        self.tracker
            .as_ref()
            .map_or(NO_UPDATE_COUNT as i32, |tracker| tracker.update_count())
    }

    pub fn large_update_count(&self) -> i64 {
        self.tracker
            .as_ref()
            .map_or(NO_UPDATE_COUNT, |tracker| tracker.large_update_count())
    }

    /// Identifiers generated by the command, rebuilt with the configured
    /// auto-increment step.
    pub fn generated_keys(&self) -> Vec<i64> {
        self.tracker.as_ref().map_or_else(Vec::new, |tracker| {
            tracker.generated_keys(self.options.auto_increment_step)
        })
    }

    pub fn result_set(&self) -> Option<&R> {
        self.result_set.as_ref()
    }

    pub fn result_set_mut(&mut self) -> Option<&mut R> {
        self.result_set.as_mut()
    }

    pub fn callable_result_set(&self) -> Option<&R> {
        self.callable_result_set.as_ref()
    }

    pub fn callable_result_set_mut(&mut self) -> Option<&mut R> {
        self.callable_result_set.as_mut()
    }

    /// Result sets left open by [`CurrentResult::Keep`].
    pub fn kept_result_sets(&mut self) -> &mut [R] {
        &mut self.kept
    }

    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn fetch_size(&self) -> usize {
        self.options.fetch_size
    }

    pub fn remove_fetch_size(&mut self) {
        self.options.fetch_size = 0;
    }

    pub fn is_batch(&self) -> bool {
        self.options.batch
    }

    pub fn expected_size(&self) -> usize {
        self.options.expected_size
    }

    pub fn is_binary_format(&self) -> bool {
        self.options.binary_format
    }

    pub fn scroll_type(&self) -> ScrollType {
        self.options.scroll_type
    }

    pub fn max_field_size(&self) -> usize {
        self.options.max_field_size
    }

    pub fn auto_increment_step(&self) -> i64 {
        self.options.auto_increment_step
    }
}
