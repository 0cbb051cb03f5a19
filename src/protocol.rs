//! Contracts of the collaborators that feed a [`Results`].
//!
//! A [`Protocol`] is always used behind a `tokio::sync::Mutex`, which plays
//! the role of the connection lock: every round trip the aggregator starts
//! happens while that lock is held.

use std::future::Future;

use crate::{Result, Results};

/// Wire reader delivering statement outcomes into an aggregator.
pub trait Protocol: Send {
    type ResultSet: ResultSetSource;

    /// Whether results of the current command are still waiting to be read.
    fn has_more_results(&self) -> bool;

    /// Reads pending results into `results`, reporting each outcome through
    /// [`Results::record_outcome`], [`Results::record_failure`] or
    /// [`Results::record_result_set`] and finishing with
    /// [`Results::command_end`].
    fn read_next(
        &mut self,
        results: &mut Results<Self::ResultSet>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Result set whose rows may still be buffered on the wire.
pub trait ResultSetSource: Send {
    /// Output of a procedure call, kept apart from the backlog.
    fn is_callable(&self) -> bool;

    /// Discards rows not read yet. Closing twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Materializes every remaining row.
    fn fetch_remaining(&mut self) -> impl Future<Output = Result<()>> + Send;
}
