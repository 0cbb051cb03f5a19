//! `pipeline-results` tracks what every statement of a multi-statement SQL
//! command produced and lets callers step through those results in order.
//!
//! - [`OutcomeTracker`] records update counts, generated keys, result-set
//!   positions and failures, and rebuilds generated identifiers.
//! - [`Results`] buffers result sets and drives "next result" iteration,
//!   pulling results still pending on the wire through a [`Protocol`].
//! - [`PipelineProtocol`] feeds [`Results`] from the Bunny.net Database
//!   `/v2/pipeline` HTTP API.

mod client;
mod decode;
mod error;
mod multiple;
mod options;
mod outcome;
mod params;
mod pipeline;
mod protocol;
mod results;
mod single;
mod tracker;
mod value;
mod wire;

pub use client::{db_id_to_pipeline_url, PipelineClient};
pub use error::ResultsError;
pub use multiple::MultipleOutcomes;
pub use options::{ClientOptions, ExecutionOptions, ScrollType};
pub use outcome::{CmdInformation, Outcome, EXECUTE_FAILED, NO_UPDATE_COUNT};
pub use params::{Params, Statement, StatementKind};
pub use pipeline::{Col, PipelineProtocol, PipelineResultSet};
pub use protocol::{Protocol, ResultSetSource};
pub use results::{CurrentResult, ResultState, Results};
pub use single::SingleOutcome;
pub use tracker::OutcomeTracker;
pub use value::Value;

pub type Result<T> = std::result::Result<T, ResultsError>;
