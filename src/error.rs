/// Error type returned by this crate.
///
/// A statement that fails inside a command is not an error: it is recorded as
/// an [`Outcome::ExecuteFailed`](crate::Outcome::ExecuteFailed) and surfaces as
/// the [`EXECUTE_FAILED`](crate::EXECUTE_FAILED) sentinel in update counts.
#[derive(Debug, thiserror::Error)]
pub enum ResultsError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// The pipeline rejected a request that is not a statement of the command.
    #[error("pipeline error at request {request_index}: {message}")]
    Pipeline {
        /// Index of the failing request in the pipeline payload.
        request_index: usize,
        /// Error message text from upstream API.
        message: String,
        /// Optional engine-specific error code.
        code: Option<String>,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// A round trip performed while advancing or loading results failed.
    #[error("round trip failed for {statement}: {source}")]
    RoundTrip {
        /// Label of the statement owning the results, `<closed>` once detached.
        statement: String,
        source: Box<ResultsError>,
    },
    /// The outcome tracker and the result-set backlog disagree.
    #[error("protocol inconsistency: {0}")]
    ProtocolInconsistency(String),
}
