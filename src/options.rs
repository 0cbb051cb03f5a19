/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy).
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 0,
            retry_backoff_ms: 250,
        }
    }
}

/// Cursor movement allowed on result sets produced by a command.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScrollType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

/// Parameters of one command execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExecutionOptions {
    /// Rows decoded per fetch; `0` materializes result sets eagerly.
    pub fetch_size: usize,
    /// Batch execution always tracks multiple outcomes.
    pub batch: bool,
    /// Number of statements in the command, used to pad update counts.
    pub expected_size: usize,
    /// Whether the command used the binary row encoding.
    pub binary_format: bool,
    pub scroll_type: ScrollType,
    /// Maximum bytes returned for a text value; `0` means unlimited.
    pub max_field_size: usize,
    /// Increment between consecutive generated identifiers.
    pub auto_increment_step: i64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            fetch_size: 0,
            batch: false,
            expected_size: 1,
            binary_format: false,
            scroll_type: ScrollType::ForwardOnly,
            max_field_size: 0,
            auto_increment_step: 1,
        }
    }
}

impl ExecutionOptions {
    /// Options for a batch of `expected_size` statements.
    pub fn batch(expected_size: usize) -> Self {
        Self {
            batch: true,
            expected_size,
            ..Self::default()
        }
    }

    /// Switches to partial-fetch mode with the given fetch size.
    pub fn with_fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size;
        self
    }
}
