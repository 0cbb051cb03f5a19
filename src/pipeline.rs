use std::collections::VecDeque;

use crate::{
    decode::{decode_row, first_generated_id},
    wire, PipelineClient, Protocol, Result, ResultSetSource, Results, ResultsError, Statement,
    StatementKind, Value,
};

/// Result column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Col {
    pub name: String,
    pub decltype: Option<String>,
}

/// Rows of one query, decoded from their wire form as the caller reads them.
///
/// With a fetch size of zero every row is decoded up front; otherwise
/// `fetch_size` rows are decoded at a time.
#[derive(Debug)]
pub struct PipelineResultSet {
    cols: Vec<Col>,
    buffered: VecDeque<Vec<Value>>,
    undecoded: VecDeque<Vec<wire::Value>>,
    fetch_size: usize,
    max_field_size: usize,
    callable: bool,
    closed: bool,
}

impl PipelineResultSet {
    fn new(
        result: wire::ExecuteResult,
        callable: bool,
        fetch_size: usize,
        max_field_size: usize,
    ) -> Result<Self> {
        let cols = result
            .cols
            .into_iter()
            .map(|col| Col {
                name: col.name,
                decltype: col.decltype,
            })
            .collect();
        let mut result_set = Self {
            cols,
            buffered: VecDeque::new(),
            undecoded: result.rows.into(),
            fetch_size,
            max_field_size,
            callable,
            closed: false,
        };
        if fetch_size == 0 {
            result_set.decode_rows(usize::MAX)?;
        }
        Ok(result_set)
    }

    pub fn columns(&self) -> &[Col] {
        &self.cols
    }

    /// Position of a column, matched case-insensitively.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.cols
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(name))
    }

    /// Next row, decoding another batch when the decoded ones ran out.
    pub fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        if self.buffered.is_empty() {
            let batch = if self.fetch_size == 0 {
                usize::MAX
            } else {
                self.fetch_size
            };
            self.decode_rows(batch)?;
        }
        Ok(self.buffered.pop_front())
    }

    /// Rows decoded and not read yet.
    pub fn buffered_rows(&self) -> usize {
        self.buffered.len()
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.undecoded.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn decode_rows(&mut self, limit: usize) -> Result<()> {
        let take = limit.min(self.undecoded.len());
        for row in self.undecoded.drain(..take) {
            self.buffered.push_back(decode_row(row, self.max_field_size)?);
        }
        Ok(())
    }
}

impl ResultSetSource for PipelineResultSet {
    fn is_callable(&self) -> bool {
        self.callable
    }

    async fn close(&mut self) -> Result<()> {
        self.buffered.clear();
        self.undecoded.clear();
        self.closed = true;
        Ok(())
    }

    async fn fetch_remaining(&mut self) -> Result<()> {
        self.decode_rows(usize::MAX)
    }
}

#[derive(Debug)]
struct PendingResult {
    request_index: usize,
    kind: StatementKind,
    result: wire::PipelineResult,
}

/// Wire collaborator speaking the SQL pipeline API.
///
/// A command is sent as one pipeline request; its per-statement results stay
/// pending here until [`Protocol::read_next`] moves them into a [`Results`].
/// Share it behind a `tokio::sync::Mutex` so round trips are serialized.
#[derive(Debug)]
pub struct PipelineProtocol {
    client: PipelineClient,
    pending: VecDeque<PendingResult>,
}

impl PipelineProtocol {
    pub fn new(client: PipelineClient) -> Self {
        Self {
            client,
            pending: VecDeque::new(),
        }
    }

    pub fn client(&self) -> &PipelineClient {
        &self.client
    }

    /// Runs `statements` as one command and reads its first results into
    /// `results`.
    ///
    /// Statements rejected by the database are recorded as failures. Results
    /// left pending by a previous command are discarded.
    pub async fn execute<I>(
        &mut self,
        statements: I,
        results: &mut Results<PipelineResultSet>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = Statement>,
    {
        if !self.pending.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                discarded = self.pending.len(),
                "discarding results left by previous command"
            );

            self.pending.clear();
        }

        let statements: Vec<Statement> = statements.into_iter().collect();
        let kinds: Vec<StatementKind> = statements.iter().map(|statement| statement.kind).collect();
        let wire_results = self.client.execute_statements(statements).await?;

        self.pending = kinds
            .into_iter()
            .zip(wire_results)
            .enumerate()
            .map(|(request_index, (kind, result))| PendingResult {
                request_index,
                kind,
                result,
            })
            .collect();

        self.read_next(results).await
    }
}

impl Protocol for PipelineProtocol {
    type ResultSet = PipelineResultSet;

    fn has_more_results(&self) -> bool {
        !self.pending.is_empty()
    }

    async fn read_next(&mut self, results: &mut Results<PipelineResultSet>) -> Result<()> {
        let streaming = results.fetch_size() != 0;

        while let Some(pending) = self.pending.pop_front() {
            let more = !self.pending.is_empty();
            match record_pending(pending, results, more) {
                Ok(Recorded::ResultSet) if streaming => break,
                Ok(_) => {}
                Err(err) => {
                    results.record_failure(more);
                    results.command_end();
                    return Err(err);
                }
            }
        }

        results.command_end();
        Ok(())
    }
}

enum Recorded {
    Outcome,
    ResultSet,
}

/// Records one statement result. A callable result set is reported as an
/// outcome since it never takes a position among the results.
fn record_pending(
    pending: PendingResult,
    results: &mut Results<PipelineResultSet>,
    more: bool,
) -> Result<Recorded> {
    match pending.result {
        #[cfg(feature = "tracing")]
        wire::PipelineResult::Error { error } => {
            tracing::debug!(
                request_index = pending.request_index,
                code = error.code.as_deref().unwrap_or(""),
                "statement rejected: {}",
                error.message
            );
            results.record_failure(more);
            Ok(Recorded::Outcome)
        }
        #[cfg(not(feature = "tracing"))]
        wire::PipelineResult::Error { .. } => {
            results.record_failure(more);
            Ok(Recorded::Outcome)
        }
        wire::PipelineResult::Success {
            response: wire::Response::Execute { result },
        } => {
            if pending.kind == StatementKind::Update {
                let first_id = first_generated_id(
                    result.last_insert_rowid.as_deref(),
                    result.affected_row_count,
                    results.auto_increment_step(),
                )?;
                results.record_outcome(result.affected_row_count, first_id, more);
                return Ok(Recorded::Outcome);
            }

            let callable = pending.kind == StatementKind::Call;
            let fetch_size = if callable { 0 } else { results.fetch_size() };
            let result_set =
                PipelineResultSet::new(result, callable, fetch_size, results.max_field_size())?;
            results.record_result_set(result_set, more);
            Ok(if callable {
                Recorded::Outcome
            } else {
                Recorded::ResultSet
            })
        }
        wire::PipelineResult::Success {
            response: wire::Response::Close {},
        } => Err(ResultsError::Decode(format!(
            "expected execute response at request {}, got close",
            pending.request_index
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::PipelineResultSet;
    use crate::{wire, ResultSetSource, Value};

    fn rows(count: i64) -> wire::ExecuteResult {
        wire::ExecuteResult {
            cols: vec![wire::Col {
                name: "id".to_owned(),
                decltype: Some("INTEGER".to_owned()),
            }],
            rows: (1..=count)
                .map(|id| {
                    vec![wire::Value::Integer {
                        value: id.to_string(),
                    }]
                })
                .collect(),
            ..wire::ExecuteResult::default()
        }
    }

    #[test]
    fn eager_result_set_decodes_everything() {
        let result_set = PipelineResultSet::new(rows(3), false, 0, 0).expect("must decode");
        assert!(result_set.is_fully_loaded());
        assert_eq!(result_set.buffered_rows(), 3);
        assert_eq!(result_set.column_index("ID"), Some(0));
    }

    #[tokio::test]
    async fn streaming_result_set_decodes_in_batches() {
        let mut result_set = PipelineResultSet::new(rows(5), false, 2, 0).expect("must build");
        assert_eq!(result_set.buffered_rows(), 0);

        assert_eq!(result_set.next_row().unwrap(), Some(vec![Value::Integer(1)]));
        assert_eq!(result_set.buffered_rows(), 1);
        assert!(!result_set.is_fully_loaded());

        result_set.fetch_remaining().await.unwrap();
        assert!(result_set.is_fully_loaded());
        assert_eq!(result_set.buffered_rows(), 4);
    }

    #[tokio::test]
    async fn close_discards_rows_and_is_idempotent() {
        let mut result_set = PipelineResultSet::new(rows(4), false, 1, 0).expect("must build");
        result_set.close().await.unwrap();
        result_set.close().await.unwrap();

        assert!(result_set.is_closed());
        assert_eq!(result_set.next_row().unwrap(), None);
    }
}
