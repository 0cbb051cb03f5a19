//! JSON shapes of the `/v2/pipeline` endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PipelineRequest {
    pub requests: Vec<Request>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Execute { stmt: ExecuteStatement },
    Close {},
}

#[derive(Debug, Serialize)]
pub struct ExecuteStatement {
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub named_args: Option<Vec<NamedArg>>,
    pub want_rows: bool,
}

#[derive(Debug, Serialize)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Null {},
    Integer { value: String },
    Float { value: String },
    Text { value: String },
    Blob { base64: String },
}

#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    pub results: Vec<PipelineResult>,
}

/// Outcome of one request of the pipeline.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineResult {
    #[serde(rename = "ok")]
    Success { response: Response },
    Error { error: PipelineError },
}

#[derive(Debug, Deserialize)]
pub struct PipelineError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Execute { result: ExecuteResult },
    Close {},
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteResult {
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub affected_row_count: u64,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Col {
    pub name: String,
    #[serde(default)]
    pub decltype: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{PipelineResponse, PipelineResult, Response};

    #[test]
    fn decodes_tagged_results() {
        let body = r#"{
            "baton": null,
            "results": [
                {"type": "ok", "response": {"type": "execute", "result": {"affected_row_count": 2}}},
                {"type": "error", "error": {"message": "no such table: t"}},
                {"type": "ok", "response": {"type": "close"}}
            ]
        }"#;
        let response: PipelineResponse = serde_json::from_str(body).expect("must decode");

        assert!(matches!(
            &response.results[0],
            PipelineResult::Success {
                response: Response::Execute { result }
            } if result.affected_row_count == 2
        ));
        assert!(matches!(
            &response.results[1],
            PipelineResult::Error { error } if error.code.is_none()
        ));
        assert!(matches!(
            &response.results[2],
            PipelineResult::Success {
                response: Response::Close {}
            }
        ));
    }

    #[test]
    fn rejects_unknown_result_type() {
        let body = r#"{"results": [{"type": "mystery"}]}"#;
        assert!(serde_json::from_str::<PipelineResponse>(body).is_err());
    }
}
