use std::fmt;
use std::time::Duration;

use reqwest::{header, StatusCode};

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    decode::build_execute_statement,
    wire::{self, PipelineRequest, Request},
    ClientOptions, Result, ResultsError, Statement,
};

/// Formats a database ID into the canonical pipeline URL.
///
/// Example: `"abc123"` → `"https://abc123.lite.bunnydb.net/v2/pipeline"`
pub fn db_id_to_pipeline_url(db_id: &str) -> String {
    format!("https://{}.lite.bunnydb.net/v2/pipeline", db_id.trim())
}

#[derive(Clone)]
/// HTTP transport for the SQL pipeline endpoint.
pub struct PipelineClient {
    http: reqwest::Client,
    pipeline_url: String,
    token: String,
    options: ClientOptions,
}

impl fmt::Debug for PipelineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineClient")
            .field("pipeline_url", &self.pipeline_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl PipelineClient {
    /// Creates a client sending `authorization` verbatim as the
    /// `Authorization` header.
    pub fn new(pipeline_url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            pipeline_url: pipeline_url.into(),
            token: authorization.into(),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new_bearer(pipeline_url: impl Into<String>, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        Self::new(pipeline_url, authorization)
    }

    /// Creates a client from a database ID and a bearer token.
    ///
    /// ```no_run
    /// use pipeline_results::PipelineClient;
    ///
    /// let client = PipelineClient::from_db_id("my-db-id", "my-token");
    /// ```
    pub fn from_db_id(db_id: impl AsRef<str>, token: impl AsRef<str>) -> Self {
        let url = db_id_to_pipeline_url(db_id.as_ref());
        Self::new_bearer(url, token)
    }

    /// Creates a client from `BUNNYDB_PIPELINE_URL` and `BUNNYDB_TOKEN`.
    ///
    /// Returns an error if either variable is missing or empty.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = required_env("BUNNYDB_PIPELINE_URL")?;
        let token = required_env("BUNNYDB_TOKEN")?;
        Ok(Self::new_bearer(url, token))
    }

    /// Creates a client from `BUNNYDB_ID` and `BUNNYDB_TOKEN`, deriving the
    /// pipeline URL from the database ID.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env_db_id() -> std::result::Result<Self, String> {
        let db_id = required_env("BUNNYDB_ID")?;
        let token = required_env("BUNNYDB_TOKEN")?;
        Ok(Self::from_db_id(db_id, token))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    pub fn pipeline_url(&self) -> &str {
        &self.pipeline_url
    }

    /// Sends `statements` as one pipeline followed by a close request.
    ///
    /// Returns one result per statement, in order. A statement rejected by the
    /// database comes back as [`wire::PipelineResult::Error`]; only transport,
    /// shape and close failures are errors.
    pub(crate) async fn execute_statements(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<wire::PipelineResult>> {
        let count = statements.len();
        let mut requests = Vec::with_capacity(count + 1);
        for statement in statements {
            let stmt = build_execute_statement(statement)?;
            requests.push(Request::Execute { stmt });
        }
        requests.push(Request::Close {});

        let response = self
            .send_pipeline_with_retry(&PipelineRequest { requests })
            .await?;

        let expected = count + 1;
        if response.results.len() != expected {
            return Err(ResultsError::Decode(format!(
                "result count mismatch: expected {expected}, got {}",
                response.results.len()
            )));
        }

        let mut results = response.results;
        if let Some(close) = results.pop() {
            ensure_close_success(close, count)?;
        }
        Ok(results)
    }

    async fn send_pipeline_with_retry(
        &self,
        payload: &PipelineRequest,
    ) -> Result<wire::PipelineResponse> {
        let mut attempt = 0usize;
        loop {
            let response = self
                .http
                .post(&self.pipeline_url)
                .header(header::AUTHORIZATION, &self.token)
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .json(payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(ResultsError::Transport)?;

                    if !status.is_success() {
                        if should_retry_status(status) && attempt < self.options.max_retries {
                            self.wait_before_retry(attempt).await;
                            attempt += 1;
                            continue;
                        }

                        return Err(ResultsError::Http {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return serde_json::from_str::<wire::PipelineResponse>(&body).map_err(|err| {
                        ResultsError::Decode(format!(
                            "invalid pipeline response JSON: {err}; body: {body}"
                        ))
                    });
                }
                Err(err) => {
                    if should_retry_transport(&err) && attempt < self.options.max_retries {
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(ResultsError::Transport(err));
                }
            }
        }
    }

    /// Exponential backoff before the next attempt. WASM targets retry
    /// immediately.
    async fn wait_before_retry(&self, attempt: usize) {
        let exp = attempt.min(16) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self.options.retry_backoff_ms.saturating_mul(multiplier);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying pipeline request after {} ms", delay_ms);

        #[cfg(not(target_arch = "wasm32"))]
        sleep(Duration::from_millis(delay_ms)).await;

        #[cfg(target_arch = "wasm32")]
        let _ = delay_ms;
    }
}

fn ensure_close_success(result: wire::PipelineResult, request_index: usize) -> Result<()> {
    match result {
        wire::PipelineResult::Success {
            response: wire::Response::Close {},
        } => Ok(()),
        wire::PipelineResult::Success { .. } => Err(ResultsError::Decode(format!(
            "expected close response at request {request_index}"
        ))),
        wire::PipelineResult::Error { error } => Err(ResultsError::Pipeline {
            request_index,
            message: error.message,
            code: error.code,
        }),
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn should_retry_transport(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_request()
        || err.is_body()
        // is_connect() is not available on wasm32 targets (no TCP)
        || {
            #[cfg(not(target_arch = "wasm32"))]
            { err.is_connect() }
            #[cfg(target_arch = "wasm32")]
            { false }
        }
}

#[cfg(not(target_arch = "wasm32"))]
fn required_env(name: &str) -> std::result::Result<String, String> {
    let value =
        std::env::var(name).map_err(|_| format!("missing {name} environment variable"))?;
    if value.trim().is_empty() {
        return Err(format!("{name} is set but empty"));
    }
    Ok(value)
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::{db_id_to_pipeline_url, normalize_bearer_authorization, PipelineClient};

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(normalize_bearer_authorization("abc123"), "Bearer abc123");
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123"
        );
    }

    #[test]
    fn db_id_maps_to_pipeline_url() {
        assert_eq!(
            db_id_to_pipeline_url(" abc "),
            "https://abc.lite.bunnydb.net/v2/pipeline"
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = PipelineClient::new("https://db/v2/pipeline", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }
}
