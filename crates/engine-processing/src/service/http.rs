use crate::service::MatchService;
use async_trait::async_trait;
use engine_core::error::MatchError;
use model::matching::{MatchRequest, MatchResponse};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest slice of an error body carried into a `MatchError`.
const MAX_ERROR_BODY: usize = 512;

/// Posts match requests as JSON to a remote matcher.
#[derive(Debug, Clone)]
pub struct HttpMatchService {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpMatchService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, MatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MatchError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(HttpMatchService {
            client,
            endpoint: endpoint.into(),
            timeout,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> MatchError {
        if err.is_timeout() {
            MatchError::Timeout(self.timeout)
        } else if err.is_decode() {
            MatchError::Decode(err.to_string())
        } else if err.is_builder() {
            MatchError::Internal(err.to_string())
        } else if let Some(status) = err.status() {
            MatchError::Status {
                code: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            // connect failures, resets and truncated bodies
            MatchError::Connection(err.to_string())
        }
    }
}

#[async_trait]
impl MatchService for HttpMatchService {
    fn name(&self) -> &str {
        "http"
    }

    async fn match_rows(&self, request: MatchRequest) -> Result<MatchResponse, MatchError> {
        let mut call = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.bearer_token {
            call = call.bearer_auth(token);
        }

        let response = call.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| message.is_char_boundary(i))
                    .unwrap_or(0);
                message.truncate(cut);
            }
            warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Match service returned an error status"
            );
            return Err(MatchError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let body: MatchResponse = response.json().await.map_err(|e| self.classify(e))?;
        debug!(
            endpoint = %self.endpoint,
            matches = body.matches.len(),
            remote_ms = body.execution_time_ms,
            "Remote match finished"
        );
        Ok(body)
    }
}
