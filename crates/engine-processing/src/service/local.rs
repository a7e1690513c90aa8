use crate::{matcher, service::MatchService};
use async_trait::async_trait;
use engine_core::error::MatchError;
use model::matching::{MatchRequest, MatchResponse};
use tracing::debug;

/// Runs the matcher in-process on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalMatchService;

impl LocalMatchService {
    pub fn new() -> Self {
        LocalMatchService
    }
}

#[async_trait]
impl MatchService for LocalMatchService {
    fn name(&self) -> &str {
        "local"
    }

    async fn match_rows(&self, request: MatchRequest) -> Result<MatchResponse, MatchError> {
        let left = request.left_rows.len();
        let right = request.right_rows.len();

        let response = tokio::task::spawn_blocking(move || matcher::execute(request))
            .await
            .map_err(|e| MatchError::Internal(format!("matcher task failed: {e}")))?;

        debug!(
            left,
            right,
            matches = response.matches.len(),
            elapsed_ms = response.execution_time_ms,
            "Local match finished"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::row::Row;

    #[tokio::test]
    async fn matches_on_blocking_pool() {
        let service = LocalMatchService::new();
        let response = service
            .match_rows(MatchRequest {
                left_rows: vec![Row::from_pairs([("k", "A")]), Row::from_pairs([("k", "B")])],
                right_rows: vec![Row::from_pairs([("k", "A")])],
                left_key_column: "k".into(),
                right_key_column: "k".into(),
                comparison_columns: vec![],
            })
            .await
            .unwrap();

        assert_eq!(response.matches.len(), 1);
        assert_eq!(response.left_only.len(), 1);
        assert!(response.right_only.is_empty());
    }
}
