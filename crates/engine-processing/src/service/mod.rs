use async_trait::async_trait;
use engine_core::error::MatchError;
use model::matching::{MatchRequest, MatchResponse};

pub mod http;
pub mod local;

/// The remote match operation the orchestrator calls once per chunk.
#[async_trait]
pub trait MatchService: Send + Sync {
    fn name(&self) -> &str;

    async fn match_rows(&self, request: MatchRequest) -> Result<MatchResponse, MatchError>;
}
