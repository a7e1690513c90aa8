use crate::{actor::aggregator::Aggregate, error::ActorError};
use model::{matching::MatchResponse, records::row::Row};
use std::sync::Arc;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum ChunkResult {
    /// The match service answered.
    Matched(MatchResponse),
    /// Retries are exhausted or the error was permanent; the chunk's left
    /// rows are reclassified as left-only.
    Failed { error: String },
}

/// Final state of one chunk, handed to the aggregator for merging.
#[derive(Debug)]
pub struct ChunkOutcome {
    pub index: usize,
    pub left: Vec<Row>,
    pub result: ChunkResult,
}

/// Messages for the Aggregator actor, the single owner of the right pool.
#[derive(Debug)]
pub enum AggregatorMsg {
    /// Rows still unmatched in the right pool, for building a chunk request.
    Snapshot { reply: oneshot::Sender<Arc<Vec<Row>>> },

    /// A finished chunk. Merged once every lower-indexed chunk has merged.
    Submit(ChunkOutcome),

    /// Human-readable step for the progress stream, e.g. during backoff.
    Status { chunk_index: usize, step: String },

    /// Closes the run. Buffered, unmerged chunks are discarded.
    Finalize {
        cancelled: bool,
        reply: oneshot::Sender<Result<Aggregate, ActorError>>,
    },
}
