use crate::progress::ProgressUpdate;
use std::fmt::Debug;
use uuid::Uuid;

/// A trait for events that can be published on the EventBus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;

    /// Terminal events close a stream and are never dropped for a slow
    /// subscriber.
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Emitted once chunking is done and the first chunk is about to be submitted.
#[derive(Debug, Clone)]
pub struct RunStarted {
    pub run_id: Uuid,
    pub total_left: usize,
    pub total_right: usize,
    pub total_chunks: usize,
    pub chunk_size: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for RunStarted {
    fn event_type(&self) -> &'static str {
        "run.started"
    }
}

/// Emitted when a chunk call failed transiently and will be retried.
#[derive(Debug, Clone)]
pub struct ChunkRetrying {
    pub run_id: Uuid,
    pub chunk_index: usize,
    pub attempt: u32,
    pub delay_ms: u64,
    pub error: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for ChunkRetrying {
    fn event_type(&self) -> &'static str {
        "chunk.retrying"
    }
}

/// Emitted when a chunk exhausted its retries; its left rows become left-only.
#[derive(Debug, Clone)]
pub struct ChunkFailed {
    pub run_id: Uuid,
    pub chunk_index: usize,
    pub reclassified_rows: usize,
    pub error: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for ChunkFailed {
    fn event_type(&self) -> &'static str {
        "chunk.failed"
    }
}

/// Emitted exactly once when a run is finalized, completed or cancelled.
#[derive(Debug, Clone)]
pub struct RunFinished {
    pub run_id: Uuid,
    pub cancelled: bool,
    pub total_matches: usize,
    pub execution_time_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Event for RunFinished {
    fn event_type(&self) -> &'static str {
        "run.finished"
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

impl Event for ProgressUpdate {
    fn event_type(&self) -> &'static str {
        "run.progress"
    }

    fn is_terminal(&self) -> bool {
        self.is_final()
    }
}
