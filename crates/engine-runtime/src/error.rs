use engine_config::settings::error::SettingsError;
use engine_core::error::{InvalidTransition, ValidationError};
use thiserror::Error;

/// Top-level errors for a reconciliation run.
///
/// Chunk-level failures never show up here; they are retried and then
/// degraded to left-only rows inside the run.
#[derive(Debug, Error)]
pub enum ReconError {
    /// A declared key column is missing from one of the datasets.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Automatic key selection found no candidate above the threshold.
    #[error("No key candidate is confident enough (best {confidence:.2}, need {threshold:.2})")]
    NoConfidentKey { confidence: f64, threshold: f64 },

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    /// An error occurred while joining a task.
    /// This usually indicates that the task was cancelled or panicked.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("Invalid run state: {0}")]
    State(#[from] InvalidTransition),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Common error type for all actors in the engine.
#[derive(Debug, Error)]
pub enum ActorError {
    #[error("Mailbox closed")]
    MailboxClosed,

    #[error("Actor dropped the reply channel")]
    ReplyDropped,

    #[error("Run was already finalized")]
    AlreadyFinalized,

    #[error("Actor internal error: {0}")]
    Internal(String),
}
