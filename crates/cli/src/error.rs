use engine_config::SettingsError;
use engine_core::error::{MatchError, ValidationError};
use engine_runtime::error::ReconError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read CSV file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read JSON rows: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to set up the match service: {0}")]
    Service(#[from] MatchError),

    #[error("Reconciliation failed: {0}")]
    Recon(#[from] ReconError),

    #[error("Unsupported file type '{0}', expected .csv or .json")]
    UnsupportedFile(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}
