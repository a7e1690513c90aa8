use crate::{lifecycle::RunState, retry::RetryDisposition, schema::DatasetSide};
use std::time::Duration;
use thiserror::Error;

/// Structural problems with the supplied datasets. Fatal for the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{side} dataset has no column '{column}' (observed columns: {observed})")]
    MissingColumn {
        side: DatasetSide,
        column: String,
        observed: String,
    },

    #[error("{side} key column name is empty")]
    EmptyColumnName { side: DatasetSide },
}

/// Failure of a single call to a match service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("Match call timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Connection to match service failed: {0}")]
    Connection(String),

    #[error("Match service responded with status {code}: {message}")]
    Status { code: u16, message: String },

    #[error("Failed to decode match response: {0}")]
    Decode(String),

    #[error("Match service rejected the request: {0}")]
    Rejected(String),

    #[error("Internal match error: {0}")]
    Internal(String),
}

impl MatchError {
    /// Timeouts, dropped connections and gateway-class statuses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            MatchError::Timeout(_) | MatchError::Connection(_) => true,
            MatchError::Status { code, .. } => is_transient_status(*code),
            MatchError::Decode(_) | MatchError::Rejected(_) | MatchError::Internal(_) => false,
        }
    }

    pub fn disposition(&self) -> RetryDisposition {
        if self.is_transient() {
            RetryDisposition::Retry
        } else {
            RetryDisposition::Stop
        }
    }
}

fn is_transient_status(code: u16) -> bool {
    // 0 is what clients report when the response never arrived.
    matches!(code, 0 | 408 | 502 | 503 | 504)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid run state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RunState,
    pub to: RunState,
}
