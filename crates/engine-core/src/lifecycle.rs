use crate::error::InvalidTransition;
use serde::Serialize;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Idle,
    KeyDiscovery,
    Chunking,
    Running,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "Idle",
            RunState::KeyDiscovery => "KeyDiscovery",
            RunState::Chunking => "Chunking",
            RunState::Running => "Running",
            RunState::Finalizing => "Finalizing",
            RunState::Completed => "Completed",
            RunState::Cancelled => "Cancelled",
            RunState::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Cancelled | RunState::Failed
        )
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;

        matches!(
            (self, next),
            (Idle, KeyDiscovery)
                | (Idle, Chunking)
                | (KeyDiscovery, Chunking)
                | (Chunking, Running)
                | (Running, Finalizing)
                | (Finalizing, Completed)
                | (Chunking, Cancelled)
                | (Running, Cancelled)
                | (Idle, Failed)
                | (KeyDiscovery, Failed)
                | (Chunking, Failed)
                | (Running, Failed)
                | (Finalizing, Failed)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks a single run's lifecycle and rejects illegal moves.
#[derive(Debug, Clone)]
pub struct RunLifecycle {
    state: RunState,
}

impl RunLifecycle {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn advance(&mut self, next: RunState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
        Ok(())
    }
}

impl Default for RunLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
