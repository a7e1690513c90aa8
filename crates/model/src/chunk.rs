use crate::records::row::Row;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStatus {
    Pending,
    Running,
    Succeeded,
    FailedRetrying,
    FailedTerminal,
}

impl ChunkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStatus::Pending => "pending",
            ChunkStatus::Running => "running",
            ChunkStatus::Succeeded => "succeeded",
            ChunkStatus::FailedRetrying => "failed-retrying",
            ChunkStatus::FailedTerminal => "failed-terminal",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChunkStatus::Succeeded | ChunkStatus::FailedTerminal)
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One slice of the left dataset, processed as a single remote unit of work.
#[derive(Debug, Clone)]
pub struct ChunkJob {
    pub index: usize,
    pub left: Vec<Row>,
    pub status: ChunkStatus,
    pub retry_count: u32,
}

impl ChunkJob {
    pub fn new(index: usize, left: Vec<Row>) -> Self {
        ChunkJob {
            index,
            left,
            status: ChunkStatus::Pending,
            retry_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn mark_running(&mut self) {
        self.status = ChunkStatus::Running;
    }

    pub fn mark_retrying(&mut self) {
        self.retry_count += 1;
        self.status = ChunkStatus::FailedRetrying;
    }

    pub fn mark_succeeded(&mut self) {
        self.status = ChunkStatus::Succeeded;
    }

    pub fn mark_failed(&mut self) {
        self.status = ChunkStatus::FailedTerminal;
    }
}
