use crate::{
    matching::MatchedPair,
    records::row::Row,
};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Cancellation stopped the run early; only merged chunks are reflected.
    Cancelled,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Counters collected while a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCounters {
    pub chunks_submitted: u64,
    pub chunks_succeeded: u64,
    pub chunks_failed: u64,
    pub transient_failures: u64,
    pub retries: u64,
    pub concurrency_downgrades: u64,
    pub discarded_results: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub matches: Vec<MatchedPair>,
    pub left_only: Vec<Row>,
    pub right_only: Vec<Row>,
    pub total_left: usize,
    pub total_right: usize,
    pub total_matches: usize,
    pub matches_with_differences: usize,
    /// Left rows of chunks that were never merged because the run was cancelled.
    pub unprocessed_left: usize,
    /// Left rows moved to `left_only` because their chunk failed permanently.
    pub reclassified_left: usize,
    pub failed_chunks: Vec<usize>,
    pub execution_time_ms: u64,
    pub counters: RunCounters,
    pub fingerprint: String,
}

impl ReconciliationResult {
    pub fn is_partial(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

/// Content hash over the three partitions, in order.
///
/// Two runs over the same inputs produce the same fingerprint regardless of
/// chunk size or concurrency.
pub fn partition_fingerprint(matches: &[MatchedPair], left_only: &[Row], right_only: &[Row]) -> String {
    let mut hasher = blake3::Hasher::new();

    hasher.update(b"matches");
    for pair in matches {
        hash_row(&mut hasher, &pair.left);
        hasher.update(b"=");
        hash_row(&mut hasher, &pair.right);
    }
    hasher.update(b"left_only");
    for row in left_only {
        hash_row(&mut hasher, row);
    }
    hasher.update(b"right_only");
    for row in right_only {
        hash_row(&mut hasher, row);
    }

    hasher.finalize().to_hex().to_string()
}

fn hash_row(hasher: &mut blake3::Hasher, row: &Row) {
    hasher.update(b"{");
    for (name, value) in row.iter() {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        hasher.update(&(value.len() as u64).to_le_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.update(b"}");
}
