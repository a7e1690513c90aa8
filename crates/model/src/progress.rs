use serde::Serialize;

/// Snapshot of a run's progress, emitted after every chunk merge and while a
/// chunk is backing off between retries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Stays below 100 until the run is finalized.
    pub percentage: f64,
    /// Index of the chunk this update is about, when it concerns one chunk.
    pub chunk_index: Option<usize>,
    pub processed_chunks: usize,
    pub total_chunks: usize,
    pub matched_count: usize,
    pub left_only_count: usize,
    pub right_remaining_count: usize,
    pub step: String,
}

/// Highest percentage reported before finalization.
pub const MAX_PENDING_PERCENTAGE: f64 = 99.0;

impl ProgressUpdate {
    /// Percentage for `processed` of `total` chunks, capped below 100.
    pub fn pending_percentage(processed: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let raw = processed as f64 * 100.0 / total as f64;
        raw.min(MAX_PENDING_PERCENTAGE)
    }

    pub fn is_final(&self) -> bool {
        self.percentage >= 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_percentage_never_reaches_100() {
        assert_eq!(ProgressUpdate::pending_percentage(0, 4), 0.0);
        assert_eq!(ProgressUpdate::pending_percentage(2, 4), 50.0);
        assert_eq!(ProgressUpdate::pending_percentage(4, 4), 99.0);
        assert_eq!(ProgressUpdate::pending_percentage(0, 0), 0.0);
    }
}
