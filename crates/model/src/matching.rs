use crate::records::row::Row;
use serde::{Deserialize, Serialize};

/// A comparison column whose values differ between the two members of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDifference {
    pub column: String,
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub left: Row,
    pub right: Row,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub differences: Vec<FieldDifference>,
}

impl MatchedPair {
    pub fn new(left: Row, right: Row) -> Self {
        MatchedPair {
            left,
            right,
            differences: Vec::new(),
        }
    }

    pub fn has_differences(&self) -> bool {
        !self.differences.is_empty()
    }
}

/// Matched / left-only / right-only split of two row collections.
///
/// Every left row lands in exactly one of `matched` (as the left member) or
/// `left_only`; the same holds for right rows with `right_only`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPartition {
    pub matched: Vec<MatchedPair>,
    pub left_only: Vec<Row>,
    pub right_only: Vec<Row>,
}

impl MatchPartition {
    /// Checks the conservation invariant against the input sizes.
    pub fn accounts_for(&self, left_len: usize, right_len: usize) -> bool {
        self.matched.len() + self.left_only.len() == left_len
            && self.matched.len() + self.right_only.len() == right_len
    }
}

/// Request sent to a match service for one unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRequest {
    pub left_rows: Vec<Row>,
    pub right_rows: Vec<Row>,
    pub left_key_column: String,
    pub right_key_column: String,
    #[serde(default)]
    pub comparison_columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub matches: Vec<MatchedPair>,
    pub left_only: Vec<Row>,
    pub right_only: Vec<Row>,
    pub execution_time_ms: u64,
}

impl MatchResponse {
    pub fn from_partition(partition: MatchPartition, execution_time_ms: u64) -> Self {
        MatchResponse {
            matches: partition.matched,
            left_only: partition.left_only,
            right_only: partition.right_only,
            execution_time_ms,
        }
    }
}
