use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Uniqueness {
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleValues {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

/// Individual components of a candidate's confidence, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub value_overlap: f64,
    pub name_similarity: f64,
    pub format_compatibility: f64,
    pub uniqueness: f64,
}

/// A ranked guess at which pair of columns joins the two datasets.
///
/// Candidates are produced by the analyzer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCandidate {
    pub left_column: String,
    pub right_column: String,
    pub confidence: f64,
    pub uniqueness: Uniqueness,
    pub sample_values: SampleValues,
    /// Name of the registered value transform applied to the left column, if
    /// one strictly improved the score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,
    pub breakdown: ScoreBreakdown,
}

impl KeyCandidate {
    pub fn meets(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }
}
