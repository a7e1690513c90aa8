use crate::analysis::profile::ColumnProfile;
use model::candidate::ScoreBreakdown;
use std::collections::HashSet;

pub const OVERLAP_WEIGHT: f64 = 0.4;
pub const NAME_WEIGHT: f64 = 0.2;
pub const FORMAT_WEIGHT: f64 = 0.2;
pub const UNIQUENESS_WEIGHT: f64 = 0.2;

/// Weighted sum of the components, in `[0, 1]`.
pub fn confidence(breakdown: &ScoreBreakdown) -> f64 {
    (OVERLAP_WEIGHT * breakdown.value_overlap
        + NAME_WEIGHT * breakdown.name_similarity
        + FORMAT_WEIGHT * breakdown.format_compatibility
        + UNIQUENESS_WEIGHT * breakdown.uniqueness)
        .clamp(0.0, 1.0)
}

pub fn score(left: &ColumnProfile, right: &ColumnProfile) -> ScoreBreakdown {
    ScoreBreakdown {
        value_overlap: value_overlap(left, right),
        name_similarity: name_similarity(&left.column, &right.column),
        format_compatibility: format_compatibility(left, right),
        uniqueness: left.uniqueness().min(right.uniqueness()),
    }
}

/// Shared distinct values over the smaller distinct set.
pub fn value_overlap(left: &ColumnProfile, right: &ColumnProfile) -> f64 {
    let smaller = left.distinct.len().min(right.distinct.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = left.distinct.intersection(&right.distinct).count();
    shared as f64 / smaller as f64
}

/// 1.0 for equal names, 0.7 when one contains the other, otherwise half the
/// Jaccard overlap of their word tokens.
pub fn name_similarity(left: &str, right: &str) -> f64 {
    let left = normalize_name(left);
    let right = normalize_name(right);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }
    if left.contains(&right) || right.contains(&left) {
        return 0.7;
    }

    let left_tokens = tokens(&left);
    let right_tokens = tokens(&right);
    let union = left_tokens.union(&right_tokens).count();
    if union == 0 {
        return 0.0;
    }
    let shared = left_tokens.intersection(&right_tokens).count();
    0.5 * shared as f64 / union as f64
}

fn normalize_name(name: &str) -> String {
    // split camelCase so "transactionId" and "transaction_id" agree
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.trim().chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        out.extend(c.to_lowercase());
    }
    out.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn tokens(normalized: &str) -> HashSet<&str> {
    normalized.split(' ').filter(|t| !t.is_empty()).collect()
}

/// Zero for incompatible kinds; otherwise the mean of character-class
/// similarity and mean-length ratio.
pub fn format_compatibility(left: &ColumnProfile, right: &ColumnProfile) -> f64 {
    if !left.kind.compatible(right.kind) {
        return 0.0;
    }

    let class_distance = (left.digit_share - right.digit_share).abs()
        + (left.alpha_share - right.alpha_share).abs()
        + (left.special_share - right.special_share).abs();
    let class_similarity = 1.0 - class_distance / 2.0;

    let longer = left.mean_length.max(right.mean_length);
    let length_ratio = if longer == 0.0 {
        0.0
    } else {
        left.mean_length.min(right.mean_length) / longer
    };

    ((class_similarity + length_ratio) / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(column: &str, values: &[&str]) -> ColumnProfile {
        ColumnProfile::from_values(column, values.iter().map(|v| v.to_string()))
    }

    #[test]
    fn identical_unique_columns_score_one() {
        let ids: Vec<String> = (1..=50).map(|i| format!("ID{i:04}")).collect();
        let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
        let breakdown = score(&profile("ID", &ids), &profile("ID", &ids));

        assert_eq!(breakdown.value_overlap, 1.0);
        assert_eq!(breakdown.name_similarity, 1.0);
        assert_eq!(breakdown.uniqueness, 1.0);
        assert!((breakdown.format_compatibility - 1.0).abs() < 1e-9);
        assert!(confidence(&breakdown) > 0.99);
    }

    #[test]
    fn name_similarity_levels() {
        assert_eq!(name_similarity("Reference", "reference"), 1.0);
        assert_eq!(name_similarity("transactionId", "transaction_id"), 1.0);
        assert_eq!(name_similarity("ref", "partner_ref"), 0.7);
        let partial = name_similarity("booking date", "value date");
        assert!((partial - 0.5 / 3.0).abs() < 1e-9);
        assert_eq!(name_similarity("amount", "label"), 0.0);
    }

    #[test]
    fn overlap_uses_smaller_distinct_set() {
        let left = profile("a", &["1", "2", "3", "4"]);
        let right = profile("b", &["2", "3"]);
        assert_eq!(value_overlap(&left, &right), 1.0);
        assert_eq!(value_overlap(&left, &profile("c", &[])), 0.0);
    }

    #[test]
    fn incompatible_kinds_have_no_format_score() {
        let numbers = profile("a", &["100", "200"]);
        let words = profile("b", &["alpha", "beta"]);
        assert_eq!(format_compatibility(&numbers, &words), 0.0);
    }
}
