use crate::keys::normalize::parse_date;
use model::records::row::Row;
use std::collections::{HashMap, HashSet};

/// Share of values that must agree on a kind before the column takes it.
const DOMINANT_KIND_SHARE: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Numeric,
    Date,
    Alphabetic,
    Alphanumeric,
    Mixed,
    Empty,
}

impl ValueKind {
    pub fn classify(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            return ValueKind::Empty;
        }

        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        let has_alpha = value.chars().any(char::is_alphabetic);
        let has_separator = value.chars().any(|c| matches!(c, '-' | '/' | '.'));

        if has_digit && has_separator && !has_alpha && parse_date(value).is_some() {
            return ValueKind::Date;
        }
        if has_digit
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | ' '))
        {
            return ValueKind::Numeric;
        }
        if has_alpha && !has_digit && value.chars().all(|c| c.is_alphabetic() || c == ' ') {
            return ValueKind::Alphabetic;
        }
        if value.chars().all(char::is_alphanumeric) {
            return ValueKind::Alphanumeric;
        }
        ValueKind::Mixed
    }

    /// Whether two columns of these kinds could plausibly hold the same key.
    pub fn compatible(self, other: ValueKind) -> bool {
        use ValueKind::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => false,
            (a, b) if a == b => true,
            (Mixed, _) | (_, Mixed) => true,
            (Alphanumeric, _) | (_, Alphanumeric) => true,
            (Numeric, Date) | (Date, Numeric) => true,
            _ => false,
        }
    }
}

/// Summary of one column's sampled values.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub column: String,
    /// Non-blank values in sample order.
    pub values: Vec<String>,
    pub distinct: HashSet<String>,
    pub kind: ValueKind,
    pub digit_share: f64,
    pub alpha_share: f64,
    pub special_share: f64,
    pub mean_length: f64,
}

impl ColumnProfile {
    pub fn from_rows<'a, I>(column: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let values = rows
            .into_iter()
            .filter_map(|row| row.get_non_empty(column))
            .map(str::to_string);
        Self::from_values(column, values)
    }

    pub fn from_values<I>(column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let values: Vec<String> = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        let distinct: HashSet<String> = values.iter().cloned().collect();

        let (mut digits, mut alpha, mut special, mut total) = (0usize, 0usize, 0usize, 0usize);
        for c in values.iter().flat_map(|v| v.chars()) {
            total += 1;
            if c.is_ascii_digit() {
                digits += 1;
            } else if c.is_alphabetic() {
                alpha += 1;
            } else {
                special += 1;
            }
        }
        let share = |n: usize| if total == 0 { 0.0 } else { n as f64 / total as f64 };

        ColumnProfile {
            column: column.to_string(),
            kind: dominant_kind(&values),
            digit_share: share(digits),
            alpha_share: share(alpha),
            special_share: share(special),
            mean_length: if values.is_empty() {
                0.0
            } else {
                total as f64 / values.len() as f64
            },
            distinct,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Distinct values over non-blank values; 1.0 for identifier-like columns.
    pub fn uniqueness(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.distinct.len() as f64 / self.values.len() as f64
        }
    }

    /// First `limit` distinct values, in sample order.
    pub fn samples(&self, limit: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .filter(|v| seen.insert(v.as_str()))
            .take(limit)
            .cloned()
            .collect()
    }
}

fn dominant_kind(values: &[String]) -> ValueKind {
    if values.is_empty() {
        return ValueKind::Empty;
    }

    let mut counts: HashMap<ValueKind, usize> = HashMap::new();
    for value in values {
        *counts.entry(ValueKind::classify(value)).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count as f64 >= values.len() as f64 * DOMINANT_KIND_SHARE)
        .map(|(kind, _)| kind)
        .unwrap_or(ValueKind::Mixed)
}
