use crate::keys::normalize::parse_date;
use model::{candidate::KeyCandidate, records::dataset::Dataset};

/// A named value normalization tried against the left key column.
#[derive(Debug, Clone, Copy)]
pub struct ValueTransform {
    pub name: &'static str,
    pub description: &'static str,
    pub func: fn(&str) -> String,
}

impl ValueTransform {
    pub fn apply(&self, value: &str) -> String {
        (self.func)(value)
    }
}

pub static TRANSFORMS: &[ValueTransform] = &[
    ValueTransform {
        name: "trim",
        description: "Remove leading and trailing whitespace",
        func: |v| v.trim().to_string(),
    },
    ValueTransform {
        name: "lowercase",
        description: "Lower-case every character",
        func: |v| v.to_lowercase(),
    },
    ValueTransform {
        name: "uppercase",
        description: "Upper-case every character",
        func: |v| v.to_uppercase(),
    },
    ValueTransform {
        name: "strip_separators",
        description: "Remove spaces, dots, commas, slashes and underscores",
        func: |v| {
            v.chars()
                .filter(|c| !c.is_whitespace() && !matches!(c, '.' | ',' | '/' | '_'))
                .collect()
        },
    },
    ValueTransform {
        name: "strip_dashes",
        description: "Remove hyphens and dashes",
        func: |v| v.chars().filter(|c| !matches!(c, '-' | '‐' | '–' | '—')).collect(),
    },
    ValueTransform {
        name: "strip_currency",
        description: "Remove currency symbols and ISO currency codes",
        func: strip_currency,
    },
    ValueTransform {
        name: "strip_suffixes",
        description: "Remove spreadsheet decimal artifacts and known reference suffixes",
        func: strip_suffixes,
    },
    ValueTransform {
        name: "strip_leading_zeros",
        description: "Remove leading zeros from the value",
        func: |v| {
            let trimmed = v.trim();
            let stripped = trimmed.trim_start_matches('0');
            if stripped.is_empty() && !trimmed.is_empty() {
                "0".to_string()
            } else {
                stripped.to_string()
            }
        },
    },
    ValueTransform {
        name: "extract_digits",
        description: "Keep only the digits",
        func: |v| v.chars().filter(char::is_ascii_digit).collect(),
    },
    ValueTransform {
        name: "normalize_date",
        description: "Rewrite recognizable dates as YYYY-MM-DD",
        func: |v| match parse_date(v) {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => v.to_string(),
        },
    },
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₣', '₹', '₽', '¢'];
const CURRENCY_CODES: &[&str] = &["EUR", "USD", "GBP", "CHF", "JPY", "CAD", "XOF", "XAF", "MAD"];
const REFERENCE_SUFFIXES: &[&str] = &["_bo", "-bo", "_partner", "-partner", "_ref", "-ref"];

fn strip_currency(value: &str) -> String {
    let without_symbols: String = value
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c))
        .collect();
    without_symbols
        .split_whitespace()
        .filter(|token| !CURRENCY_CODES.contains(&token.to_uppercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_suffixes(value: &str) -> String {
    let mut current = value.trim();

    // "1234.0" and "1234.00" as exported by spreadsheets
    if let Some((head, tail)) = current.rsplit_once('.') {
        if !head.is_empty() && !tail.is_empty() && tail.bytes().all(|b| b == b'0') {
            current = head;
        }
    }

    for suffix in REFERENCE_SUFFIXES {
        let Some(cut) = current.len().checked_sub(suffix.len()).filter(|&cut| cut > 0) else {
            continue;
        };
        if current
            .get(cut..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
        {
            return current[..cut].to_string();
        }
    }
    current.to_string()
}

pub fn find(name: &str) -> Option<&'static ValueTransform> {
    TRANSFORMS.iter().find(|t| t.name == name)
}

/// Copy of `left` with the candidate's transform applied to its left key
/// column. Without a transform the dataset is returned unchanged.
pub fn prepare_left(candidate: &KeyCandidate, left: &Dataset) -> Dataset {
    let Some(transform) = candidate.transformation.as_deref().and_then(find) else {
        return left.clone();
    };

    left.iter()
        .map(|row| {
            let mut row = row.clone();
            if let Some(value) = row.get(&candidate.left_column) {
                let transformed = transform.apply(value);
                row.set(candidate.left_column.as_str(), transformed);
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        candidate::{SampleValues, ScoreBreakdown, Uniqueness},
        records::row::Row,
    };

    fn apply(name: &str, value: &str) -> String {
        find(name).unwrap().apply(value)
    }

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<_> = TRANSFORMS.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TRANSFORMS.len());
    }

    #[test]
    fn transforms_behave() {
        assert_eq!(apply("trim", "  a "), "a");
        assert_eq!(apply("strip_separators", "FR 76.30_04/1"), "FR7630041");
        assert_eq!(apply("strip_dashes", "INV-2024-001"), "INV2024001");
        assert_eq!(apply("strip_currency", "€ 100 EUR"), "100");
        assert_eq!(apply("strip_suffixes", "4521.0"), "4521");
        assert_eq!(apply("strip_suffixes", "REF881_BO"), "REF881");
        assert_eq!(apply("strip_leading_zeros", "000123"), "123");
        assert_eq!(apply("strip_leading_zeros", "000"), "0");
        assert_eq!(apply("extract_digits", "INV-0042"), "0042");
        assert_eq!(apply("normalize_date", "05/01/2024"), "2024-01-05");
        assert_eq!(apply("normalize_date", "n/a"), "n/a");
        assert!(find("reverse").is_none());
    }

    #[test]
    fn prepare_left_rewrites_key_column() {
        let candidate = KeyCandidate {
            left_column: "ref".into(),
            right_column: "reference".into(),
            confidence: 0.9,
            uniqueness: Uniqueness::default(),
            sample_values: SampleValues::default(),
            transformation: Some("strip_dashes".into()),
            breakdown: ScoreBreakdown::default(),
        };
        let left = Dataset::new(vec![
            Row::from_pairs([("ref", "A-1"), ("amount", "10")]),
            Row::from_pairs([("amount", "20")]),
        ]);

        let prepared = prepare_left(&candidate, &left);
        assert_eq!(prepared.rows()[0].get("ref"), Some("A1"));
        assert_eq!(prepared.rows()[0].get("amount"), Some("10"));
        assert!(!prepared.rows()[1].contains("ref"));
    }
}
