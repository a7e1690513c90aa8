use crate::keys::{
    direction::{Direction, DirectionRules},
    normalize::{amount_digits, date_segment, normalize_counterparty, parse_amount},
};
use engine_core::{
    error::ValidationError,
    schema::{DatasetSide, require_columns},
};
use model::records::{dataset::Dataset, row::Row};
use std::collections::HashMap;
use tracing::{debug, info};

const SEGMENT_SEPARATOR: &str = "|";

/// Columns a canonical key is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    pub date: String,
    pub amount: String,
    pub counterparty: String,
    /// Free-text operation type consulted by the direction rules.
    pub operation_type: Option<String>,
}

impl KeyColumns {
    pub fn new(
        date: impl Into<String>,
        amount: impl Into<String>,
        counterparty: impl Into<String>,
    ) -> Self {
        KeyColumns {
            date: date.into(),
            amount: amount.into(),
            counterparty: counterparty.into(),
            operation_type: None,
        }
    }

    pub fn with_operation_type(mut self, column: impl Into<String>) -> Self {
        self.operation_type = Some(column.into());
        self
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        [self.date.as_str(), self.amount.as_str(), self.counterparty.as_str()]
            .into_iter()
            .chain(self.operation_type.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalKey {
    /// `base` with the occurrence index appended to the direction segment.
    pub key: String,
    /// `date|amount|counterparty|direction`, shared by duplicates.
    pub base: String,
    pub direction: Direction,
    /// 1-based position of this row among rows with the same base key.
    pub occurrence: u32,
}

/// Derives deterministic join keys, numbering rows that share a base key in
/// the order they are built.
///
/// Counters live for one batch; call [`CanonicalKeyBuilder::reset`] between
/// datasets, or use [`CanonicalKeyBuilder::annotate`], which does so itself.
#[derive(Debug, Clone)]
pub struct CanonicalKeyBuilder {
    columns: KeyColumns,
    rules: DirectionRules,
    occurrences: HashMap<String, u32>,
}

impl CanonicalKeyBuilder {
    pub fn new(columns: KeyColumns) -> Self {
        Self::with_rules(columns, DirectionRules::default())
    }

    pub fn with_rules(columns: KeyColumns, rules: DirectionRules) -> Self {
        CanonicalKeyBuilder {
            columns,
            rules,
            occurrences: HashMap::new(),
        }
    }

    pub fn columns(&self) -> &KeyColumns {
        &self.columns
    }

    pub fn reset(&mut self) {
        self.occurrences.clear();
    }

    /// Fails when a configured column is absent from the dataset.
    pub fn validate(&self, dataset: &Dataset, side: DatasetSide) -> Result<(), ValidationError> {
        require_columns(dataset, self.columns.names(), side)
    }

    /// Builds the key for the next row of the current batch.
    ///
    /// Missing or unreadable amounts count as zero and missing dates leave the
    /// date segment empty; such rows get degenerate keys rather than errors.
    pub fn build(&mut self, row: &Row) -> CanonicalKey {
        let raw_amount = row.get_non_empty(&self.columns.amount);
        let amount = raw_amount.and_then(parse_amount);
        if amount.is_none() && raw_amount.is_some() {
            debug!(value = ?raw_amount, "Unreadable amount, treating as zero");
        }

        let raw_date = row.get_non_empty(&self.columns.date);
        let date = date_segment(raw_date);
        if date.is_empty() && raw_date.is_some() {
            debug!(value = ?raw_date, "Unreadable date, leaving date segment empty");
        }

        let operation_type = self
            .columns
            .operation_type
            .as_deref()
            .and_then(|column| row.get_non_empty(column));
        let direction = self.rules.infer(operation_type, amount.as_ref());

        let base = [
            date,
            amount_digits(amount.as_ref()),
            normalize_counterparty(row.get_non_empty(&self.columns.counterparty)),
            direction.to_string(),
        ]
        .join(SEGMENT_SEPARATOR);

        let counter = self.occurrences.entry(base.clone()).or_insert(0);
        *counter += 1;
        let occurrence = *counter;

        CanonicalKey {
            key: format!("{base}{occurrence}"),
            base,
            direction,
            occurrence,
        }
    }

    /// Validates the dataset, then returns a copy with each row's key written
    /// to `key_column`. Counters start fresh for every call.
    pub fn annotate(
        &mut self,
        dataset: &Dataset,
        side: DatasetSide,
        key_column: &str,
    ) -> Result<Dataset, ValidationError> {
        if key_column.trim().is_empty() {
            return Err(ValidationError::EmptyColumnName { side });
        }
        self.validate(dataset, side)?;
        self.reset();

        let annotated: Dataset = dataset
            .iter()
            .map(|row| {
                let key = self.build(row);
                let mut row = row.clone();
                row.set(key_column, key.key);
                row
            })
            .collect();

        let duplicates = self.occurrences.values().filter(|&&n| n > 1).count();
        info!(
            %side,
            rows = annotated.len(),
            distinct_keys = self.occurrences.len(),
            duplicated_keys = duplicates,
            "Annotated dataset with canonical keys"
        );
        Ok(annotated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> KeyColumns {
        KeyColumns::new("date", "amount", "counterparty").with_operation_type("type")
    }

    fn row(date: &str, amount: &str, counterparty: &str, op: &str) -> Row {
        Row::from_pairs([
            ("date", date),
            ("amount", amount),
            ("counterparty", counterparty),
            ("type", op),
        ])
    }

    #[test]
    fn builds_segmented_key() {
        let mut builder = CanonicalKeyBuilder::new(columns());
        let key = builder.build(&row("05/01/2024", "-100", "Acme", "transfer"));

        assert_eq!(key.base, "20240105|10000|ACME|debit");
        assert_eq!(key.key, "20240105|10000|ACME|debit1");
        assert_eq!(key.direction, Direction::Debit);
        assert_eq!(key.occurrence, 1);
    }

    #[test]
    fn duplicates_get_increasing_occurrences() {
        let mut builder = CanonicalKeyBuilder::new(columns());
        let first = builder.build(&row("2024-01-05", "100.00", "ACME", "compensation"));
        let other = builder.build(&row("2024-01-06", "100.00", "ACME", "compensation"));
        let second = builder.build(&row("05.01.2024", "100", "acme", "Compensation"));

        assert!(first.key.ends_with("debit1"));
        assert!(second.key.ends_with("debit2"));
        assert_ne!(first.key, second.key);
        assert_eq!(other.occurrence, 1);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut builder = CanonicalKeyBuilder::new(columns());
        let r = row("2024-01-05", "1", "A", "");
        builder.build(&r);
        builder.reset();
        assert_eq!(builder.build(&r).occurrence, 1);
    }

    #[test]
    fn degenerate_rows_still_get_keys() {
        let mut builder = CanonicalKeyBuilder::new(columns());
        let key = builder.build(&row("", "", "Acme", ""));
        assert_eq!(key.key, "|000|ACME|credit1");
    }

    #[test]
    fn annotate_writes_key_column() {
        let dataset = Dataset::new(vec![
            row("2024-01-05", "100", "Acme", ""),
            row("2024-01-05", "100", "Acme", ""),
        ]);
        let mut builder = CanonicalKeyBuilder::new(columns());
        let annotated = builder
            .annotate(&dataset, DatasetSide::Left, "canonical_key")
            .unwrap();

        let keys: Vec<_> = annotated
            .iter()
            .map(|r| r.get("canonical_key").unwrap().to_string())
            .collect();
        assert_eq!(
            keys,
            vec!["20240105|10000|ACME|credit1", "20240105|10000|ACME|credit2"]
        );

        // a second batch numbers from 1 again
        let again = builder
            .annotate(&dataset, DatasetSide::Left, "canonical_key")
            .unwrap();
        assert_eq!(again.rows()[0].get("canonical_key"), Some(keys[0].as_str()));
    }

    #[test]
    fn annotate_rejects_missing_columns() {
        let dataset = Dataset::new(vec![Row::from_pairs([("date", "2024-01-05")])]);
        let mut builder = CanonicalKeyBuilder::new(columns());
        let err = builder
            .annotate(&dataset, DatasetSide::Right, "key")
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingColumn { ref column, .. } if column == "amount"
        ));
    }
}
