use crate::records::row::Row;
use serde::{Deserialize, Serialize};

/// An ordered, read-only sequence of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(rows: Vec<Row>) -> Self {
        Dataset { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Observed schema: the union of column names across all rows, in
    /// first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            for column in row.columns() {
                if !seen.iter().any(|c| c == column) {
                    seen.push(column.to_string());
                }
            }
        }
        seen
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains(column))
    }

    /// Bounded sample: every row when the dataset is small enough, otherwise
    /// `size` rows picked at a fixed stride starting from the first row.
    pub fn sample(&self, size: usize) -> Vec<&Row> {
        if size == 0 {
            return Vec::new();
        }
        if self.rows.len() <= size {
            return self.rows.iter().collect();
        }

        let stride = self.rows.len() / size;
        self.rows.iter().step_by(stride).take(size).collect()
    }

    pub fn approx_bytes(&self) -> usize {
        self.rows.iter().map(Row::approx_bytes).sum()
    }
}

impl From<Vec<Row>> for Dataset {
    fn from(rows: Vec<Row>) -> Self {
        Dataset::new(rows)
    }
}

impl FromIterator<Row> for Dataset {
    fn from_iter<T: IntoIterator<Item = Row>>(iter: T) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
