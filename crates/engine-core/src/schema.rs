use crate::error::ValidationError;
use model::records::dataset::Dataset;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSide {
    Left,
    Right,
}

impl fmt::Display for DatasetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSide::Left => f.write_str("left"),
            DatasetSide::Right => f.write_str("right"),
        }
    }
}

/// Fails when a declared column is absent from the dataset's observed schema.
///
/// Empty datasets have no observed schema and pass.
pub fn require_column(
    dataset: &Dataset,
    column: &str,
    side: DatasetSide,
) -> Result<(), ValidationError> {
    if column.trim().is_empty() {
        return Err(ValidationError::EmptyColumnName { side });
    }
    if dataset.is_empty() || dataset.has_column(column) {
        return Ok(());
    }

    Err(ValidationError::MissingColumn {
        side,
        column: column.to_string(),
        observed: dataset.columns().join(", "),
    })
}

pub fn require_columns<'a, I>(
    dataset: &Dataset,
    columns: I,
    side: DatasetSide,
) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    for column in columns {
        require_column(dataset, column, side)?;
    }
    Ok(())
}
