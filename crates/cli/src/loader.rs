use crate::error::CliError;
use model::records::{dataset::Dataset, row::Row};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileKind::Csv),
            "json" => Ok(FileKind::Json),
            _ => Err(CliError::UnsupportedFile(path.display().to_string())),
        }
    }
}

/// Reads a CSV file with a header row, or a JSON array of flat objects.
pub fn load_dataset(path: &Path) -> Result<Dataset, CliError> {
    let dataset = match FileKind::from_path(path)? {
        FileKind::Csv => read_csv(path)?,
        FileKind::Json => serde_json::from_str(&std::fs::read_to_string(path)?)?,
    };

    info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "Loaded dataset"
    );
    Ok(dataset)
}

fn read_csv(path: &Path) -> Result<Dataset, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // short records simply lack the trailing columns
        rows.push(Row::from_pairs(
            headers.iter().map(String::as_str).zip(record.iter()),
        ));
    }
    Ok(Dataset::new(rows))
}

/// Writes rows as CSV (header = every column seen) or as a JSON array,
/// depending on the extension.
pub fn write_dataset(dataset: &Dataset, path: &Path) -> Result<(), CliError> {
    match FileKind::from_path(path)? {
        FileKind::Json => {
            let json = serde_json::to_string_pretty(dataset).map_err(CliError::JsonSerialize)?;
            std::fs::write(path, json)?;
        }
        FileKind::Csv => {
            let columns = dataset.columns();
            let mut writer = csv::Writer::from_path(path)?;
            writer.write_record(&columns)?;
            for row in dataset {
                writer.write_record(columns.iter().map(|c| row.get(c).unwrap_or_default()))?;
            }
            writer.flush()?;
        }
    }

    info!(path = %path.display(), rows = dataset.len(), "Wrote dataset");
    Ok(())
}
