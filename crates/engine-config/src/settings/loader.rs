use crate::settings::{ReconSettings, error::SettingsError};
use std::path::Path;
use tracing::info;

impl ReconSettings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json(source: &str) -> Result<Self, SettingsError> {
        let settings: ReconSettings = serde_json::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a JSON settings file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let settings = Self::from_json(&source)?;
        info!(
            path = %path.display(),
            execution = ?settings.execution,
            "Loaded reconciliation settings"
        );
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::{ExecutionMode, ReconSettings, error::SettingsError};
    use std::io::Write;

    #[test]
    fn partial_document_keeps_defaults() {
        let settings = ReconSettings::from_json(
            r#"{
                "execution": { "mode": "sequential", "cooldown_ms": 250 },
                "retry": { "max_attempts": 5 },
                "comparison_columns": ["amount"]
            }"#,
        )
        .unwrap();

        assert_eq!(
            settings.execution,
            ExecutionMode::Sequential { cooldown_ms: 250 }
        );
        assert_eq!(settings.retry.max_attempts, 5);
        assert_eq!(settings.retry.base_delay_ms, 1_000);
        assert_eq!(settings.chunking.base_chunk_size, 50_000);
        assert_eq!(settings.comparison_columns, vec!["amount"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ReconSettings::from_json(r#"{ "chunk_size": 10 }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let err = ReconSettings::from_json(r#"{ "retry": { "multiplier": 0.5 } }"#).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { .. }));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "execution": {{ "mode": "parallel", "max_in_flight": 2 }} }}"#
        )
        .unwrap();

        let settings = ReconSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.execution.max_in_flight(), 2);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = ReconSettings::from_file("/nonexistent/tally.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tally.json"));
    }
}
