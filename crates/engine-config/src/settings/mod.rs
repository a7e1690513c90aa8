use crate::settings::error::SettingsError;
use engine_core::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod builder;
pub mod error;
pub mod loader;

/// Complete configuration of a reconciliation run.
///
/// Every field has a default, so a settings file only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconSettings {
    pub chunking: ChunkingSettings,
    pub execution: ExecutionMode,
    pub retry: RetrySettings,
    /// Upper bound for a single chunk call before it counts as a transient failure.
    pub chunk_timeout_secs: u64,
    pub strategy: StrategyThresholds,
    pub analyzer: AnalyzerSettings,
    /// Columns compared on every matched pair.
    pub comparison_columns: Vec<String>,
}

impl Default for ReconSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingSettings::default(),
            execution: ExecutionMode::default(),
            retry: RetrySettings::default(),
            chunk_timeout_secs: 3600,
            strategy: StrategyThresholds::default(),
            analyzer: AnalyzerSettings::default(),
            comparison_columns: Vec::new(),
        }
    }
}

impl ReconSettings {
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.chunking.validate()?;
        self.execution.validate()?;
        self.retry.validate()?;
        self.analyzer.validate()?;

        if self.chunk_timeout_secs == 0 {
            return Err(SettingsError::invalid(
                "chunk_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// How chunk calls are scheduled. Chosen by the caller, never inferred from
/// the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One chunk at a time with a fixed pause between chunks.
    Sequential { cooldown_ms: u64 },
    /// Up to `max_in_flight` chunk calls at once.
    Parallel { max_in_flight: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Parallel { max_in_flight: 3 }
    }
}

impl ExecutionMode {
    pub fn sequential() -> Self {
        ExecutionMode::Sequential { cooldown_ms: 500 }
    }

    pub fn max_in_flight(&self) -> usize {
        match self {
            ExecutionMode::Sequential { .. } => 1,
            ExecutionMode::Parallel { max_in_flight } => *max_in_flight,
        }
    }

    pub fn cooldown(&self) -> Duration {
        match self {
            ExecutionMode::Sequential { cooldown_ms } => Duration::from_millis(*cooldown_ms),
            ExecutionMode::Parallel { .. } => Duration::ZERO,
        }
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if let ExecutionMode::Parallel { max_in_flight: 0 } = self {
            return Err(SettingsError::invalid(
                "execution.max_in_flight",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Chunk size for right datasets larger than `right_rows_above`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTier {
    pub right_rows_above: usize,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingSettings {
    pub base_chunk_size: usize,
    pub min_chunk_size: usize,
    pub right_size_tiers: Vec<ChunkTier>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            base_chunk_size: 50_000,
            min_chunk_size: 1_000,
            right_size_tiers: vec![
                ChunkTier {
                    right_rows_above: 200_000,
                    chunk_size: 25_000,
                },
                ChunkTier {
                    right_rows_above: 500_000,
                    chunk_size: 10_000,
                },
            ],
        }
    }
}

impl ChunkingSettings {
    /// Fixed chunk size, ignoring the right dataset's size.
    pub fn fixed(chunk_size: usize) -> Self {
        Self {
            base_chunk_size: chunk_size,
            min_chunk_size: chunk_size.min(1),
            right_size_tiers: Vec::new(),
        }
    }

    /// Left rows per chunk: shrinks as the right dataset grows so each call
    /// stays within a bounded duration.
    pub fn chunk_size_for(&self, right_rows: usize) -> usize {
        let tiered = self
            .right_size_tiers
            .iter()
            .filter(|tier| right_rows > tier.right_rows_above)
            .map(|tier| tier.chunk_size)
            .min()
            .unwrap_or(self.base_chunk_size);

        tiered
            .min(self.base_chunk_size)
            .max(self.min_chunk_size)
            .max(1)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.base_chunk_size == 0 {
            return Err(SettingsError::invalid(
                "chunking.base_chunk_size",
                "must be greater than zero",
            ));
        }
        if self.min_chunk_size > self.base_chunk_size {
            return Err(SettingsError::invalid(
                "chunking.min_chunk_size",
                "must not exceed base_chunk_size",
            ));
        }
        if let Some(tier) = self.right_size_tiers.iter().find(|t| t.chunk_size == 0) {
            return Err(SettingsError::invalid(
                "chunking.right_size_tiers",
                format!("tier above {} rows has a zero chunk size", tier.right_rows_above),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            multiplier: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            self.multiplier,
            Duration::from_millis(self.max_delay_ms),
        )
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.max_attempts == 0 {
            return Err(SettingsError::invalid(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SettingsError::invalid(
                "retry.multiplier",
                "must be a finite number >= 1",
            ));
        }
        Ok(())
    }
}

/// Above either threshold the caller should reconcile in chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyThresholds {
    pub max_single_shot_rows: usize,
    pub max_single_shot_bytes: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            max_single_shot_rows: 100_000,
            max_single_shot_bytes: 50 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerSettings {
    pub sample_size: usize,
    /// Minimum confidence for unattended key selection.
    pub auto_threshold: f64,
    pub max_samples_per_candidate: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            sample_size: 1_000,
            auto_threshold: 0.70,
            max_samples_per_candidate: 5,
        }
    }
}

impl AnalyzerSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.sample_size == 0 {
            return Err(SettingsError::invalid(
                "analyzer.sample_size",
                "must be greater than zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.auto_threshold) {
            return Err(SettingsError::invalid(
                "analyzer.auto_threshold",
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = ReconSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.execution.max_in_flight(), 3);
        assert_eq!(settings.chunk_timeout(), Duration::from_secs(3600));
    }

    #[test]
    fn chunk_size_shrinks_with_right_dataset() {
        let chunking = ChunkingSettings::default();
        assert_eq!(chunking.chunk_size_for(10_000), 50_000);
        assert_eq!(chunking.chunk_size_for(200_000), 50_000);
        assert_eq!(chunking.chunk_size_for(200_001), 25_000);
        assert_eq!(chunking.chunk_size_for(2_000_000), 10_000);
    }

    #[test]
    fn fixed_chunking_ignores_right_size() {
        let chunking = ChunkingSettings::fixed(2_500);
        assert_eq!(chunking.chunk_size_for(0), 2_500);
        assert_eq!(chunking.chunk_size_for(10_000_000), 2_500);
    }

    #[test]
    fn sequential_mode_caps_at_one() {
        let mode = ExecutionMode::sequential();
        assert_eq!(mode.max_in_flight(), 1);
        assert_eq!(mode.cooldown(), Duration::from_millis(500));
        assert_eq!(ExecutionMode::default().cooldown(), Duration::ZERO);
    }

    #[test]
    fn rejects_zero_in_flight() {
        let settings = ReconSettings {
            execution: ExecutionMode::Parallel { max_in_flight: 0 },
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("execution.max_in_flight"));
    }

    #[test]
    fn retry_settings_build_policy() {
        let policy = RetrySettings::default().policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(10), Duration::from_secs(10));
    }
}
