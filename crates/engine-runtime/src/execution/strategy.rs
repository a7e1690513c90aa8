use engine_config::settings::ReconSettings;
use model::records::dataset::Dataset;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// All left rows in one call.
    SingleShot,
    /// Fixed-size chunks of left rows.
    Chunked { chunk_size: usize },
}

impl ExecutionStrategy {
    pub fn chunk_size(&self, left_rows: usize) -> usize {
        match self {
            ExecutionStrategy::SingleShot => left_rows.max(1),
            ExecutionStrategy::Chunked { chunk_size } => (*chunk_size).max(1),
        }
    }
}

/// Single-shot for small inputs, chunked once the combined row count or byte
/// size passes the configured thresholds.
pub fn select_strategy(left: &Dataset, right: &Dataset, settings: &ReconSettings) -> ExecutionStrategy {
    let rows = left.len() + right.len();
    let bytes = left.approx_bytes() + right.approx_bytes();
    let thresholds = &settings.strategy;

    let strategy = if rows > thresholds.max_single_shot_rows || bytes > thresholds.max_single_shot_bytes {
        ExecutionStrategy::Chunked {
            chunk_size: settings.chunking.chunk_size_for(right.len()),
        }
    } else {
        ExecutionStrategy::SingleShot
    };

    info!(rows, bytes, ?strategy, "Selected execution strategy");
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::settings::StrategyThresholds;
    use model::records::row::Row;

    fn dataset(n: usize) -> Dataset {
        (0..n)
            .map(|i| Row::from_pairs([("id", format!("{i:08}"))]))
            .collect()
    }

    #[test]
    fn small_inputs_run_in_one_shot() {
        let settings = ReconSettings::default();
        let strategy = select_strategy(&dataset(10), &dataset(10), &settings);
        assert_eq!(strategy, ExecutionStrategy::SingleShot);
        assert_eq!(strategy.chunk_size(10), 10);
        assert_eq!(strategy.chunk_size(0), 1);
    }

    #[test]
    fn row_threshold_switches_to_chunks() {
        let settings = ReconSettings {
            strategy: StrategyThresholds {
                max_single_shot_rows: 15,
                ..Default::default()
            },
            ..Default::default()
        };
        let strategy = select_strategy(&dataset(10), &dataset(10), &settings);
        assert_eq!(strategy, ExecutionStrategy::Chunked { chunk_size: 50_000 });
    }

    #[test]
    fn byte_threshold_switches_to_chunks() {
        let settings = ReconSettings {
            strategy: StrategyThresholds {
                max_single_shot_rows: 1_000,
                max_single_shot_bytes: 100,
            },
            ..ReconSettings::builder().chunk_size(4).build()
        };
        let strategy = select_strategy(&dataset(10), &dataset(1), &settings);
        assert_eq!(strategy, ExecutionStrategy::Chunked { chunk_size: 4 });
    }
}
