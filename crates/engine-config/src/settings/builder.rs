use crate::settings::{
    AnalyzerSettings, ChunkingSettings, ExecutionMode, ReconSettings, RetrySettings,
    StrategyThresholds,
};

/// Programmatic counterpart of a settings file; unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct ReconSettingsBuilder {
    pub chunking: Option<ChunkingSettings>,
    pub execution: Option<ExecutionMode>,
    pub retry: Option<RetrySettings>,
    pub chunk_timeout_secs: Option<u64>,
    pub strategy: Option<StrategyThresholds>,
    pub analyzer: Option<AnalyzerSettings>,
    pub comparison_columns: Option<Vec<String>>,
}

impl ReconSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunking(mut self, chunking: ChunkingSettings) -> Self {
        self.chunking = Some(chunking);
        self
    }

    pub fn chunk_size(self, chunk_size: usize) -> Self {
        self.chunking(ChunkingSettings::fixed(chunk_size))
    }

    pub fn execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = Some(execution);
        self
    }

    pub fn retry(mut self, retry: RetrySettings) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn chunk_timeout_secs(mut self, secs: u64) -> Self {
        self.chunk_timeout_secs = Some(secs);
        self
    }

    pub fn strategy(mut self, strategy: StrategyThresholds) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn analyzer(mut self, analyzer: AnalyzerSettings) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn comparison_columns(mut self, columns: Vec<String>) -> Self {
        self.comparison_columns = Some(columns);
        self
    }

    pub fn build(self) -> ReconSettings {
        let defaults = ReconSettings::default();
        ReconSettings {
            chunking: self.chunking.unwrap_or(defaults.chunking),
            execution: self.execution.unwrap_or(defaults.execution),
            retry: self.retry.unwrap_or(defaults.retry),
            chunk_timeout_secs: self
                .chunk_timeout_secs
                .unwrap_or(defaults.chunk_timeout_secs),
            strategy: self.strategy.unwrap_or(defaults.strategy),
            analyzer: self.analyzer.unwrap_or(defaults.analyzer),
            comparison_columns: self
                .comparison_columns
                .unwrap_or(defaults.comparison_columns),
        }
    }
}

impl ReconSettings {
    pub fn builder() -> ReconSettingsBuilder {
        ReconSettingsBuilder::new()
    }
}
