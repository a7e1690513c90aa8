use crate::{
    actor::{
        aggregator::{AggregatorActor, AggregatorConfig},
        messages::AggregatorMsg,
        spawn::spawn_actor,
    },
    error::ReconError,
    execution::{
        orchestrator::{ChunkOrchestrator, OrchestratorConfig},
        planner::plan_chunks,
        strategy::{ExecutionStrategy, select_strategy},
    },
};
use engine_config::settings::ReconSettings;
use engine_core::{
    event_bus::bus::EventBus,
    lifecycle::{RunLifecycle, RunState},
    metrics::Metrics,
    schema::{DatasetSide, require_column},
};
use engine_processing::{KeyCandidateAnalyzer, MatchService, analysis::transforms::prepare_left};
use model::{
    events::{RunFinished, RunStarted},
    records::dataset::Dataset,
    result::{ReconciliationResult, RunStatus, partition_fingerprint},
};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Mailbox size of the aggregator; snapshot requests and chunk outcomes
/// share it.
const AGGREGATOR_MAILBOX: usize = 64;

/// How the key columns of a run are chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection {
    Explicit { left: String, right: String },
    /// Run the key candidate analyzer and use the top candidate when it is
    /// confident enough.
    Automatic,
}

#[derive(Debug, Clone)]
pub struct ReconcileRequest {
    pub left: Dataset,
    pub right: Dataset,
    pub keys: KeySelection,
    /// Overrides the size-based strategy selection.
    pub strategy: Option<ExecutionStrategy>,
}

impl ReconcileRequest {
    pub fn new(
        left: Dataset,
        right: Dataset,
        left_key: impl Into<String>,
        right_key: impl Into<String>,
    ) -> Self {
        Self {
            left,
            right,
            keys: KeySelection::Explicit {
                left: left_key.into(),
                right: right_key.into(),
            },
            strategy: None,
        }
    }

    pub fn automatic(left: Dataset, right: Dataset) -> Self {
        Self {
            left,
            right,
            keys: KeySelection::Automatic,
            strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Reconciles two datasets through `service`.
///
/// Chunk failures never fail the run: their left rows end up in `left_only`.
/// Cancelling `cancel` stops submitting chunks and returns the partial result
/// with status `Cancelled`.
pub async fn reconcile(
    request: ReconcileRequest,
    settings: &ReconSettings,
    service: Arc<dyn MatchService>,
    bus: EventBus,
    cancel: CancellationToken,
) -> Result<ReconciliationResult, ReconError> {
    settings.validate()?;
    ReconExecutor {
        settings,
        service,
        bus,
        cancel,
        lifecycle: RunLifecycle::new(),
        run_id: Uuid::new_v4(),
    }
    .execute(request)
    .await
}

struct ReconExecutor<'a> {
    settings: &'a ReconSettings,
    service: Arc<dyn MatchService>,
    bus: EventBus,
    cancel: CancellationToken,
    lifecycle: RunLifecycle,
    run_id: Uuid,
}

impl ReconExecutor<'_> {
    async fn execute(mut self, request: ReconcileRequest) -> Result<ReconciliationResult, ReconError> {
        let started = Instant::now();
        let ReconcileRequest {
            left,
            right,
            keys,
            strategy,
        } = request;

        info!(
            run_id = %self.run_id,
            left_rows = left.len(),
            right_rows = right.len(),
            service = self.service.name(),
            "Starting reconciliation"
        );

        let (left, left_key, right_key) = match keys {
            KeySelection::Explicit { left: l, right: r } => (left, l, r),
            KeySelection::Automatic => {
                self.lifecycle.advance(RunState::KeyDiscovery)?;
                match self.discover_keys(&left, &right) {
                    Ok(found) => found,
                    Err(e) => return Err(self.fail(e)),
                }
            }
        };

        self.lifecycle.advance(RunState::Chunking)?;
        if let Err(e) = require_column(&left, &left_key, DatasetSide::Left)
            .and_then(|_| require_column(&right, &right_key, DatasetSide::Right))
        {
            warn!(run_id = %self.run_id, error = %e, "Rejecting reconciliation request");
            return Err(self.fail(e.into()));
        }

        let strategy = strategy.unwrap_or_else(|| select_strategy(&left, &right, self.settings));
        let total_left = left.len();
        let total_right = right.len();
        let chunk_size = strategy.chunk_size(total_left);
        let jobs = plan_chunks(left.into_rows(), chunk_size);
        let total_chunks = jobs.len();

        let (aggregator, aggregator_handle) = spawn_actor(
            format!("aggregator-{}", self.run_id),
            AGGREGATOR_MAILBOX,
            AggregatorActor::new(
                AggregatorConfig {
                    run_id: self.run_id,
                    total_chunks,
                    left_key: left_key.clone(),
                    right_key: right_key.clone(),
                    comparison_columns: self.settings.comparison_columns.clone(),
                },
                right.into_rows(),
                self.bus.clone(),
            ),
        );

        self.bus
            .publish(RunStarted {
                run_id: self.run_id,
                total_left,
                total_right,
                total_chunks,
                chunk_size,
                timestamp: chrono::Utc::now(),
            })
            .await;

        self.lifecycle.advance(RunState::Running)?;
        let metrics = Metrics::new();
        let orchestrator = ChunkOrchestrator::new(
            OrchestratorConfig {
                run_id: self.run_id,
                total_chunks,
                execution: self.settings.execution,
                retry: self.settings.retry.policy(),
                chunk_timeout: self.settings.chunk_timeout(),
                left_key,
                right_key,
                comparison_columns: self.settings.comparison_columns.clone(),
            },
            self.service.clone(),
            aggregator.clone(),
            metrics.clone(),
            self.bus.clone(),
            self.cancel.clone(),
        );
        let outcome = orchestrator.run(jobs).await;
        drop(orchestrator);
        let summary = match outcome {
            Ok(summary) => summary,
            Err(e) => {
                aggregator_handle.abort();
                return Err(self.fail(e));
            }
        };

        let cancelled = summary.cancelled;
        if cancelled {
            self.lifecycle.advance(RunState::Cancelled)?;
        } else {
            self.lifecycle.advance(RunState::Finalizing)?;
        }

        let finalized = aggregator
            .ask(|reply| AggregatorMsg::Finalize { cancelled, reply })
            .await
            .and_then(|aggregate| aggregate);
        drop(aggregator);
        let aggregate = match finalized {
            Ok(aggregate) => aggregate,
            Err(e) => {
                aggregator_handle.abort();
                return Err(self.fail(e.into()));
            }
        };
        aggregator_handle.await?;

        if !cancelled {
            self.lifecycle.advance(RunState::Completed)?;
        }

        let execution_time_ms = started.elapsed().as_millis() as u64;
        let fingerprint =
            partition_fingerprint(&aggregate.matches, &aggregate.left_only, &aggregate.right_only);
        let matches_with_differences = aggregate
            .matches
            .iter()
            .filter(|pair| pair.has_differences())
            .count();

        let result = ReconciliationResult {
            run_id: self.run_id,
            status: if cancelled {
                RunStatus::Cancelled
            } else {
                RunStatus::Completed
            },
            total_left,
            total_right,
            total_matches: aggregate.matches.len(),
            matches_with_differences,
            unprocessed_left: total_left - aggregate.merged_left,
            reclassified_left: aggregate.reclassified_left,
            failed_chunks: aggregate.failed_chunks,
            execution_time_ms,
            counters: metrics.snapshot(),
            fingerprint,
            matches: aggregate.matches,
            left_only: aggregate.left_only,
            right_only: aggregate.right_only,
        };

        self.bus
            .publish(RunFinished {
                run_id: self.run_id,
                cancelled,
                total_matches: result.total_matches,
                execution_time_ms,
                timestamp: chrono::Utc::now(),
            })
            .await;

        info!(
            run_id = %self.run_id,
            status = %result.status,
            matches = result.total_matches,
            left_only = result.left_only.len(),
            right_only = result.right_only.len(),
            reclassified = result.reclassified_left,
            unprocessed = result.unprocessed_left,
            execution_time_ms,
            "Reconciliation finished"
        );
        Ok(result)
    }

    /// Moves the run to `Failed` and hands the error back.
    fn fail(&mut self, err: ReconError) -> ReconError {
        error!(
            run_id = %self.run_id,
            state = %self.lifecycle.state(),
            error = %err,
            "Reconciliation failed"
        );
        if let Err(e) = self.lifecycle.advance(RunState::Failed) {
            warn!(run_id = %self.run_id, error = %e, "Run already settled");
        }
        err
    }

    /// Picks the key pair from the analyzer's top candidate, confirmed over
    /// the full datasets, and applies its transform to the left rows.
    fn discover_keys(
        &self,
        left: &Dataset,
        right: &Dataset,
    ) -> Result<(Dataset, String, String), ReconError> {
        let analyzer = KeyCandidateAnalyzer::from_settings(&self.settings.analyzer);
        let threshold = analyzer.auto_threshold();
        let candidates = analyzer.analyze(left, right);

        let Some(top) = analyzer.select_automatic(&candidates) else {
            return Err(ReconError::NoConfidentKey {
                confidence: candidates.first().map_or(0.0, |c| c.confidence),
                threshold,
            });
        };

        let confirmed = analyzer.confirm(top, left, right);
        if !confirmed.meets(threshold) {
            return Err(ReconError::NoConfidentKey {
                confidence: confirmed.confidence,
                threshold,
            });
        }

        info!(
            run_id = %self.run_id,
            left = %confirmed.left_column,
            right = %confirmed.right_column,
            confidence = confirmed.confidence,
            transformation = ?confirmed.transformation,
            "Selected key columns automatically"
        );
        let prepared = prepare_left(&confirmed, left);
        Ok((prepared, confirmed.left_column, confirmed.right_column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ActorError, tests::mocks::EchoService};

    #[test]
    fn runtime_fault_fails_a_running_run() {
        let settings = ReconSettings::default();
        let mut executor = ReconExecutor {
            settings: &settings,
            service: Arc::new(EchoService),
            bus: EventBus::new(),
            cancel: CancellationToken::new(),
            lifecycle: RunLifecycle::new(),
            run_id: Uuid::new_v4(),
        };
        executor.lifecycle.advance(RunState::Chunking).unwrap();
        executor.lifecycle.advance(RunState::Running).unwrap();

        let err = executor.fail(ActorError::MailboxClosed.into());

        assert!(matches!(err, ReconError::Actor(ActorError::MailboxClosed)));
        assert_eq!(executor.lifecycle.state(), RunState::Failed);
    }
}
