use crate::{
    actor::{
        ActorRef,
        messages::{AggregatorMsg, ChunkOutcome, ChunkResult},
    },
    error::ReconError,
};
use engine_config::settings::ExecutionMode;
use engine_core::{
    error::MatchError,
    event_bus::bus::EventBus,
    governor::ConcurrencyGovernor,
    metrics::Metrics,
    retry::{RetryDisposition, RetryError, RetryNotice, RetryPolicy},
};
use engine_processing::MatchService;
use futures::stream::{FuturesUnordered, StreamExt};
use model::{
    chunk::ChunkJob,
    events::{ChunkFailed, ChunkRetrying},
    matching::{MatchRequest, MatchResponse},
    records::row::Row,
};
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub run_id: Uuid,
    pub total_chunks: usize,
    pub execution: ExecutionMode,
    pub retry: RetryPolicy,
    pub chunk_timeout: Duration,
    pub left_key: String,
    pub right_key: String,
    pub comparison_columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestrationSummary {
    /// Cancellation stopped submissions or discarded results.
    pub cancelled: bool,
    pub submitted: usize,
    /// In-flight calls that finished after cancellation; their results are
    /// never merged.
    pub discarded: usize,
}

/// Drives chunk calls against the match service with bounded concurrency,
/// retry and cooperative cancellation, forwarding every finished chunk to the
/// aggregator.
pub struct ChunkOrchestrator {
    config: OrchestratorConfig,
    service: Arc<dyn MatchService>,
    aggregator: ActorRef<AggregatorMsg>,
    governor: ConcurrencyGovernor,
    metrics: Metrics,
    bus: EventBus,
    cancel: CancellationToken,
}

impl ChunkOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn MatchService>,
        aggregator: ActorRef<AggregatorMsg>,
        metrics: Metrics,
        bus: EventBus,
        cancel: CancellationToken,
    ) -> Self {
        let governor = ConcurrencyGovernor::new(config.execution.max_in_flight());
        Self {
            config,
            service,
            aggregator,
            governor,
            metrics,
            bus,
            cancel,
        }
    }

    pub fn governor(&self) -> &ConcurrencyGovernor {
        &self.governor
    }

    pub async fn run(&self, jobs: Vec<ChunkJob>) -> Result<OrchestrationSummary, ReconError> {
        let cooldown = self.config.execution.cooldown();
        let mut queue: VecDeque<ChunkJob> = jobs.into();
        let mut in_flight = FuturesUnordered::new();
        let mut summary = OrchestrationSummary::default();
        let mut draining = false;

        info!(
            run_id = %self.config.run_id,
            chunks = queue.len(),
            max_in_flight = self.governor.cap(),
            service = self.service.name(),
            "Starting chunk orchestration"
        );

        loop {
            while !summary.cancelled && self.governor.has_room(in_flight.len()) {
                let Some(job) = queue.pop_front() else {
                    break;
                };

                if summary.submitted > 0 && !cooldown.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(cooldown) => {}
                        _ = self.cancel.cancelled() => {}
                    }
                }

                if self.cancel.is_cancelled() {
                    warn!(
                        run_id = %self.config.run_id,
                        next_chunk = job.index,
                        unsubmitted = queue.len() + 1,
                        "Cancellation requested, no further chunks will be submitted"
                    );
                    summary.cancelled = true;
                    break;
                }

                summary.submitted += 1;
                self.metrics.increment_submitted();
                in_flight.push(self.process(job));
            }

            let next = if draining {
                in_flight.next().await
            } else {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => {
                        if in_flight.is_empty() && queue.is_empty() {
                            break;
                        }
                        warn!(
                            run_id = %self.config.run_id,
                            in_flight = in_flight.len(),
                            unsubmitted = queue.len(),
                            "Cancellation requested, waiting for in-flight chunks and discarding their results"
                        );
                        summary.cancelled = true;
                        draining = true;
                        continue;
                    }
                    next = in_flight.next() => next,
                }
            };

            let Some(outcome) = next else {
                break;
            };

            if draining {
                debug!(chunk = outcome.index, "Discarding chunk outcome after cancellation");
                summary.discarded += 1;
                self.metrics.increment_discarded();
                continue;
            }

            debug!(chunk = outcome.index, "Forwarding chunk outcome to aggregator");
            self.aggregator.send(AggregatorMsg::Submit(outcome)).await?;
        }

        info!(
            run_id = %self.config.run_id,
            submitted = summary.submitted,
            discarded = summary.discarded,
            cancelled = summary.cancelled,
            final_cap = self.governor.cap(),
            "Chunk orchestration finished"
        );
        Ok(summary)
    }

    async fn process(&self, mut job: ChunkJob) -> ChunkOutcome {
        let index = job.index;
        let left = std::mem::take(&mut job.left);
        job.mark_running();
        debug!(chunk = index, rows = left.len(), "Submitting chunk");

        let result = self
            .config
            .retry
            .run_observed(
                || self.attempt(&left),
                |err| self.classify(index, err),
                |notice| {
                    job.mark_retrying();
                    self.notify_retry(index, notice)
                },
            )
            .await;

        match result {
            Ok(response) => {
                job.mark_succeeded();
                self.metrics.increment_succeeded();
                info!(
                    chunk = index,
                    rows = left.len(),
                    matches = response.matches.len(),
                    retries = job.retry_count,
                    service_ms = response.execution_time_ms,
                    "Chunk matched"
                );
                ChunkOutcome {
                    index,
                    left,
                    result: ChunkResult::Matched(response),
                }
            }
            Err(err) => {
                job.mark_failed();
                let exhausted = matches!(err, RetryError::AttemptsExceeded(_));
                let err = err.into_inner();

                if self.cancel.is_cancelled() {
                    debug!(chunk = index, error = %err, "Chunk abandoned after cancellation");
                } else {
                    self.metrics.increment_failed();
                    error!(
                        chunk = index,
                        rows = left.len(),
                        retries = job.retry_count,
                        exhausted,
                        error = %err,
                        "Chunk failed, reclassifying its rows as left-only"
                    );
                    self.bus
                        .publish(ChunkFailed {
                            run_id: self.config.run_id,
                            chunk_index: index,
                            reclassified_rows: left.len(),
                            error: err.to_string(),
                            timestamp: chrono::Utc::now(),
                        })
                        .await;
                }

                ChunkOutcome {
                    index,
                    left,
                    result: ChunkResult::Failed {
                        error: err.to_string(),
                    },
                }
            }
        }
    }

    /// One call against the current right pool.
    async fn attempt(&self, left: &[Row]) -> Result<MatchResponse, MatchError> {
        // no new calls once cancelled, including retries after a backoff
        if self.cancel.is_cancelled() {
            return Err(MatchError::Internal("run cancelled".to_string()));
        }

        let snapshot = self
            .aggregator
            .ask(|reply| AggregatorMsg::Snapshot { reply })
            .await
            .map_err(|e| MatchError::Internal(format!("right pool unavailable: {e}")))?;

        let request = MatchRequest {
            left_rows: left.to_vec(),
            right_rows: snapshot.as_ref().clone(),
            left_key_column: self.config.left_key.clone(),
            right_key_column: self.config.right_key.clone(),
            comparison_columns: self.config.comparison_columns.clone(),
        };

        let response = tokio::time::timeout(self.config.chunk_timeout, self.service.match_rows(request))
            .await
            .map_err(|_| MatchError::Timeout(self.config.chunk_timeout))??;

        let accounted = response.matches.len() + response.left_only.len();
        if accounted != left.len() {
            return Err(MatchError::Decode(format!(
                "response accounts for {accounted} of {} left rows",
                left.len()
            )));
        }
        Ok(response)
    }

    fn classify(&self, index: usize, err: &MatchError) -> RetryDisposition {
        if self.cancel.is_cancelled() || !err.is_transient() {
            return RetryDisposition::Stop;
        }

        self.metrics.increment_transient_failures();
        warn!(chunk = index, error = %err, "Transient chunk failure");
        if self.governor.record_transient_failure().is_some() {
            self.metrics.increment_downgrades();
        }
        RetryDisposition::Retry
    }

    async fn notify_retry(&self, index: usize, notice: RetryNotice) {
        self.metrics.increment_retries();
        let delay_ms = notice.delay.as_millis() as u64;
        warn!(
            chunk = index,
            attempt = notice.attempt,
            delay_ms,
            error = %notice.error,
            "Retrying chunk after backoff"
        );

        self.bus
            .publish(ChunkRetrying {
                run_id: self.config.run_id,
                chunk_index: index,
                attempt: notice.attempt,
                delay_ms,
                error: notice.error,
                timestamp: chrono::Utc::now(),
            })
            .await;

        let step = format!(
            "Retrying chunk {}/{} (attempt {} failed, next try in {delay_ms}ms)",
            index + 1,
            self.config.total_chunks,
            notice.attempt
        );
        if let Err(e) = self
            .aggregator
            .send(AggregatorMsg::Status {
                chunk_index: index,
                step,
            })
            .await
        {
            warn!(chunk = index, error = %e, "Failed to report retry progress");
        }
    }
}
