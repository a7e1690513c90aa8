use crate::{
    actor::{
        actor::{Actor, ActorContext},
        messages::{AggregatorMsg, ChunkOutcome, ChunkResult},
    },
    error::ActorError,
};
use async_trait::async_trait;
use engine_core::event_bus::bus::EventBus;
use engine_processing::matcher::compare;
use model::{
    matching::MatchedPair,
    progress::ProgressUpdate,
    records::row::Row,
};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Right rows not yet consumed, indexed by key with FIFO order per key.
#[derive(Debug, Default)]
pub struct RightPool {
    rows: Vec<Option<Row>>,
    by_key: HashMap<String, VecDeque<usize>>,
    remaining: usize,
}

impl RightPool {
    pub fn new(rows: Vec<Row>, key_column: &str) -> Self {
        let mut by_key: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (position, row) in rows.iter().enumerate() {
            if let Some(key) = row.get_non_empty(key_column) {
                by_key.entry(key.to_string()).or_default().push_back(position);
            }
        }

        RightPool {
            remaining: rows.len(),
            rows: rows.into_iter().map(Some).collect(),
            by_key,
        }
    }

    /// Removes and returns the earliest remaining row with this key.
    pub fn take(&mut self, key: &str) -> Option<Row> {
        let queue = self.by_key.get_mut(key)?;
        while let Some(position) = queue.pop_front() {
            if let Some(row) = self.rows.get_mut(position).and_then(Option::take) {
                self.remaining -= 1;
                return Some(row);
            }
        }
        None
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn snapshot(&self) -> Vec<Row> {
        self.rows.iter().flatten().cloned().collect()
    }

    pub fn into_remaining(self) -> Vec<Row> {
        self.rows.into_iter().flatten().collect()
    }
}

/// The finalized partition of a run.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub matches: Vec<MatchedPair>,
    pub left_only: Vec<Row>,
    pub right_only: Vec<Row>,
    pub merged_chunks: usize,
    pub merged_left: usize,
    pub reclassified_left: usize,
    pub failed_chunks: Vec<usize>,
    /// Completed chunks still waiting on a lower index when the run closed.
    pub discarded_chunks: usize,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    pub run_id: Uuid,
    pub total_chunks: usize,
    pub left_key: String,
    pub right_key: String,
    pub comparison_columns: Vec<String>,
}

/// Owns the remaining right pool and the run accumulators. Chunks are merged
/// strictly in index order; out-of-order arrivals wait in a buffer.
pub struct AggregatorActor {
    config: AggregatorConfig,
    bus: EventBus,
    pool: RightPool,
    snapshot: Option<Arc<Vec<Row>>>,
    pending: BTreeMap<usize, ChunkOutcome>,
    next_to_merge: usize,
    acc: Aggregate,
    finalized: bool,
}

impl AggregatorActor {
    pub fn new(config: AggregatorConfig, right: Vec<Row>, bus: EventBus) -> Self {
        let pool = RightPool::new(right, &config.right_key);
        Self {
            config,
            bus,
            pool,
            snapshot: None,
            pending: BTreeMap::new(),
            next_to_merge: 0,
            acc: Aggregate::default(),
            finalized: false,
        }
    }

    fn snapshot(&mut self) -> Arc<Vec<Row>> {
        self.snapshot
            .get_or_insert_with(|| Arc::new(self.pool.snapshot()))
            .clone()
    }

    async fn submit(&mut self, outcome: ChunkOutcome) {
        if self.finalized
            || outcome.index < self.next_to_merge
            || self.pending.contains_key(&outcome.index)
        {
            warn!(
                run_id = %self.config.run_id,
                chunk = outcome.index,
                "Ignoring duplicate or late chunk result"
            );
            return;
        }

        self.pending.insert(outcome.index, outcome);
        while let Some(ready) = self.pending.remove(&self.next_to_merge) {
            let index = ready.index;
            self.merge(ready);
            self.next_to_merge += 1;

            let step = format!("Merged chunk {}/{}", index + 1, self.config.total_chunks);
            self.publish_progress(Some(index), step).await;
        }
    }

    fn merge(&mut self, outcome: ChunkOutcome) {
        let ChunkOutcome {
            index,
            left,
            result,
        } = outcome;
        self.snapshot = None;
        self.acc.merged_chunks += 1;
        self.acc.merged_left += left.len();

        let response = match result {
            ChunkResult::Matched(response) => response,
            ChunkResult::Failed { error } => {
                debug!(chunk = index, rows = left.len(), %error, "Reclassifying failed chunk as left-only");
                self.acc.reclassified_left += left.len();
                self.acc.failed_chunks.push(index);
                self.acc.left_only.extend(left);
                return;
            }
        };

        // How many left rows per key the service paired. The pool decides
        // which right row each one actually gets.
        let mut claims: HashMap<String, usize> = HashMap::new();
        for pair in &response.matches {
            if let Some(key) = pair.left.get_non_empty(&self.config.left_key) {
                *claims.entry(key.to_string()).or_default() += 1;
            }
        }

        let mut demoted = 0usize;
        for row in left {
            let right = match row.get_non_empty(&self.config.left_key) {
                Some(key) if claim(&mut claims, key) => {
                    let taken = self.pool.take(key);
                    if taken.is_none() {
                        demoted += 1;
                    }
                    taken
                }
                _ => None,
            };

            match right {
                Some(right) => {
                    let differences = compare(&row, &right, &self.config.comparison_columns);
                    self.acc.matches.push(MatchedPair {
                        left: row,
                        right,
                        differences,
                    });
                }
                None => self.acc.left_only.push(row),
            }
        }

        if demoted > 0 {
            debug!(
                chunk = index,
                demoted,
                "Right rows already consumed by an earlier chunk; left rows kept as left-only"
            );
        }
    }

    async fn publish_progress(&self, chunk_index: Option<usize>, step: String) {
        let update = ProgressUpdate {
            percentage: ProgressUpdate::pending_percentage(
                self.acc.merged_chunks,
                self.config.total_chunks,
            ),
            chunk_index,
            processed_chunks: self.acc.merged_chunks,
            total_chunks: self.config.total_chunks,
            matched_count: self.acc.matches.len(),
            left_only_count: self.acc.left_only.len(),
            right_remaining_count: self.pool.remaining(),
            step,
        };
        self.bus.publish(update).await;
    }

    async fn finalize(&mut self, cancelled: bool) -> Result<Aggregate, ActorError> {
        if self.finalized {
            return Err(ActorError::AlreadyFinalized);
        }
        if !cancelled && self.next_to_merge < self.config.total_chunks {
            return Err(ActorError::Internal(format!(
                "{} of {} chunks were never merged",
                self.config.total_chunks - self.next_to_merge,
                self.config.total_chunks
            )));
        }
        self.finalized = true;

        let mut aggregate = std::mem::take(&mut self.acc);
        aggregate.discarded_chunks = self.pending.len();
        self.pending.clear();
        self.snapshot = None;
        aggregate.right_only = std::mem::take(&mut self.pool).into_remaining();

        let step = if cancelled {
            "Reconciliation cancelled"
        } else {
            "Reconciliation complete"
        };
        self.bus
            .publish(ProgressUpdate {
                percentage: 100.0,
                chunk_index: None,
                processed_chunks: aggregate.merged_chunks,
                total_chunks: self.config.total_chunks,
                matched_count: aggregate.matches.len(),
                left_only_count: aggregate.left_only.len(),
                right_remaining_count: aggregate.right_only.len(),
                step: step.to_string(),
            })
            .await;

        info!(
            run_id = %self.config.run_id,
            merged_chunks = aggregate.merged_chunks,
            discarded_chunks = aggregate.discarded_chunks,
            matches = aggregate.matches.len(),
            left_only = aggregate.left_only.len(),
            right_only = aggregate.right_only.len(),
            cancelled,
            "Aggregator finalized"
        );
        Ok(aggregate)
    }
}

fn claim(claims: &mut HashMap<String, usize>, key: &str) -> bool {
    match claims.get_mut(key) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

#[async_trait]
impl Actor<AggregatorMsg> for AggregatorActor {
    async fn on_start(&mut self, ctx: &ActorContext) -> Result<(), ActorError> {
        debug!(
            actor = ctx.name(),
            run_id = %self.config.run_id,
            total_chunks = self.config.total_chunks,
            right_rows = self.pool.remaining(),
            "Aggregator started"
        );
        Ok(())
    }

    async fn handle(&mut self, msg: AggregatorMsg, _ctx: &ActorContext) -> Result<(), ActorError> {
        match msg {
            AggregatorMsg::Snapshot { reply } => reply
                .send(self.snapshot())
                .map_err(|_| ActorError::ReplyDropped),
            AggregatorMsg::Submit(outcome) => {
                self.submit(outcome).await;
                Ok(())
            }
            AggregatorMsg::Status { chunk_index, step } => {
                if !self.finalized {
                    self.publish_progress(Some(chunk_index), step).await;
                }
                Ok(())
            }
            AggregatorMsg::Finalize { cancelled, reply } => {
                let result = self.finalize(cancelled).await;
                reply.send(result).map_err(|_| ActorError::ReplyDropped)
            }
        }
    }
}
