#![allow(dead_code)]

use async_trait::async_trait;
use engine_config::settings::{ExecutionMode, ReconSettings, RetrySettings, builder::ReconSettingsBuilder};
use engine_core::{error::MatchError, event_bus::bus::EventBus};
use engine_processing::{MatchService, matcher};
use engine_runtime::{ExecutionStrategy, ReconcileRequest, reconcile};
use model::{
    matching::{MatchRequest, MatchResponse},
    records::dataset::Dataset,
    result::ReconciliationResult,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio_util::sync::CancellationToken;

pub mod integration;
pub mod keys;
pub mod utils;

const LEFT_KEY: &str = "ref";
const RIGHT_KEY: &str = "reference";

/// Settings with millisecond backoff so retry scenarios stay fast.
fn settings(execution: ExecutionMode) -> ReconSettings {
    ReconSettingsBuilder::new()
        .execution(execution)
        .retry(RetrySettings {
            max_attempts: 3,
            base_delay_ms: 1,
            multiplier: 2.0,
            max_delay_ms: 5,
        })
        .build()
}

async fn run_with(
    left: &Dataset,
    right: &Dataset,
    strategy: ExecutionStrategy,
    settings: &ReconSettings,
    service: Arc<dyn MatchService>,
) -> ReconciliationResult {
    let request = ReconcileRequest::new(left.clone(), right.clone(), LEFT_KEY, RIGHT_KEY)
        .with_strategy(strategy);
    reconcile(request, settings, service, EventBus::new(), CancellationToken::new())
        .await
        .expect("reconcile")
}

/// Fails the first `failures` calls of every chunk with a timeout.
pub struct FlakyService {
    failures: usize,
    attempts: Mutex<HashMap<String, usize>>,
    calls: AtomicUsize,
}

impl FlakyService {
    pub fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MatchService for FlakyService {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn match_rows(&self, request: MatchRequest) -> Result<MatchResponse, MatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // left rows carry a unique line id, so the first one names the chunk
        let chunk = request
            .left_rows
            .first()
            .and_then(|row| row.get("line"))
            .unwrap_or_default()
            .to_string();

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(chunk).or_default();
            *n += 1;
            *n
        };
        if attempt <= self.failures {
            return Err(MatchError::Timeout(Duration::from_secs(30)));
        }
        Ok(matcher::execute(request))
    }
}
