use crate::{
    commands::{Commands, ReconcileArgs},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use engine_config::ReconSettings;
use engine_core::{event_bus::bus::EventBus, schema::DatasetSide};
use engine_processing::{
    CanonicalKeyBuilder, HttpMatchService, KeyCandidateAnalyzer, KeyColumns, LocalMatchService,
    MatchService,
};
use engine_runtime::{ReconcileRequest, reconcile};
use model::{progress::ProgressUpdate, result::RunStatus};
use std::{path::Path, sync::Arc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod loader;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(name = "tally", version, about = "Record reconciliation tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli.command, &shutdown).await {
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => {
            warn!("Stopped on request; results reflect completed chunks only");
            ExitCode::ShutdownRequested
        }
        Err(e) => {
            error!(error = %e, "tally failed");
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(command: Commands, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    match command {
        Commands::Reconcile(args) => run_reconcile(args, shutdown).await,
        Commands::SuggestKeys {
            left,
            right,
            config,
            json,
        } => {
            let settings = load_settings(config.as_deref())?;
            let left = loader::load_dataset(&left)?;
            let right = loader::load_dataset(&right)?;

            let analyzer = KeyCandidateAnalyzer::from_settings(&settings.analyzer);
            let candidates = analyzer.analyze(&left, &right);
            if json {
                output::emit(&candidates, None).await
            } else {
                output::print_candidates(&candidates, analyzer.auto_threshold());
                Ok(())
            }
        }
        Commands::Keys {
            input,
            date_column,
            amount_column,
            counterparty_column,
            type_column,
            key_column,
            output: destination,
        } => {
            let dataset = loader::load_dataset(&input)?;
            let mut columns = KeyColumns::new(date_column, amount_column, counterparty_column);
            if let Some(column) = type_column {
                columns = columns.with_operation_type(column);
            }

            let annotated =
                CanonicalKeyBuilder::new(columns).annotate(&dataset, DatasetSide::Left, &key_column)?;
            match destination {
                Some(path) => loader::write_dataset(&annotated, &path),
                None => output::emit(&annotated, None).await,
            }
        }
    }
}

async fn run_reconcile(args: ReconcileArgs, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let mut settings = load_settings(args.config.as_deref())?;
    args.apply_to(&mut settings);

    let service = match_service(&args, &settings)?;
    let left = loader::load_dataset(&args.left)?;
    let right = loader::load_dataset(&args.right)?;

    let mut request = ReconcileRequest::automatic(left, right);
    request.keys = args.key_selection();

    let bus = EventBus::new();
    let progress = log_progress(&bus).await;

    // the bus is dropped when the run returns, which ends the progress stream
    let outcome = reconcile(request, &settings, service, bus, shutdown.cancel_token()).await;
    match progress.await {
        Ok(logged) => debug!(logged, "Progress logger finished"),
        Err(e) => warn!(error = %e, "Progress logger stopped unexpectedly"),
    }
    let result = outcome?;

    info!(
        run_id = %result.run_id,
        matches = result.total_matches,
        with_differences = result.matches_with_differences,
        left_only = result.left_only.len(),
        right_only = result.right_only.len(),
        failed_chunks = result.failed_chunks.len(),
        fingerprint = %result.fingerprint,
        "Reconciliation summary"
    );
    output::emit(&result, args.output.as_deref()).await?;

    if result.status == RunStatus::Cancelled || shutdown.is_shutdown_requested() {
        return Err(CliError::ShutdownRequested);
    }
    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<ReconSettings, CliError> {
    match path {
        Some(path) => Ok(ReconSettings::from_file(path)?),
        None => Ok(ReconSettings::default()),
    }
}

fn match_service(args: &ReconcileArgs, settings: &ReconSettings) -> Result<Arc<dyn MatchService>, CliError> {
    let Some(endpoint) = &args.endpoint else {
        return Ok(Arc::new(LocalMatchService::new()));
    };

    let mut service = HttpMatchService::new(endpoint.as_str(), settings.chunk_timeout())?;
    if let Some(token) = &args.token {
        service = service.with_bearer_token(token.as_str());
    }
    info!(endpoint = %service.endpoint(), "Using remote match service");
    Ok(Arc::new(service))
}

/// Logs progress until the final update or until the bus is dropped, and
/// returns how many updates were logged.
async fn log_progress(bus: &EventBus) -> JoinHandle<usize> {
    let mut updates = bus.receiver::<ProgressUpdate>(256).await;
    tokio::spawn(async move {
        let mut logged = 0;
        while let Some(update) = updates.recv().await {
            logged += 1;
            info!(
                percentage = update.percentage,
                processed = update.processed_chunks,
                total = update.total_chunks,
                matched = update.matched_count,
                right_remaining = update.right_remaining_count,
                "{}",
                update.step
            );
            if update.is_final() {
                break;
            }
        }
        logged
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn update(percentage: f64) -> ProgressUpdate {
        ProgressUpdate {
            percentage,
            chunk_index: None,
            processed_chunks: 0,
            total_chunks: 1,
            matched_count: 0,
            left_only_count: 0,
            right_remaining_count: 0,
            step: "step".to_string(),
        }
    }

    #[tokio::test]
    async fn progress_logger_sees_the_final_update_before_the_bus_closes() {
        let bus = EventBus::new();
        let logger = log_progress(&bus).await;

        bus.publish(update(50.0)).await;
        bus.publish(update(100.0)).await;
        drop(bus);

        let logged = tokio::time::timeout(Duration::from_secs(5), logger)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logged, 2);
    }

    #[tokio::test]
    async fn progress_logger_stops_when_the_bus_is_dropped() {
        let bus = EventBus::new();
        let logger = log_progress(&bus).await;

        bus.publish(update(50.0)).await;
        drop(bus);

        let logged = tokio::time::timeout(Duration::from_secs(5), logger)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logged, 1);
    }
}
