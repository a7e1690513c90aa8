use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What to do with a received termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Stop submitting chunks and let the run report a partial result.
    Cancel,
    /// The run was already asked to stop; exit without waiting for it.
    ForceExit,
}

/// Turns SIGINT/SIGTERM into cooperative cancellation of the running
/// reconciliation. A second signal exits immediately.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register_handlers(&self) {
        let coordinator = self.clone();

        tokio::spawn(async move {
            loop {
                let name = wait_for_signal().await;
                match coordinator.on_signal(name) {
                    SignalAction::Cancel => {
                        info!(
                            signal = name,
                            "Stopping: no further chunks will be submitted, press Ctrl+C again to exit immediately"
                        );
                    }
                    SignalAction::ForceExit => {
                        warn!(signal = name, "Second termination signal, exiting without waiting for the run");
                        std::process::exit(ExitCode::ShutdownRequested.as_i32());
                    }
                }
            }
        });
    }

    /// Records a signal; the first one cancels the run.
    pub fn on_signal(&self, name: &str) -> SignalAction {
        if self.shutdown_requested.swap(true, Ordering::SeqCst) {
            return SignalAction::ForceExit;
        }
        debug!(signal = name, "Cancelling reconciliation");
        self.cancel_token.cancel();
        SignalAction::Cancel
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    ShutdownRequested = 130, // Standard exit code for SIGINT
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
