//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM
//! - Turn every one into a shutdown request; the second one ends the drain
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Failure to install a handler is logged; the other signal still works

use crate::lifecycle::Shutdown;

/// Resolve when the process is asked to stop.
pub async fn stop_requested() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Forward stop signals to `shutdown` until the second one.
pub fn spawn_signal_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        loop {
            stop_requested().await;
            if shutdown.trigger() > 1 {
                tracing::warn!("Stop requested again, abandoning drain");
                break;
            }
        }
    });
}
