//! Shutdown signal handling.
//!
//! The tokeninfo server and the metrics server both drain in place on
//! `axum::serve`'s `with_graceful_shutdown`; no separate connection-draining
//! coordinator is needed on top of that.

use tokio::signal;
use tracing::info;

/// Resolves on SIGTERM or SIGINT (Ctrl+C).
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt())
            .expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT (Ctrl+C)");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C");
    }
}
