//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM / SIGINT (Ctrl+C) trigger graceful shutdown
//! - SIGHUP triggers a configuration reload (Unix only)

use std::sync::Arc;

use crate::kernel::Kernel;
use crate::lifecycle::shutdown::Shutdown;

/// Trigger `shutdown` on the first termination signal.
pub fn spawn_shutdown_listener(shutdown: Shutdown) {
    tokio::spawn(async move {
        terminate_signal().await;
        tracing::info!("Shutdown signal received");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn terminate_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install SIGTERM handler");
            ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn terminate_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Reload the kernel configuration on every SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_hangup(kernel: Arc<Kernel>, shutdown: &Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };
        loop {
            tokio::select! {
                _ = stop.recv() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("SIGHUP received, reloading configuration");
                    kernel.reload().await;
                }
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_reload_on_hangup(_kernel: Arc<Kernel>, _shutdown: &Shutdown) {}
