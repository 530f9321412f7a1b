//! OS signal handling.
//!
//! # Responsibilities
//! - SIGINT / SIGTERM trigger graceful shutdown
//! - SIGHUP forces a reload of the visual config from the backend
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP never shuts down; it is the manual resync for a lost feed

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;
use crate::sync::VisualConfigContext;

/// Spawn the signal loop. It exits after triggering shutdown.
pub fn spawn_signal_handler(shutdown: Arc<Shutdown>, ctx: Arc<VisualConfigContext>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut term, mut hup) = match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
                (Ok(term), Ok(hup)) => (term, hup),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error = %e, "Failed to install signal handlers, falling back to ctrl-c");
                    wait_ctrl_c().await;
                    shutdown.trigger();
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("SIGINT received");
                        break;
                    }
                    _ = term.recv() => {
                        tracing::info!("SIGTERM received");
                        break;
                    }
                    _ = hup.recv() => {
                        tracing::info!("SIGHUP received, reloading visual config");
                        ctx.load().await;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = &ctx;
            wait_ctrl_c().await;
        }

        shutdown.trigger();
    })
}

async fn wait_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
