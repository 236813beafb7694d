//! Process host for the Agent Coordination Runtime.
//!
//! Owns configuration and telemetry setup and drives the composed
//! [`acr_runtime::AcrRuntime`] tick loop. No transport or RPC framing lives
//! here: the runtime exposes snapshots and operation logs and a transport
//! adapter is an external concern.

pub mod config;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::info;

use acr_runtime::AcrRuntime;
use config::Config;

/// Runs the tick-driven maintenance loop until `shutdown` resolves.
pub async fn serve(runtime: Arc<AcrRuntime>, tick: Duration, shutdown: oneshot::Receiver<()>) {
    let mut interval = tokio::time::interval(tick);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                runtime.tick(Utc::now()).await;
            }
            _ = &mut shutdown => {
                info!("tick loop received shutdown signal");
                break;
            }
        }
    }
}

/// Spawns the background task that resolves a shutdown channel on
/// `SIGTERM`/`SIGINT` (or `Ctrl+C` on Windows).
pub fn spawn_shutdown_signal() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            let mut sigint =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
                    .expect("failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(windows)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl_c");
            info!("received Ctrl+C, initiating graceful shutdown");
        }

        let _ = tx.send(());
    });

    rx
}

pub fn build_runtime() -> Arc<AcrRuntime> {
    Arc::new(AcrRuntime::with_defaults())
}

pub fn tick_duration(config: &Config) -> Duration {
    Duration::from_millis(config.runtime.tick_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serve_stops_promptly_once_shutdown_fires() {
        let runtime = build_runtime();
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(serve(runtime, Duration::from_millis(10), rx));
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("serve task did not stop after shutdown signal")
            .unwrap();
    }
}
