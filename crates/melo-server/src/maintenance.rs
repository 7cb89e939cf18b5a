// File: src/maintenance.rs
// Purpose: Periodic log rotation and in-flight request sweeping

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Spawn the rotation and sweep loops. Both run until the runtime shuts down.
pub fn spawn(
    state: &AppState,
    rotation_every: Duration,
    sweep_every: Duration,
) -> Vec<JoinHandle<()>> {
    let rotation = {
        let files = state.log_files.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(rotation_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match files.rotate().await {
                    Ok(rotated) if !rotated.is_empty() => {
                        tracing::info!(count = rotated.len(), "scheduled log rotation")
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "scheduled log rotation failed"),
                }
            }
        })
    };

    let sweep = {
        let request_logger = state.request_logger.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let swept = request_logger.sweep_stale().await;
                if swept > 0 {
                    tracing::warn!(swept, "dropped stale in-flight requests");
                }
            }
        })
    };

    vec![rotation, sweep]
}
