//! Scheduled retry pass.

use std::sync::Arc;
use std::time::Duration;

use pratica_api::Invoicing;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

/// Spawns the periodic retry loop. A zero interval disables it.
pub fn spawn_retry_loop(
    invoicing: Arc<Invoicing>,
    every: Duration,
    max_retries: i32,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        info!("Scheduled retry disabled");
        return None;
    }

    info!(interval_secs = every.as_secs(), max_retries, "Scheduled retry enabled");
    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; wait a full interval after startup.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match invoicing.retry_failed(max_retries).await {
                Ok(report) => info!(
                    succeeded = report.success.len(),
                    failed = report.failed.len(),
                    "Scheduled retry pass finished"
                ),
                Err(e) => error!(error = %e, "Scheduled retry pass failed"),
            }
        }
    }))
}
