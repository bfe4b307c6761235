//! Prune Task
//!
//! Background task that periodically prunes every registered store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::Registry;

/// Spawns a background task that periodically prunes all stores of `registry`.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between runs. A failing prune is logged and retried on the next run.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(Registry::default());
/// let prune_handle = spawn_prune_task(registry.clone(), 60);
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task(registry: Arc<Registry>, prune_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(prune_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting prune task with interval of {} seconds",
            prune_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match registry.prune_all().await {
                Ok(reports) => {
                    let removed: usize = reports.iter().map(|(_, report)| report.removed()).sum();
                    if removed > 0 {
                        info!(
                            "Prune: removed {} records across {} stores",
                            removed,
                            reports.len()
                        );
                    } else {
                        debug!("Prune: nothing to remove");
                    }
                }
                Err(err) => warn!("Prune failed: {}", err),
            }
        }
    })
}
