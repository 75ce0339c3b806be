//! Periodic policy reload
//!
//! Rereads the policy directory on an interval and publishes a new snapshot
//! when the documents changed. A directory that fails to load or compile is
//! logged and the running snapshot is kept.

use crate::error::ConfigError;
use crate::policy::loader::load_policy_dir;
use crate::policy::snapshot::PolicyStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

/// Reload the policy directory once. Returns whether a new snapshot was
/// published.
pub fn reload_policy(store: &PolicyStore, dir: &Path) -> Result<bool, ConfigError> {
    let documents = load_policy_dir(dir)?;
    if store.snapshot().documents() == &documents {
        debug!(dir = %dir.display(), "Policy unchanged");
        return Ok(false);
    }

    store.replace(documents)?;
    info!(dir = %dir.display(), "Policy reloaded");
    Ok(true)
}

/// Spawn a task reloading `dir` into `store` every `period`
pub fn spawn_policy_reloader(
    store: Arc<PolicyStore>,
    dir: PathBuf,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the store is already loaded
        ticker.tick().await;

        info!(dir = %dir.display(), period_secs = period.as_secs(), "Policy reloader started");
        loop {
            ticker.tick().await;

            // Loading reads the filesystem; keep it off the async workers
            let (task_store, task_dir) = (Arc::clone(&store), dir.clone());
            match tokio::task::spawn_blocking(move || reload_policy(&task_store, &task_dir)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    error!(dir = %dir.display(), error = %e, "Policy reload failed, keeping current policy");
                }
                Err(e) => error!(error = %e, "Policy reload task failed"),
            }
        }
    })
}
