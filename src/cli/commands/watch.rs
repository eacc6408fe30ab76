//! Watch command implementation.
//!
//! Repeats the sync at a fixed interval. The configuration is reloaded
//! before every run so the advanced checkpoint and any edits made with
//! `config set` are picked up.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use super::runtime;
use super::sync::{ensure_complete, print_outcome, run_once};
use crate::config::{ConfigStore, FileConfigStore};
use crate::error::Result;
use crate::sync::{RunOptions, SyncLock};

/// Execute the watch command.
///
/// # Errors
///
/// Returns the first non-retryable error. Transport failures, a concurrent
/// run and unwritten memos are logged and retried on the next tick.
pub fn execute(config_path: Option<&Path>, interval: u64, json: bool) -> Result<()> {
    let store = FileConfigStore::resolve(config_path)?;
    let rt = runtime()?;
    let lock = SyncLock::with_file(store.lock_path());
    let period = Duration::from_secs(interval);

    info!(interval, path = %store.path().display(), "Watching for new memos");

    rt.block_on(watch_loop(&store, &lock, period, json))
}

async fn watch_loop(
    store: &FileConfigStore,
    lock: &SyncLock,
    period: Duration,
    json: bool,
) -> Result<()> {
    loop {
        let config = store.load()?;
        let result = run_once(store, config, lock, RunOptions::default())
            .await
            .and_then(|outcome| {
                print_outcome(&outcome, json)?;
                ensure_complete(&outcome)
            });
        match result {
            Ok(()) => {}
            Err(e) if e.error_code().is_retryable() => {
                warn!(error = %e, "Sync failed, retrying next interval");
            }
            Err(e) => return Err(e),
        }
        tokio::time::sleep(period).await;
    }
}
