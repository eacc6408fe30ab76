//! Status command implementation.
//!
//! Reports how many memos the next sync would write without touching
//! SiYuan or the checkpoint.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use super::{load_config, local_now, memos_client, runtime, siyuan_client};
use crate::error::{Error, Result};
use crate::model::MemoId;
use crate::sync::{LogNotifier, SyncContext, SyncLock};

/// Output for status command.
#[derive(Serialize)]
struct StatusOutput {
    checkpoint: String,
    sync_mode: String,
    pending: usize,
    stale: usize,
    pending_ids: Vec<MemoId>,
}

/// Execute status command.
///
/// # Errors
///
/// Returns an error if the configuration is incomplete or Memos cannot be
/// queried.
pub fn execute(config_path: Option<&Path>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let rt = runtime()?;

    let memos = memos_client(&config);
    let siyuan = siyuan_client(&config);
    let lock = SyncLock::new();
    let ctx = SyncContext::new(config, &memos, &siyuan, &LogNotifier, &lock, local_now());

    let (mode, changes) = rt.block_on(async {
        let (mode, _) = ctx.check_prerequisites().await?;
        let changes = ctx.detect().await?;
        Ok::<_, Error>((mode, changes))
    })?;

    let output = StatusOutput {
        checkpoint: ctx.checkpoint().to_string(),
        sync_mode: mode.to_string(),
        pending: changes.add_list.len(),
        stale: changes.delete_list.len(),
        pending_ids: changes.add_list.iter().map(|m| m.id).collect(),
    };

    if json {
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!("Last sync:  {}", output.checkpoint);
    println!("Sync mode:  {}", output.sync_mode);
    if output.pending == 0 {
        println!("{}", "Up to date.".green());
    } else {
        println!(
            "{} {} memo(s) waiting, {} of them replace earlier blocks",
            "●".yellow(),
            output.pending.to_string().bold(),
            output.stale
        );
    }
    Ok(())
}
