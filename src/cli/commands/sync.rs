//! Sync command implementation.
//!
//! Runs one sync against the configured Memos server and SiYuan kernel.
//! Notifications go to SiYuan; a dry run only logs them.

use std::path::Path;

use colored::Colorize;

use super::{load_config, local_now, memos_client, runtime, siyuan_client};
use crate::config::{FileConfigStore, SyncConfig};
use crate::error::{Error, Result};
use crate::sync::{LogNotifier, RunOptions, SyncContext, SyncLock, SyncOutcome};

/// Execute the sync command.
///
/// # Errors
///
/// Returns the error of the failed stage, or `Incomplete` when some memos
/// could not be written. The checkpoint is left unchanged in both cases.
pub fn execute(config_path: Option<&Path>, dry_run: bool, json: bool) -> Result<()> {
    let (store, config) = load_config(config_path)?;
    let rt = runtime()?;
    let lock = SyncLock::with_file(store.lock_path());

    let options = RunOptions {
        dry_run,
        announce_idle: true,
    };
    let outcome = rt.block_on(run_once(&store, config, &lock, options))?;
    print_outcome(&outcome, json)?;
    ensure_complete(&outcome)
}

/// `Incomplete` when the run left memos unwritten.
pub(super) fn ensure_complete(outcome: &SyncOutcome) -> Result<()> {
    match outcome {
        SyncOutcome::Synced(report) if report.unwritten() > 0 => Err(Error::Incomplete {
            failed: report.unwritten(),
        }),
        _ => Ok(()),
    }
}

/// One run with fresh clients built from `config`.
pub(super) async fn run_once(
    store: &FileConfigStore,
    config: SyncConfig,
    lock: &SyncLock,
    options: RunOptions,
) -> Result<SyncOutcome> {
    let memos = memos_client(&config);
    let siyuan = siyuan_client(&config);

    if options.dry_run {
        let mut ctx = SyncContext::new(config, &memos, &siyuan, &LogNotifier, lock, local_now());
        ctx.run(store, options).await
    } else {
        let mut ctx = SyncContext::new(config, &memos, &siyuan, &siyuan, lock, local_now());
        ctx.run(store, options).await
    }
}

pub(super) fn print_outcome(outcome: &SyncOutcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(outcome)?);
        return Ok(());
    }

    match outcome {
        SyncOutcome::NoChanges { checkpoint } => {
            println!("No new memos since {checkpoint}.");
        }
        SyncOutcome::DryRun(preview) => {
            println!(
                "{} {} memo(s) to write, {} stale block set(s) to replace (since {})",
                "Dry run:".cyan().bold(),
                preview.added.len(),
                preview.stale.len(),
                preview.checkpoint
            );
            for memo in &preview.memos {
                println!("  {} {}", "+".green(), memo.title);
            }
        }
        SyncOutcome::Synced(report) => {
            println!("{} {}", "✓".green(), report.summary());
            for failure in &report.failures {
                println!("  {} {failure}", "!".yellow());
            }
            match &report.checkpoint {
                Some(checkpoint) => println!("  Checkpoint: {checkpoint}"),
                None if report.unwritten() > 0 => println!(
                    "  {}",
                    "Checkpoint unchanged, failed memos are retried next run".yellow()
                ),
                None => println!("  {}", "Checkpoint unchanged (debug mode)".dimmed()),
            }
        }
    }
    Ok(())
}
