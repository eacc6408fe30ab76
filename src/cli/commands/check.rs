//! Check command implementation.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use super::{load_config, local_now, memos_client, runtime, siyuan_client};
use crate::error::{Error, Result};
use crate::siyuan::SiyuanApi;
use crate::sync::{LogNotifier, SyncContext, SyncLock};

#[derive(Serialize)]
struct CheckOutput {
    ok: bool,
    sync_mode: String,
    memos_user: String,
    notebook_id: String,
    notebook_name: String,
}

/// Validate required settings, the Memos token, and the target notebook.
///
/// # Errors
///
/// Returns the first failed check.
pub fn execute(config_path: Option<&Path>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let rt = runtime()?;

    let memos = memos_client(&config);
    let siyuan = siyuan_client(&config);
    let lock = SyncLock::new();
    let notebook_id = config.notebook_id.trim().to_string();
    let ctx = SyncContext::new(config, &memos, &siyuan, &LogNotifier, &lock, local_now());

    let (mode, user, notebook) = rt.block_on(async {
        let (mode, user) = ctx.check_prerequisites().await?;
        let notebook = siyuan
            .list_notebooks()
            .await?
            .into_iter()
            .find(|nb| nb.id == notebook_id && !nb.closed)
            .ok_or_else(|| Error::NotebookNotFound {
                id: notebook_id.clone(),
            })?;
        Ok::<_, Error>((mode, user, notebook))
    })?;

    let display_user = if user.nickname.is_empty() {
        user.username.clone()
    } else {
        format!("{} (@{})", user.nickname, user.username)
    };

    if json {
        let output = CheckOutput {
            ok: true,
            sync_mode: mode.to_string(),
            memos_user: user.username,
            notebook_id: notebook.id,
            notebook_name: notebook.name,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} Memos token accepted for {display_user}", "✓".green());
        println!("{} SiYuan notebook: {}", "✓".green(), notebook.name.bold());
        println!("  Sync mode: {mode}");
    }
    Ok(())
}
