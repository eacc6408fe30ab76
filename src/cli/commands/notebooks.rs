//! Notebooks command implementation.

use std::path::Path;

use colored::Colorize;

use super::{load_config, runtime, siyuan_client};
use crate::error::Result;
use crate::siyuan::SiyuanApi;

/// List SiYuan notebooks, marking the configured one.
///
/// # Errors
///
/// Returns an error if the SiYuan kernel cannot be reached.
pub fn execute(config_path: Option<&Path>, json: bool) -> Result<()> {
    let (_, config) = load_config(config_path)?;
    let rt = runtime()?;
    let siyuan = siyuan_client(&config);

    let notebooks = rt.block_on(siyuan.list_notebooks())?;

    if json {
        let output = serde_json::json!({
            "selected": config.notebook_id,
            "notebooks": notebooks,
        });
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    if notebooks.is_empty() {
        println!("No notebooks found.");
        return Ok(());
    }

    for notebook in &notebooks {
        let marker = if notebook.id == config.notebook_id.trim() {
            "*".green().bold().to_string()
        } else {
            " ".to_string()
        };
        let name = if notebook.closed {
            format!("{} (closed)", notebook.name).dimmed().to_string()
        } else {
            notebook.name.bold().to_string()
        };
        println!("{marker} {}  {name}", notebook.id.cyan());
    }
    Ok(())
}
