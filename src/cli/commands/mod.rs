//! Command implementations.

pub mod check;
pub mod completions;
pub mod config;
pub mod notebooks;
pub mod status;
pub mod sync;
pub mod version;
pub mod watch;

use std::path::Path;

use chrono::{DateTime, FixedOffset, Local};

use crate::config::{ConfigStore, FileConfigStore, SyncConfig};
use crate::error::{Error, Result};
use crate::memos::MemosClient;
use crate::siyuan::SiyuanClient;

/// Name of the installed binary.
const BIN: &str = "memos-sync";

/// Create the tokio runtime used by network commands.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Resolve the config file and load it.
fn load_config(path: Option<&Path>) -> Result<(FileConfigStore, SyncConfig)> {
    let store = FileConfigStore::resolve(path)?;
    let config = store.load()?;
    Ok((store, config))
}

fn memos_client(config: &SyncConfig) -> MemosClient {
    MemosClient::new(&config.base_url, &config.access_token)
}

fn siyuan_client(config: &SyncConfig) -> SiyuanClient {
    SiyuanClient::new(&config.siyuan_base_url, &config.siyuan_token)
}

/// Local wall clock with its current offset.
fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
