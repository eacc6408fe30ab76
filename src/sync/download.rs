//! Resource downloads from Memos into the SiYuan asset folder.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::DownloadMode;
use crate::error::Result;
use crate::memos::MemosApi;
use crate::model::ResourceRef;
use crate::siyuan::SiyuanApi;

use super::resource::{ResourceOptions, download_key, resolve_resource};

/// Workspace path a local asset is written to.
#[must_use]
pub fn workspace_path(download_target: &str) -> String {
    format!("/data/{download_target}")
}

/// Copy every server-hosted resource into SiYuan, one at a time.
///
/// External links are skipped, as are repeated targets. Returns the number
/// of files written.
///
/// # Errors
///
/// Any failed download or upload aborts the run.
pub async fn download_resources<M: MemosApi, S: SiyuanApi>(
    memos: &M,
    store: &S,
    resources: &[ResourceRef],
    options: &ResourceOptions,
    mode: DownloadMode,
) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut written = 0;

    for resource in resources {
        let resolved = resolve_resource(resource, options);
        if !resolved.needs_download() || !seen.insert(resolved.download_target.clone()) {
            continue;
        }

        let key = download_key(resource, mode);
        let bytes = memos.download_resource(&key).await?;
        debug!(resource = resource.id, key = %key, size = bytes.len(), "Downloaded resource");

        store
            .put_file(&workspace_path(&resolved.download_target), bytes)
            .await?;
        written += 1;
    }

    if written > 0 {
        info!(count = written, "Resources copied into SiYuan");
    }
    Ok(written)
}
