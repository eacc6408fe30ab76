//! Configuration types.
//!
//! Field names are camelCase in `config.json` so the file stays readable
//! next to the plugin storage it replaces. Every mode is an enum; the file
//! never carries `"0"`/`"1"` strings.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default SiYuan kernel address.
pub const DEFAULT_SIYUAN_URL: &str = "http://127.0.0.1:6806";

/// Checkpoint used when nothing has been synced yet.
pub const DEFAULT_LAST_SYNC_TIME: &str = "2000-01-01 00:00:00";

/// Where synced memos land in SiYuan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// One block per memo, inside the daily note of its display date.
    DailyNote,
    /// One document per memo under `pagePath`.
    Page,
    /// One block per memo, threaded into the single document at `pagePath`.
    SingleDocument,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DailyNote => write!(f, "daily-note"),
            Self::Page => write!(f, "page"),
            Self::SingleDocument => write!(f, "single-document"),
        }
    }
}

/// How a memo relation is rendered in SiYuan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MarkMode {
    /// Block reference `((id "@memo"))`.
    #[default]
    Reference,
    /// Embedded query block.
    Embed,
}

/// Separator between consecutive image links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ImageLayout {
    /// One image per line.
    #[default]
    Vertical,
    /// Images side by side in one paragraph.
    Horizontal,
}

/// Which resource field addresses the download endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadMode {
    #[default]
    Id,
    Name,
    Uid,
}

/// Where tags are rewritten inside a memo body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TagScope {
    /// Every line.
    #[default]
    Full,
    /// Only the final line.
    LastLine,
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "webm", "ogg", "quicktime"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

/// Persisted sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Memos server, without trailing `/`.
    pub base_url: String,
    pub access_token: String,
    /// SiYuan kernel, without trailing `/`.
    pub siyuan_base_url: String,
    /// SiYuan API token (Settings → About). Empty when auth is disabled.
    pub siyuan_token: String,
    /// Checkpoint, `YYYY-MM-DD HH:MM:SS` in local time.
    pub last_sync_time: String,
    pub sync_mode: Option<SyncMode>,
    pub notebook_id: String,
    /// Parent path for page mode, document path for single-document mode.
    pub page_path: String,
    pub mark_mode: MarkMode,
    pub image_layout: ImageLayout,
    /// Forced parent tag; every tag `#x` becomes `#parent/x#`.
    pub parent_tag: Option<String>,
    pub resource_download_mode: DownloadMode,
    pub bidirectional_links: bool,
    /// Parent path for documents created from `((name))` tokens.
    pub subject_path: String,
    pub video_optimization: bool,
    /// MIME subtypes rendered as inline video players.
    pub video_extensions: Vec<String>,
    pub debug: bool,
    pub update_checkpoint_in_debug: bool,
    pub tag_scope: TagScope,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            access_token: String::new(),
            siyuan_base_url: DEFAULT_SIYUAN_URL.to_string(),
            siyuan_token: String::new(),
            last_sync_time: DEFAULT_LAST_SYNC_TIME.to_string(),
            sync_mode: None,
            notebook_id: String::new(),
            page_path: String::new(),
            mark_mode: MarkMode::default(),
            image_layout: ImageLayout::default(),
            parent_tag: None,
            resource_download_mode: DownloadMode::default(),
            bidirectional_links: false,
            subject_path: String::new(),
            video_optimization: false,
            video_extensions: default_video_extensions(),
            debug: false,
            update_checkpoint_in_debug: false,
            tag_scope: TagScope::default(),
        }
    }
}

impl SyncConfig {
    /// Verify that every field a sync run needs is filled in.
    ///
    /// Returns the configured sync mode on success.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingConfig` naming the first empty field.
    pub fn check_required(&self) -> Result<SyncMode> {
        let required = [
            ("base_url", self.base_url.as_str()),
            ("access_token", self.access_token.as_str()),
            ("siyuan_base_url", self.siyuan_base_url.as_str()),
            ("last_sync_time", self.last_sync_time.as_str()),
            ("notebook_id", self.notebook_id.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::MissingConfig { field });
            }
        }

        let mode = self
            .sync_mode
            .ok_or(Error::MissingConfig { field: "sync_mode" })?;

        if mode == SyncMode::SingleDocument && self.page_path.trim().is_empty() {
            return Err(Error::MissingConfig { field: "page_path" });
        }
        if self.bidirectional_links && self.subject_path.trim().is_empty() {
            return Err(Error::MissingConfig {
                field: "subject_path",
            });
        }
        Ok(mode)
    }

    /// Whether the checkpoint should advance after a successful run.
    #[must_use]
    pub fn advances_checkpoint(&self) -> bool {
        !self.debug || self.update_checkpoint_in_debug
    }

    /// Parent tag text, ignoring a blank value.
    #[must_use]
    pub fn parent_tag(&self) -> Option<&str> {
        self.parent_tag
            .as_deref()
            .map(|t| t.trim().trim_matches('#').trim_matches('/'))
            .filter(|t| !t.is_empty())
    }
}
