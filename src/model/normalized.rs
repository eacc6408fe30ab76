//! Derived, per-run types. Nothing here is persisted.

use serde::Serialize;

use super::memo::{MemoId, MemoRecord};

/// A resource after link resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedResource {
    /// Markdown (or inline HTML for videos) embedded in SiYuan.
    pub markdown_link: String,
    /// Asset path inside the SiYuan data directory; empty for external links.
    pub download_target: String,
    pub resource_id: i64,
    /// MIME top-level type (`image`, `video`, ...).
    pub type_text: String,
}

impl ResolvedResource {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.type_text == "image"
    }

    #[must_use]
    pub fn needs_download(&self) -> bool {
        !self.download_target.is_empty()
    }
}

/// A memo rendered into target-store content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMemo {
    pub memo_id: MemoId,
    /// `<display datetime>・#<id>`
    pub title: String,
    /// Body text plus every resource link, used as a page body.
    pub content: String,
    /// Transformed body text without resources.
    pub content_text: String,
    /// All resource links, one per line.
    pub resource_links: String,
    /// Image links only, joined per the image layout.
    pub image_links: String,
    /// Non-image resource links, one block each.
    pub resources: Vec<String>,
    /// `YYYY-MM-DD`, the daily-note grouping key.
    pub display_date: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub display_datetime: String,
    pub display_ts: i64,
}

/// Result of change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Memos updated after the checkpoint.
    pub add_list: Vec<MemoRecord>,
    /// Memos created before and updated after the checkpoint; their old
    /// blocks are stale.
    pub delete_list: Vec<MemoRecord>,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.add_list.is_empty()
    }
}
