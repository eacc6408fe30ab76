//! Memo records as returned by the Memos v1 API.
//!
//! These are read-only from the sync engine's point of view. Timestamps are
//! unix seconds.

use serde::{Deserialize, Serialize};

/// Memo identifier on the Memos server.
pub type MemoId = i64;

/// Row status filter / value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    #[default]
    Normal,
    Archived,
}

impl RowStatus {
    /// Query-string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Archived => "ARCHIVED",
        }
    }
}

/// A single memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoRecord {
    pub id: MemoId,
    #[serde(default)]
    pub content: String,
    pub created_ts: i64,
    pub updated_ts: i64,
    /// Older servers omit it; [`MemoRecord::display_ts`] falls back to `created_ts`.
    #[serde(default, rename = "displayTs")]
    pub display_ts_raw: Option<i64>,
    #[serde(default)]
    pub resource_list: Vec<ResourceRef>,
    #[serde(default)]
    pub relation_list: Vec<RelationRef>,
    #[serde(default)]
    pub row_status: RowStatus,
}

impl MemoRecord {
    /// Timestamp the memo is shown at, used for ordering and day grouping.
    #[must_use]
    pub fn display_ts(&self) -> i64 {
        self.display_ts_raw.unwrap_or(self.created_ts)
    }
}

/// An attachment on a memo.
///
/// Either `external_link` is set (nothing to download) or the binary is
/// served by the Memos server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub id: i64,
    /// Resource name on servers that address resources by name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub filename: String,
    /// MIME type, `type/subtype`.
    #[serde(rename = "type", default)]
    pub mime_type: String,
    #[serde(default)]
    pub external_link: String,
    pub created_ts: i64,
}

impl ResourceRef {
    /// Whether the resource points at an external URL.
    #[must_use]
    pub fn is_external(&self) -> bool {
        !self.external_link.trim().is_empty()
    }
}

/// A directed reference between two memos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRef {
    /// The memo that holds the reference.
    pub memo_id: MemoId,
    pub related_memo_id: MemoId,
    #[serde(rename = "type", default)]
    pub relation_type: Option<String>,
}
