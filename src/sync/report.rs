//! Run reports.
//!
//! Per-item failures never abort a run; they are collected here and shown
//! to the user once the run completes. A memo that could not be written or
//! tagged keeps the checkpoint where it is, so the next run retries it.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::MemoId;

use super::block_map::BlockIdMap;

/// The step an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Removing a stale block.
    Delete,
    /// Creating the memo's block or document.
    Write,
    /// Linking a relation marker.
    Relation,
    /// Tagging a written block with its memo id.
    Attribute,
}

impl FailureStage {
    /// Whether a failure in this stage leaves a memo missing from SiYuan.
    #[must_use]
    pub const fn loses_memo(self) -> bool {
        matches!(self, Self::Write | Self::Attribute)
    }
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delete => write!(f, "delete"),
            Self::Write => write!(f, "write"),
            Self::Relation => write!(f, "relation"),
            Self::Attribute => write!(f, "attribute"),
        }
    }
}

/// One skipped item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub memo_id: MemoId,
    pub stage: FailureStage,
    pub message: String,
}

impl ItemFailure {
    pub fn new(memo_id: MemoId, stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            memo_id,
            stage,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memo #{} ({}): {}", self.memo_id, self.stage, self.message)
    }
}

/// What the writer did.
#[derive(Debug, Clone, Default)]
pub struct WriteReport {
    /// Blocks (or documents) written in this run.
    pub written: BlockIdMap,
    /// Stale block ids removed.
    pub deleted: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

/// Summary of a completed sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub stale: usize,
    pub written: usize,
    pub deleted: usize,
    pub downloaded: usize,
    pub failures: Vec<ItemFailure>,
    /// The persisted checkpoint, if it was advanced.
    pub checkpoint: Option<String>,
}

impl SyncReport {
    /// Distinct memos that were not written or not tagged.
    #[must_use]
    pub fn unwritten(&self) -> usize {
        let ids: BTreeSet<MemoId> = self
            .failures
            .iter()
            .filter(|f| f.stage.loses_memo())
            .map(|f| f.memo_id)
            .collect();
        ids.len()
    }

    /// One-line summary suitable for a notification.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut text = format!(
            "Synced {} memo(s), removed {} stale block(s), downloaded {} resource(s)",
            self.written, self.deleted, self.downloaded
        );
        if !self.failures.is_empty() {
            text.push_str(&format!(", {} item(s) skipped", self.failures.len()));
        }
        text
    }
}
