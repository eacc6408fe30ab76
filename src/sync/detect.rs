//! Change detection against the Memos server.

use tracing::debug;

use crate::error::Result;
use crate::memos::{MemoQuery, MemosApi};
use crate::model::{ChangeSet, MemoRecord, RowStatus};

/// Records requested per page.
pub const PAGE_SIZE: usize = 200;

/// The memo changed after the checkpoint and must be (re)written.
#[must_use]
pub fn is_added(memo: &MemoRecord, checkpoint_ts: i64) -> bool {
    memo.updated_ts > checkpoint_ts
}

/// The memo existed before the checkpoint and changed after it, so its
/// previously written block is stale.
#[must_use]
pub fn is_stale(memo: &MemoRecord, checkpoint_ts: i64) -> bool {
    memo.created_ts < checkpoint_ts && memo.updated_ts > checkpoint_ts
}

/// Split already-fetched memos into a [`ChangeSet`]. Archived records are
/// ignored even when the server returns them.
#[must_use]
pub fn classify(memos: Vec<MemoRecord>, checkpoint_ts: i64) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for memo in memos {
        if memo.row_status != RowStatus::Normal {
            debug!(memo_id = memo.id, status = memo.row_status.as_str(), "Skipping memo");
            continue;
        }
        if is_stale(&memo, checkpoint_ts) {
            changes.delete_list.push(memo.clone());
        }
        if is_added(&memo, checkpoint_ts) {
            changes.add_list.push(memo);
        }
    }
    changes
}

/// Page through every normal memo and classify it against the checkpoint.
///
/// # Errors
///
/// Any failed page aborts detection.
pub async fn detect_changes<M: MemosApi>(memos: &M, checkpoint_ts: i64) -> Result<ChangeSet> {
    let mut all = Vec::new();
    let mut offset = 0;

    loop {
        let page = memos
            .list_memos(MemoQuery {
                limit: PAGE_SIZE,
                offset,
                row_status: RowStatus::Normal,
            })
            .await?;
        let len = page.len();
        debug!(offset, len, "Fetched memo page");
        all.extend(page);

        if len < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok(classify(all, checkpoint_ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::{FakeMemos, memo};

    #[test]
    fn test_record_can_be_added_and_stale() {
        let changes = classify(
            vec![
                memo(1, 50, 150, 50), // edited after cp
                memo(2, 150, 160, 150), // created after cp
                memo(3, 10, 20, 10), // untouched
            ],
            100,
        );
        let added: Vec<_> = changes.add_list.iter().map(|m| m.id).collect();
        let stale: Vec<_> = changes.delete_list.iter().map(|m| m.id).collect();
        assert_eq!(added, vec![1, 2]);
        assert_eq!(stale, vec![1]);
    }

    #[test]
    fn test_archived_records_are_ignored() {
        let mut archived = memo(4, 50, 150, 50);
        archived.row_status = RowStatus::Archived;
        let changes = classify(vec![archived, memo(5, 150, 160, 150)], 100);
        let added: Vec<_> = changes.add_list.iter().map(|m| m.id).collect();
        assert_eq!(added, vec![5]);
        assert!(changes.delete_list.is_empty());
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let m = memo(1, 100, 100, 100);
        assert!(!is_added(&m, 100));
        assert!(!is_stale(&m, 100));
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let records: Vec<_> = (0..250).map(|i| memo(i, 1, 200, 1)).collect();
        let fake = FakeMemos::new(records);

        let changes = detect_changes(&fake, 100).await.unwrap();
        assert_eq!(changes.add_list.len(), 250);
        assert_eq!(fake.offsets(), vec![0, 200]);
    }

    #[tokio::test]
    async fn test_empty_source_fetches_one_page() {
        let fake = FakeMemos::new(Vec::new());
        let changes = detect_changes(&fake, 0).await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(fake.offsets(), vec![0]);
    }

    #[tokio::test]
    async fn test_failed_page_aborts() {
        let fake = FakeMemos::new((0..300).map(|i| memo(i, 1, 200, 1)).collect());
        fake.fail_at_offset(200);
        assert!(detect_changes(&fake, 100).await.is_err());
    }
}
