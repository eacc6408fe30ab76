//! Memo id to SiYuan block id mapping.
//!
//! The mapping is never stored locally. Every block written by a sync run
//! carries a `custom-memo-id` attribute, and the map is rebuilt from the
//! kernel's attribute table whenever it is needed.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::model::MemoId;
use crate::siyuan::SiyuanApi;

/// Block attribute holding the memo id.
pub const MEMO_ID_ATTR: &str = "custom-memo-id";

/// Upper bound on attribute rows fetched in one query.
const ATTRIBUTE_QUERY_LIMIT: usize = 99_999;

/// Statement listing every tagged block.
#[must_use]
pub fn attribute_query() -> String {
    format!("SELECT * FROM attributes WHERE name='{MEMO_ID_ATTR}' LIMIT {ATTRIBUTE_QUERY_LIMIT}")
}

/// The attribute set written onto a memo's block.
#[must_use]
pub fn memo_attrs(memo_id: MemoId) -> BTreeMap<String, String> {
    BTreeMap::from([(MEMO_ID_ATTR.to_string(), memo_id.to_string())])
}

fn row_entry(row: &Value) -> Option<(MemoId, String)> {
    let block_id = row.get("block_id")?.as_str()?;
    let memo_id = row.get("value")?.as_str()?.trim().parse().ok()?;
    Some((memo_id, block_id.to_string()))
}

/// Memo id to block id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIdMap(BTreeMap<MemoId, String>);

impl BlockIdMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `attributes` rows. Rows without a numeric value are skipped;
    /// later rows win.
    #[must_use]
    pub fn from_rows(rows: &[Value]) -> Self {
        Self(rows.iter().filter_map(row_entry).collect())
    }

    /// Rebuild the map from every tagged block in the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the attribute query fails.
    pub async fn load<S: SiyuanApi>(store: &S) -> Result<Self> {
        let rows = store.query_sql(&attribute_query()).await?;
        let map = Self::from_rows(&rows);
        debug!(entries = map.len(), "Loaded block id map");
        Ok(map)
    }

    #[must_use]
    pub fn get(&self, memo_id: MemoId) -> Option<&str> {
        self.0.get(&memo_id).map(String::as_str)
    }

    pub fn insert(&mut self, memo_id: MemoId, block_id: String) {
        self.0.insert(memo_id, block_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn memo_ids(&self) -> Vec<MemoId> {
        self.0.keys().copied().collect()
    }
}

/// Every tagged block, grouped by memo id. A memo can own several blocks
/// when an earlier run was interrupted.
///
/// # Errors
///
/// Returns an error if the attribute query fails.
pub async fn tagged_blocks<S: SiyuanApi>(store: &S) -> Result<BTreeMap<MemoId, Vec<String>>> {
    let rows = store.query_sql(&attribute_query()).await?;
    let mut blocks: BTreeMap<MemoId, Vec<String>> = BTreeMap::new();
    for (memo_id, block_id) in rows.iter().filter_map(row_entry) {
        blocks.entry(memo_id).or_default().push(block_id);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::FakeStore;
    use serde_json::json;

    #[test]
    fn test_from_rows_skips_malformed_values() {
        let rows = vec![
            json!({"block_id": "b1", "name": MEMO_ID_ATTR, "value": "1"}),
            json!({"block_id": "b2", "name": MEMO_ID_ATTR, "value": "not-a-number"}),
            json!({"name": MEMO_ID_ATTR, "value": "3"}),
        ];
        let map = BlockIdMap::from_rows(&rows);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(1), Some("b1"));
    }

    #[test]
    fn test_attribute_query_filters_on_memo_attr() {
        let q = attribute_query();
        assert!(q.starts_with("SELECT * FROM attributes"));
        assert!(q.contains("name='custom-memo-id'"));
    }

    #[tokio::test]
    async fn test_load_and_lookup_from_store() {
        let store = FakeStore::with_notebook("nb");
        let doc = store.add_document("nb", "/daily", "daily");
        let a = store.add_tagged_block(&doc, 7);
        let b = store.add_tagged_block(&doc, 8);

        let map = BlockIdMap::load(&store).await.unwrap();
        assert_eq!(map.memo_ids(), vec![7, 8]);
        assert_eq!(map.get(7), Some(a.as_str()));

        let c = store.add_tagged_block(&doc, 8);
        let grouped = tagged_blocks(&store).await.unwrap();
        assert_eq!(grouped[&7], vec![a]);
        let mut owned = grouped[&8].clone();
        owned.sort();
        let mut expected = vec![b, c];
        expected.sort();
        assert_eq!(owned, expected);
    }
}
