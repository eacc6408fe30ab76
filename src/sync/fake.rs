//! In-memory fakes for both services, used by the engine tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;
use serde_json::{Value, json};

use crate::config::{ConfigStore, SyncConfig};
use crate::error::{Error, Result};
use crate::memos::{MemoQuery, MemosApi, MemosUser};
use crate::model::{MemoId, MemoRecord, NormalizedMemo, RelationRef, ResourceRef};
use crate::siyuan::{ChildBlock, Notebook, SiyuanApi};

use super::block_map::{MEMO_ID_ATTR, memo_attrs};
use super::normalize::{DATETIME_FORMAT, format_ts};
use super::notify::Notifier;
use super::transform::LinkResolver;

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn memo(id: MemoId, created_ts: i64, updated_ts: i64, display_ts: i64) -> MemoRecord {
    MemoRecord {
        id,
        content: String::new(),
        created_ts,
        updated_ts,
        display_ts_raw: Some(display_ts),
        resource_list: Vec::new(),
        relation_list: Vec::new(),
        row_status: crate::model::RowStatus::Normal,
    }
}

pub fn resource(id: i64, filename: &str, mime: &str) -> ResourceRef {
    ResourceRef {
        id,
        name: Some(format!("res-{id}")),
        uid: None,
        filename: filename.to_string(),
        mime_type: mime.to_string(),
        external_link: String::new(),
        created_ts: 1_700_000_000,
    }
}

pub fn relation(memo_id: MemoId, related_memo_id: MemoId) -> RelationRef {
    RelationRef {
        memo_id,
        related_memo_id,
        relation_type: Some("REFERENCE".into()),
    }
}

/// A normalized memo without resources, titled from `display_ts` in UTC.
pub fn normalized(id: MemoId, display_ts: i64, date: &str, text: &str) -> NormalizedMemo {
    let utc = chrono::FixedOffset::east_opt(0).unwrap();
    let display_datetime = format_ts(display_ts, utc, DATETIME_FORMAT);
    NormalizedMemo {
        memo_id: id,
        title: format!("{display_datetime}・#{id}"),
        content: text.to_string(),
        content_text: text.to_string(),
        resource_links: String::new(),
        image_links: String::new(),
        resources: Vec::new(),
        display_date: date.to_string(),
        display_datetime,
        display_ts,
    }
}

// ---------------------------------------------------------------------------
// Memos
// ---------------------------------------------------------------------------

/// Memos server holding a fixed list of records.
pub struct FakeMemos {
    records: Vec<MemoRecord>,
    offsets: Mutex<Vec<usize>>,
    fail_offset: Mutex<Option<usize>>,
    fail_downloads: Mutex<bool>,
    downloads: Mutex<Vec<String>>,
}

impl FakeMemos {
    pub fn new(records: Vec<MemoRecord>) -> Self {
        Self {
            records,
            offsets: Mutex::new(Vec::new()),
            fail_offset: Mutex::new(None),
            fail_downloads: Mutex::new(false),
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Offsets requested so far.
    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.lock().unwrap().clone()
    }

    /// Download keys requested so far.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn fail_at_offset(&self, offset: usize) {
        *self.fail_offset.lock().unwrap() = Some(offset);
    }

    pub fn fail_downloads(&self) {
        *self.fail_downloads.lock().unwrap() = true;
    }

    fn server_error() -> Error {
        Error::Transport {
            service: "Memos",
            status: 500,
            body: "internal error".into(),
        }
    }
}

impl MemosApi for FakeMemos {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn current_user(&self) -> Result<MemosUser> {
        Ok(MemosUser {
            id: 1,
            username: "tester".into(),
            nickname: "Tester".into(),
        })
    }

    async fn list_memos(&self, query: MemoQuery) -> Result<Vec<MemoRecord>> {
        self.offsets.lock().unwrap().push(query.offset);
        if *self.fail_offset.lock().unwrap() == Some(query.offset) {
            return Err(Self::server_error());
        }
        Ok(self
            .records
            .iter()
            .skip(query.offset)
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn download_resource(&self, key: &str) -> Result<Vec<u8>> {
        if *self.fail_downloads.lock().unwrap() {
            return Err(Self::server_error());
        }
        self.downloads.lock().unwrap().push(key.to_string());
        Ok(key.as_bytes().to_vec())
    }
}

// ---------------------------------------------------------------------------
// SiYuan
// ---------------------------------------------------------------------------

static TO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{[^}]*toDate "2006-01-02" "([^"]+)"[^}]*\}\}"#).unwrap()
});
static BOX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"box='((?:[^']|'')*)'").unwrap());
static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"content='((?:[^']|'')*)'").unwrap());

fn unquote(raw: &str) -> String {
    raw.replace("''", "'")
}

#[derive(Debug, Clone)]
struct FakeBlock {
    block_type: String,
    markdown: String,
    parent: Option<String>,
}

#[derive(Debug, Clone)]
struct FakeDoc {
    id: String,
    notebook: String,
    hpath: String,
    title: String,
}

#[derive(Default)]
struct StoreState {
    notebooks: Vec<Notebook>,
    daily_template: String,
    docs: Vec<FakeDoc>,
    blocks: HashMap<String, FakeBlock>,
    children: HashMap<String, Vec<String>>,
    attrs: BTreeMap<String, BTreeMap<String, String>>,
    files: Vec<String>,
    created_docs: Vec<String>,
    fail_on: Option<String>,
    fail_attrs: bool,
    next_id: u64,
}

impl StoreState {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("20240101120000-{:07}", self.next_id)
    }

    fn add_block(&mut self, parent: Option<&str>, block_type: &str, markdown: &str) -> String {
        let id = self.new_id();
        self.blocks.insert(
            id.clone(),
            FakeBlock {
                block_type: block_type.to_string(),
                markdown: markdown.to_string(),
                parent: parent.map(str::to_string),
            },
        );
        if let Some(parent) = parent {
            self.children.entry(parent.to_string()).or_default().push(id.clone());
        }
        id
    }

    fn add_doc(&mut self, notebook: &str, hpath: &str, markdown: &str) -> String {
        let title = hpath.rsplit('/').next().unwrap_or_default().to_string();
        let id = self.add_block(None, "d", &title);
        self.add_block(Some(&id), "p", markdown);
        self.docs.push(FakeDoc {
            id: id.clone(),
            notebook: notebook.to_string(),
            hpath: hpath.to_string(),
            title,
        });
        id
    }

    /// `* title` becomes list → item → paragraph, like the kernel does.
    fn add_markdown(&mut self, parent: Option<&str>, markdown: &str) -> String {
        if let Some(title) = markdown.strip_prefix("* ") {
            let list = self.add_block(parent, "l", markdown);
            let item = self.add_block(Some(&list), "i", "");
            self.add_block(Some(&item), "p", title);
            list
        } else {
            self.add_block(parent, "p", markdown)
        }
    }

    fn check_failure(&self, markdown: &str) -> Result<()> {
        match &self.fail_on {
            Some(needle) if markdown.contains(needle.as_str()) => Err(Error::Api {
                endpoint: "/api/block/appendBlock".into(),
                code: -1,
                msg: format!("refused {needle}"),
            }),
            _ => Ok(()),
        }
    }

    fn remove_tree(&mut self, id: &str) {
        for child in self.children.remove(id).unwrap_or_default() {
            self.remove_tree(&child);
        }
        self.blocks.remove(id);
        self.attrs.remove(id);
    }

    fn not_found(id: &str) -> Error {
        Error::Api {
            endpoint: "/api/block".into(),
            code: -1,
            msg: format!("block {id} not found"),
        }
    }
}

/// SiYuan kernel with an in-memory block tree.
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn with_notebook(id: &str) -> Self {
        let state = StoreState {
            notebooks: vec![Notebook {
                id: id.to_string(),
                name: format!("Notebook {id}"),
                closed: false,
            }],
            daily_template: r#"/daily note/{{now | date "2006-01-02"}}"#.to_string(),
            ..StoreState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap()
    }

    /// Pre-existing document; not counted in [`FakeStore::created_docs`].
    pub fn add_document(&self, notebook: &str, hpath: &str, title: &str) -> String {
        let mut state = self.state();
        let id = state.add_doc(notebook, hpath, "");
        if let Some(doc) = state.docs.iter_mut().find(|d| d.id == id) {
            doc.title = title.to_string();
        }
        id
    }

    /// Previously synced memo block inside `parent`.
    pub fn add_tagged_block(&self, parent: &str, memo_id: MemoId) -> String {
        let mut state = self.state();
        let id = state.add_markdown(Some(parent), &format!("* old #{memo_id}"));
        state.attrs.insert(id.clone(), memo_attrs(memo_id));
        id
    }

    /// Make block writes whose markdown contains `needle` fail.
    pub fn fail_on(&self, needle: &str) {
        self.state().fail_on = Some(needle.to_string());
    }

    /// Clear injected failures.
    pub fn recover(&self) {
        let mut state = self.state();
        state.fail_on = None;
        state.fail_attrs = false;
    }

    /// Make every attribute write fail.
    pub fn fail_attrs(&self) {
        self.state().fail_attrs = true;
    }

    /// Paths of documents created through the API.
    pub fn created_docs(&self) -> Vec<String> {
        self.state().created_docs.clone()
    }

    pub fn doc_id(&self, notebook: &str, hpath: &str) -> Option<String> {
        self.state()
            .docs
            .iter()
            .find(|d| d.notebook == notebook && d.hpath == hpath)
            .map(|d| d.id.clone())
    }

    pub fn child_markdown(&self, id: &str) -> Vec<String> {
        let state = self.state();
        state
            .children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|c| state.blocks.get(c))
                    .map(|b| b.markdown.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn first_child(&self, id: &str) -> Option<String> {
        self.state()
            .children
            .get(id)
            .and_then(|ids| ids.first().cloned())
    }

    pub fn contains_block(&self, id: &str) -> bool {
        self.state().blocks.contains_key(id)
    }

    pub fn files(&self) -> Vec<String> {
        self.state().files.clone()
    }
}

impl SiyuanApi for FakeStore {
    async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        Ok(self.state().notebooks.clone())
    }

    async fn daily_note_template(&self, notebook: &str) -> Result<String> {
        let state = self.state();
        if state.notebooks.iter().any(|n| n.id == notebook) {
            Ok(state.daily_template.clone())
        } else {
            Err(StoreState::not_found(notebook))
        }
    }

    async fn render_sprig(&self, template: &str) -> Result<String> {
        Ok(TO_DATE_RE.replace_all(template, "$1").into_owned())
    }

    async fn ids_by_hpath(&self, notebook: &str, hpath: &str) -> Result<Vec<String>> {
        Ok(self
            .state()
            .docs
            .iter()
            .filter(|d| d.notebook == notebook && d.hpath == hpath)
            .map(|d| d.id.clone())
            .collect())
    }

    async fn create_doc_with_md(&self, notebook: &str, hpath: &str, markdown: &str) -> Result<String> {
        let mut state = self.state();
        state.check_failure(markdown)?;
        state.created_docs.push(hpath.to_string());
        Ok(state.add_doc(notebook, hpath, markdown))
    }

    async fn append_block(&self, parent_id: &str, markdown: &str) -> Result<String> {
        let mut state = self.state();
        state.check_failure(markdown)?;
        if !state.blocks.contains_key(parent_id) {
            return Err(StoreState::not_found(parent_id));
        }
        Ok(state.add_markdown(Some(parent_id), markdown))
    }

    async fn insert_block_after(&self, previous_id: &str, markdown: &str) -> Result<String> {
        let mut state = self.state();
        state.check_failure(markdown)?;
        let parent = state
            .blocks
            .get(previous_id)
            .and_then(|b| b.parent.clone())
            .ok_or_else(|| StoreState::not_found(previous_id))?;

        let id = state.add_markdown(None, markdown);
        if let Some(block) = state.blocks.get_mut(&id) {
            block.parent = Some(parent.clone());
        }
        let siblings = state.children.entry(parent).or_default();
        let at = siblings
            .iter()
            .position(|s| s == previous_id)
            .map_or(siblings.len(), |i| i + 1);
        siblings.insert(at, id.clone());
        Ok(id)
    }

    async fn child_blocks(&self, id: &str) -> Result<Vec<ChildBlock>> {
        let state = self.state();
        Ok(state
            .children
            .get(id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|c| {
                        state.blocks.get(c).map(|b| ChildBlock {
                            id: c.clone(),
                            block_type: b.block_type.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_block(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        let parent = state
            .blocks
            .get(id)
            .ok_or_else(|| StoreState::not_found(id))?
            .parent
            .clone();
        if let Some(parent) = parent {
            if let Some(siblings) = state.children.get_mut(&parent) {
                siblings.retain(|s| s != id);
            }
        }
        state.remove_tree(id);
        Ok(())
    }

    async fn set_block_attrs(&self, id: &str, attrs: &BTreeMap<String, String>) -> Result<()> {
        let mut state = self.state();
        if !state.blocks.contains_key(id) {
            return Err(StoreState::not_found(id));
        }
        if state.fail_attrs {
            return Err(Error::Api {
                endpoint: "/api/attr/setBlockAttrs".into(),
                code: -1,
                msg: "attribute write refused".into(),
            });
        }
        state
            .attrs
            .entry(id.to_string())
            .or_default()
            .extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn query_sql(&self, stmt: &str) -> Result<Vec<Value>> {
        let state = self.state();

        if stmt.contains("FROM attributes") {
            return Ok(state
                .attrs
                .iter()
                .filter_map(|(block, attrs)| {
                    let value = attrs.get(MEMO_ID_ATTR)?;
                    Some(json!({"block_id": block, "name": MEMO_ID_ATTR, "value": value}))
                })
                .collect());
        }

        if stmt.contains("FROM blocks") {
            let notebook = BOX_RE.captures(stmt).map(|c| unquote(&c[1]));
            let title = CONTENT_RE.captures(stmt).map(|c| unquote(&c[1]));
            return Ok(state
                .docs
                .iter()
                .filter(|d| notebook.as_ref().is_none_or(|n| *n == d.notebook))
                .filter(|d| title.as_ref().is_none_or(|t| *t == d.title))
                .take(1)
                .map(|d| json!({"id": d.id}))
                .collect());
        }

        Ok(Vec::new())
    }

    async fn put_file(&self, path: &str, _content: Vec<u8>) -> Result<()> {
        self.state().files.push(path.to_string());
        Ok(())
    }

    async fn push_msg(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    async fn push_err_msg(&self, _msg: &str) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Small fakes
// ---------------------------------------------------------------------------

/// Resolver backed by a fixed name → id table.
pub struct MapResolver {
    ids: HashMap<String, String>,
    calls: AtomicUsize,
}

impl MapResolver {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            ids: entries
                .iter()
                .map(|(name, id)| ((*name).to_string(), (*id).to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LinkResolver for MapResolver {
    async fn resolve_document(&self, name: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ids
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Other(format!("no document named {name}")))
    }
}

/// Config store that keeps the last saved value.
#[derive(Default)]
pub struct MemoryConfigStore {
    saved: Mutex<Option<SyncConfig>>,
}

impl MemoryConfigStore {
    pub fn saved(&self) -> Option<SyncConfig> {
        self.saved.lock().unwrap().clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<SyncConfig> {
        Ok(self.saved().unwrap_or_default())
    }

    fn save(&self, config: &SyncConfig) -> Result<()> {
        *self.saved.lock().unwrap() = Some(config.clone());
        Ok(())
    }
}

/// Notifier that records every message.
#[derive(Default)]
pub struct RecordingNotifier {
    infos: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn info(&self, msg: &str) {
        self.infos.lock().unwrap().push(msg.to_string());
    }

    async fn error(&self, msg: &str) {
        self.errors.lock().unwrap().push(msg.to_string());
    }
}
