//! Reconciliation of normalized memos into SiYuan.
//!
//! Three layouts:
//! - daily note: one list block per memo in the daily note of its date
//! - page: one document per memo under `pagePath`
//! - single document: list blocks threaded after the first block of the
//!   document at `pagePath`
//!
//! Before anything is written (block layouts only), the blocks of stale
//! memos are removed, together with blocks an interrupted run already wrote
//! for memos of this batch. Every written block is tagged with
//! `custom-memo-id` last, after relations have been linked.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{MarkMode, SyncConfig, SyncMode};
use crate::error::{Error, Result};
use crate::model::{MemoId, MemoRecord, NormalizedMemo, RelationRef};
use crate::siyuan::SiyuanApi;

use super::block_map::{BlockIdMap, memo_attrs, tagged_blocks};
use super::normalize::NormalizedBatch;
use super::report::{FailureStage, ItemFailure, WriteReport};

/// SiYuan's own default when a notebook has no daily note path configured.
pub const DEFAULT_DAILY_NOTE_PATH: &str =
    r#"/daily note/{{now | date "2006/01"}}/{{now | date "2006-01-02"}}"#;

/// The sprig `now` identifier.
static NOW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnow\b").expect("now pattern is valid"));

/// Marker linking a memo to the block of a related memo.
#[must_use]
pub fn relation_marker(mode: MarkMode, block_id: &str, related_memo_id: MemoId) -> String {
    match mode {
        MarkMode::Embed => format!("{{{{select * from blocks where id=\"{block_id}\"}}}}"),
        MarkMode::Reference => format!("(({block_id} \"@{related_memo_id}\"))"),
    }
}

/// Daily note path template with `now` pinned to `date` (`YYYY-MM-DD`).
#[must_use]
pub fn daily_note_template_for(template: &str, date: &str) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_DAILY_NOTE_PATH
    } else {
        template
    };
    let pinned = format!("(toDate \"2006-01-02\" \"{date}\")");
    NOW_RE
        .replace_all(template, regex::NoExpand(&pinned))
        .into_owned()
}

/// Where a memo block goes.
#[derive(Debug, Clone, Copy)]
enum Position<'p> {
    /// Last child of a parent.
    Append(&'p str),
    /// Directly after a sibling.
    After(&'p str),
}

/// A memo written in this run.
#[derive(Debug, Clone)]
struct Placement {
    /// Block (or document) tagged with the memo id.
    block_id: String,
    /// Block that body and relation markers are appended into.
    content_parent: String,
}

/// Writes one batch into SiYuan.
pub struct Writer<'a, S: SiyuanApi> {
    store: &'a S,
    notebook: &'a str,
    page_path: &'a str,
    mode: SyncMode,
    mark_mode: MarkMode,
    /// Log every write step at `info` instead of `debug`.
    verbose: bool,
}

impl<'a, S: SiyuanApi> Writer<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, config: &'a SyncConfig, mode: SyncMode) -> Self {
        Self {
            store,
            notebook: config.notebook_id.trim(),
            page_path: config.page_path.trim(),
            mode,
            mark_mode: config.mark_mode,
            verbose: config.debug,
        }
    }

    fn step(&self, memo_id: MemoId, block_id: &str, what: &str) {
        if self.verbose {
            info!(memo_id, block_id, what, "Write step");
        } else {
            debug!(memo_id, block_id, what, "Write step");
        }
    }

    /// Reconcile `batch` against SiYuan, removing the blocks of `stale`
    /// memos first.
    ///
    /// # Errors
    ///
    /// Fails when the notebook is missing or a layout-wide lookup (daily
    /// note template, single document) fails. Per-memo problems end up in
    /// [`WriteReport::failures`].
    pub async fn write(&self, stale: &[MemoRecord], batch: &NormalizedBatch) -> Result<WriteReport> {
        self.ensure_notebook().await?;

        let mut report = WriteReport::default();
        if self.mode != SyncMode::Page {
            self.delete_stale(stale, &batch.memos, &mut report).await;
        }

        let mut memos: Vec<&NormalizedMemo> = batch.memos.iter().collect();
        memos.sort_by_key(|m| (m.display_ts, m.memo_id));

        let placements = match self.mode {
            SyncMode::DailyNote => self.write_daily_notes(&memos, &mut report).await?,
            SyncMode::Page => self.write_pages(&memos, &mut report).await,
            SyncMode::SingleDocument => self.write_single_document(&memos, &mut report).await?,
        };

        self.link_relations(&batch.relations, &placements, &mut report)
            .await;
        self.tag_blocks(&placements, &mut report).await;

        Ok(report)
    }

    async fn ensure_notebook(&self) -> Result<()> {
        let notebooks = self.store.list_notebooks().await?;
        let open = notebooks
            .iter()
            .any(|nb| nb.id == self.notebook && !nb.closed);
        if open {
            Ok(())
        } else {
            Err(Error::NotebookNotFound {
                id: self.notebook.to_string(),
            })
        }
    }

    /// Remove every tagged block of a stale memo or of a memo about to be
    /// written.
    async fn delete_stale(
        &self,
        stale: &[MemoRecord],
        memos: &[NormalizedMemo],
        report: &mut WriteReport,
    ) {
        let ids: BTreeSet<MemoId> = stale
            .iter()
            .map(|m| m.id)
            .chain(memos.iter().map(|m| m.memo_id))
            .collect();

        let mut tagged = match tagged_blocks(self.store).await {
            Ok(tagged) => tagged,
            Err(e) => {
                for memo in stale {
                    report
                        .failures
                        .push(ItemFailure::new(memo.id, FailureStage::Delete, e.to_string()));
                }
                return;
            }
        };

        for memo_id in ids {
            for block in tagged.remove(&memo_id).unwrap_or_default() {
                match self.store.delete_block(&block).await {
                    Ok(()) => {
                        self.step(memo_id, &block, "deleted stale block");
                        report.deleted.push(block);
                    }
                    Err(e) => report
                        .failures
                        .push(ItemFailure::new(memo_id, FailureStage::Delete, e.to_string())),
                }
            }
        }
    }

    /// Document id at `hpath`, created empty when missing.
    async fn resolve_or_create(&self, hpath: &str) -> Result<String> {
        let ids = self.store.ids_by_hpath(self.notebook, hpath).await?;
        if let Some(id) = ids.into_iter().next() {
            return Ok(id);
        }
        let id = self.store.create_doc_with_md(self.notebook, hpath, "").await?;
        info!(hpath, id = %id, "Created document");
        Ok(id)
    }

    async fn daily_note(&self, template: &str, date: &str) -> Result<String> {
        let hpath = self
            .store
            .render_sprig(&daily_note_template_for(template, date))
            .await?;
        self.resolve_or_create(hpath.trim()).await
    }

    async fn write_daily_notes(
        &self,
        memos: &[&NormalizedMemo],
        report: &mut WriteReport,
    ) -> Result<BTreeMap<MemoId, Placement>> {
        let template = self.store.daily_note_template(self.notebook).await?;

        let mut by_date: BTreeMap<&str, Vec<&NormalizedMemo>> = BTreeMap::new();
        for memo in memos {
            by_date.entry(memo.display_date.as_str()).or_default().push(memo);
        }

        let mut placements = BTreeMap::new();
        for (date, group) in by_date {
            let doc = match self.daily_note(&template, date).await {
                Ok(doc) => doc,
                Err(e) => {
                    for memo in group {
                        report.failures.push(ItemFailure::new(
                            memo.memo_id,
                            FailureStage::Write,
                            format!("daily note for {date}: {e}"),
                        ));
                    }
                    continue;
                }
            };

            for memo in group {
                match self.place_memo(Position::Append(&doc), memo).await {
                    Ok(placement) => {
                        placements.insert(memo.memo_id, placement);
                    }
                    Err(e) => report.failures.push(ItemFailure::new(
                        memo.memo_id,
                        FailureStage::Write,
                        e.to_string(),
                    )),
                }
            }
        }
        Ok(placements)
    }

    async fn write_single_document(
        &self,
        memos: &[&NormalizedMemo],
        report: &mut WriteReport,
    ) -> Result<BTreeMap<MemoId, Placement>> {
        let path = if self.page_path.starts_with('/') {
            self.page_path.to_string()
        } else {
            format!("/{}", self.page_path)
        };
        let doc = self.resolve_or_create(&path).await?;
        let mut anchor = self
            .store
            .child_blocks(&doc)
            .await?
            .into_iter()
            .next()
            .map(|child| child.id);

        let mut placements = BTreeMap::new();
        for memo in memos {
            let position = match anchor.as_deref() {
                Some(previous) => Position::After(previous),
                None => Position::Append(&doc),
            };
            match self.place_memo(position, memo).await {
                Ok(placement) => {
                    anchor = Some(placement.block_id.clone());
                    placements.insert(memo.memo_id, placement);
                }
                Err(e) => report.failures.push(ItemFailure::new(
                    memo.memo_id,
                    FailureStage::Write,
                    e.to_string(),
                )),
            }
        }
        Ok(placements)
    }

    async fn write_pages(
        &self,
        memos: &[&NormalizedMemo],
        report: &mut WriteReport,
    ) -> BTreeMap<MemoId, Placement> {
        let parent = self.page_path.trim_end_matches('/');
        let mut placements = BTreeMap::new();

        for memo in memos {
            let hpath = format!("{parent}/{}", memo.title);
            let doc = match self
                .store
                .create_doc_with_md(self.notebook, &hpath, &memo.content_text)
                .await
            {
                Ok(doc) => doc,
                Err(e) => {
                    report.failures.push(ItemFailure::new(
                        memo.memo_id,
                        FailureStage::Write,
                        e.to_string(),
                    ));
                    continue;
                }
            };
            self.step(memo.memo_id, &doc, "created page");

            // The page exists even if an attachment fails, so it is still tagged.
            if let Err(e) = self.append_resources(&doc, memo).await {
                report.failures.push(ItemFailure::new(
                    memo.memo_id,
                    FailureStage::Write,
                    e.to_string(),
                ));
            }
            placements.insert(
                memo.memo_id,
                Placement {
                    block_id: doc.clone(),
                    content_parent: doc,
                },
            );
        }
        placements
    }

    /// Write `* <title>` at `position` and fill its list item.
    ///
    /// A block whose content cannot be written is removed again so that no
    /// untagged half-written memo stays behind.
    async fn place_memo(&self, position: Position<'_>, memo: &NormalizedMemo) -> Result<Placement> {
        let markdown = format!("* {}", memo.title);
        let block_id = match position {
            Position::Append(parent) => self.store.append_block(parent, &markdown).await?,
            Position::After(previous) => self.store.insert_block_after(previous, &markdown).await?,
        };
        self.step(memo.memo_id, &block_id, "created list block");

        match self.fill_list_block(&block_id, memo).await {
            Ok(content_parent) => Ok(Placement {
                block_id,
                content_parent,
            }),
            Err(e) => {
                if let Err(cleanup) = self.store.delete_block(&block_id).await {
                    warn!(block_id = %block_id, error = %cleanup, "Failed to remove partial memo block");
                }
                Err(e)
            }
        }
    }

    async fn fill_list_block(&self, block_id: &str, memo: &NormalizedMemo) -> Result<String> {
        let item = self
            .store
            .child_blocks(block_id)
            .await?
            .into_iter()
            .next()
            .map(|child| child.id)
            .ok_or_else(|| Error::Other(format!("List block {block_id} has no item")))?;

        if !memo.content_text.is_empty() {
            self.store.append_block(&item, &memo.content_text).await?;
        }
        self.append_resources(&item, memo).await?;
        Ok(item)
    }

    async fn append_resources(&self, parent: &str, memo: &NormalizedMemo) -> Result<()> {
        if !memo.image_links.is_empty() {
            self.store.append_block(parent, &memo.image_links).await?;
        }
        for link in &memo.resources {
            self.store.append_block(parent, link).await?;
        }
        Ok(())
    }

    async fn link_relations(
        &self,
        relations: &[RelationRef],
        placements: &BTreeMap<MemoId, Placement>,
        report: &mut WriteReport,
    ) {
        if relations.is_empty() {
            return;
        }

        let mut blocks = match BlockIdMap::load(self.store).await {
            Ok(map) => map,
            Err(e) => {
                for relation in relations {
                    report.failures.push(ItemFailure::new(
                        relation.memo_id,
                        FailureStage::Relation,
                        e.to_string(),
                    ));
                }
                return;
            }
        };
        for (memo_id, placement) in placements {
            blocks.insert(*memo_id, placement.block_id.clone());
        }

        for relation in relations {
            let Some(owner) = placements.get(&relation.memo_id) else {
                report.failures.push(ItemFailure::new(
                    relation.memo_id,
                    FailureStage::Relation,
                    "memo was not written in this run",
                ));
                continue;
            };
            let Some(target) = blocks.get(relation.related_memo_id) else {
                report.failures.push(ItemFailure::new(
                    relation.memo_id,
                    FailureStage::Relation,
                    format!("no block for related memo #{}", relation.related_memo_id),
                ));
                continue;
            };

            let marker = relation_marker(self.mark_mode, target, relation.related_memo_id);
            match self.store.append_block(&owner.content_parent, &marker).await {
                Ok(id) => self.step(relation.memo_id, &id, "linked relation"),
                Err(e) => report.failures.push(ItemFailure::new(
                    relation.memo_id,
                    FailureStage::Relation,
                    e.to_string(),
                )),
            }
        }
    }

    /// Tag every placed block. In the block layouts an untagged block is
    /// removed again, since no later run could find it.
    async fn tag_blocks(&self, placements: &BTreeMap<MemoId, Placement>, report: &mut WriteReport) {
        for (memo_id, placement) in placements {
            let block_id = &placement.block_id;
            match self.store.set_block_attrs(block_id, &memo_attrs(*memo_id)).await {
                Ok(()) => {
                    report.written.insert(*memo_id, block_id.clone());
                }
                Err(e) => {
                    report.failures.push(ItemFailure::new(
                        *memo_id,
                        FailureStage::Attribute,
                        e.to_string(),
                    ));
                    if self.mode == SyncMode::Page {
                        continue;
                    }
                    if let Err(cleanup) = self.store.delete_block(block_id).await {
                        warn!(block_id = %block_id, error = %cleanup, "Failed to remove untagged memo block");
                    }
                }
            }
        }
    }
}
