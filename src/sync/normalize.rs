//! Memo normalization.
//!
//! Combines resource resolution and body rewriting into one
//! [`NormalizedMemo`] per memo. The batch variant also collects the raw
//! resources (for downloading) and the deduplicated relations (for linking).

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::config::{ImageLayout, SyncConfig};
use crate::error::Result;
use crate::model::{MemoId, MemoRecord, NormalizedMemo, RelationRef, ResourceRef};

use super::resource::{ResourceOptions, resolve_resource};
use super::transform::{ContentTransformer, LinkResolver};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a unix timestamp in the given offset.
#[must_use]
pub fn format_ts(ts: i64, offset: FixedOffset, format: &str) -> String {
    DateTime::from_timestamp(ts, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
        .format(format)
        .to_string()
}

/// Resource links of one memo, split the way the writers consume them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLinks {
    /// Every link, one per line.
    pub all: String,
    /// Image links joined per the image layout.
    pub images: String,
    /// Non-image links.
    pub others: Vec<String>,
}

/// Output of [`Normalizer::normalize_batch`].
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub memos: Vec<NormalizedMemo>,
    /// Every resource of every memo, in memo order.
    pub resources: Vec<ResourceRef>,
    /// At most one relation per owning memo.
    pub relations: Vec<RelationRef>,
}

/// Keep one relation per owning memo, the last one seen.
///
/// The surviving relation takes the position of the owner's first
/// relation.
#[must_use]
pub fn dedup_relations(relations: Vec<RelationRef>) -> Vec<RelationRef> {
    let mut index: HashMap<MemoId, usize> = HashMap::new();
    let mut out: Vec<RelationRef> = Vec::new();
    for relation in relations {
        if let Some(&i) = index.get(&relation.memo_id) {
            out[i] = relation;
        } else {
            index.insert(relation.memo_id, out.len());
            out.push(relation);
        }
    }
    out
}

/// Per-run memo normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    pub resources: ResourceOptions,
    pub image_layout: ImageLayout,
    pub transformer: ContentTransformer,
    /// Offset used to render display dates.
    pub offset: FixedOffset,
}

impl Normalizer {
    #[must_use]
    pub fn from_config(config: &SyncConfig, offset: FixedOffset) -> Self {
        Self {
            resources: ResourceOptions::from_config(config),
            image_layout: config.image_layout,
            transformer: ContentTransformer::from_config(config),
            offset,
        }
    }

    /// Resolve and group the links of a memo's resources.
    #[must_use]
    pub fn resource_links(&self, resources: &[ResourceRef]) -> ResourceLinks {
        let image_separator = match self.image_layout {
            ImageLayout::Vertical => "\n",
            ImageLayout::Horizontal => "",
        };

        let mut all = Vec::with_capacity(resources.len());
        let mut images = Vec::new();
        let mut others = Vec::new();

        for resource in resources {
            let resolved = resolve_resource(resource, &self.resources);
            if resolved.is_image() {
                images.push(resolved.markdown_link.clone());
            } else {
                others.push(resolved.markdown_link.clone());
            }
            all.push(resolved.markdown_link);
        }

        ResourceLinks {
            all: all.join("\n"),
            images: images.join(image_separator),
            others,
        }
    }

    /// Normalize one memo.
    ///
    /// # Errors
    ///
    /// Returns an error if link resolution fails.
    pub async fn normalize<R: LinkResolver>(
        &self,
        memo: &MemoRecord,
        resolver: &R,
    ) -> Result<NormalizedMemo> {
        let display_ts = memo.display_ts();
        let display_datetime = format_ts(display_ts, self.offset, DATETIME_FORMAT);
        let display_date = format_ts(display_ts, self.offset, DATE_FORMAT);
        let title = format!("{display_datetime}・#{}", memo.id);

        let links = self.resource_links(&memo.resource_list);
        let content_text = self.transformer.transform(&memo.content, resolver).await?;

        let content = if links.all.is_empty() {
            content_text.clone()
        } else {
            format!("{content_text}\n{}", links.all)
        };

        Ok(NormalizedMemo {
            memo_id: memo.id,
            title,
            content,
            content_text,
            resource_links: links.all,
            image_links: links.images,
            resources: links.others,
            display_date,
            display_datetime,
            display_ts,
        })
    }

    /// Normalize every memo of the add list.
    ///
    /// # Errors
    ///
    /// Returns the first normalization error.
    pub async fn normalize_batch<R: LinkResolver>(
        &self,
        memos: &[MemoRecord],
        resolver: &R,
    ) -> Result<NormalizedBatch> {
        let mut batch = NormalizedBatch::default();
        let mut relations = Vec::new();

        for memo in memos {
            batch.memos.push(self.normalize(memo, resolver).await?);
            batch.resources.extend(memo.resource_list.iter().cloned());
            relations.extend(memo.relation_list.iter().cloned());
        }

        batch.relations = dedup_relations(relations);
        Ok(batch)
    }
}
