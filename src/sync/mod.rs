//! Incremental Memos → SiYuan sync engine.
//!
//! Stages, leaves first:
//!
//! - **Resource** ([`resource`]): attachment → markdown link + asset path
//! - **Transform** ([`transform`], [`links`]): tag closing, parent-tag
//!   prefixing, `((name))` link resolution
//! - **Normalize** ([`normalize`]): one [`NormalizedMemo`](crate::model::NormalizedMemo) per memo
//! - **Detect** ([`detect`], [`checkpoint`]): paged fetch, add/stale split
//! - **Write** ([`writer`], [`block_map`]): delete stale blocks, write
//!   blocks or pages, link relations, tag blocks with `custom-memo-id`
//! - **Orchestrate** ([`orchestrator`]): lock, run the stages in order,
//!   persist the checkpoint
//!
//! # Example
//!
//! ```ignore
//! use memos_sync::sync::{RunOptions, SyncContext, SyncLock};
//!
//! let lock = SyncLock::new();
//! let mut ctx = SyncContext::new(config, &memos, &siyuan, &siyuan, &lock, now);
//! let outcome = ctx.run(&config_store, RunOptions::default()).await?;
//! ```

pub mod block_map;
pub mod checkpoint;
pub mod detect;
pub mod download;
pub mod links;
pub mod normalize;
pub mod notify;
pub mod orchestrator;
pub mod report;
pub mod resource;
pub mod transform;
pub mod writer;

#[cfg(test)]
pub(crate) mod fake;

pub use block_map::{BlockIdMap, MEMO_ID_ATTR};
pub use checkpoint::Checkpoint;
pub use detect::{PAGE_SIZE, detect_changes};
pub use links::StoreLinkResolver;
pub use normalize::{NormalizedBatch, Normalizer, dedup_relations};
pub use notify::{LogNotifier, Notifier};
pub use orchestrator::{RunOptions, SyncContext, SyncLock, SyncOutcome, SyncPhase, SyncPreview};
pub use report::{FailureStage, ItemFailure, SyncReport, WriteReport};
pub use resource::{ResourceOptions, resolve_resource};
pub use transform::{ContentTransformer, LinkResolver, TagOptions};
pub use writer::Writer;
