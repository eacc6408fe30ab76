//! Data model types.

pub mod memo;
pub mod normalized;

pub use memo::{MemoId, MemoRecord, RelationRef, ResourceRef, RowStatus};
pub use normalized::{ChangeSet, NormalizedMemo, ResolvedResource};
