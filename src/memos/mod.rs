//! Memos source service.
//!
//! - [`MemosApi`] - operations the sync engine consumes
//! - [`MemosClient`] - reqwest implementation against `/api/v1`

pub mod api;
pub mod client;

pub use api::{MemoQuery, MemosApi, MemosUser};
pub use client::MemosClient;
