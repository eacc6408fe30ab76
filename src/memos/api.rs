//! Memos service trait.
//!
//! The sync engine only needs four operations from the memo server. The
//! trait lets the orchestrator run against the real HTTP client or an
//! in-memory fake.

use serde::Deserialize;

use crate::error::Result;
use crate::model::{MemoRecord, RowStatus};

/// One page request against the memo listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoQuery {
    pub limit: usize,
    pub offset: usize,
    pub row_status: RowStatus,
}

/// The user owning the access token.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemosUser {
    pub id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub nickname: String,
}

/// Operations consumed from the Memos server.
pub trait MemosApi: Send + Sync {
    /// Check that the server answers at all.
    fn ping(&self) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fetch the token owner. A rejected token is `Error::Unauthorized`.
    fn current_user(&self) -> impl std::future::Future<Output = Result<MemosUser>> + Send;

    /// Fetch one page of memos, in insertion order.
    fn list_memos(
        &self,
        query: MemoQuery,
    ) -> impl std::future::Future<Output = Result<Vec<MemoRecord>>> + Send;

    /// Download a resource binary addressed by id, name or uid.
    fn download_resource(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
}
