//! SiYuan target store trait.
//!
//! Every method maps to one kernel endpoint. Implementations return
//! `Error::Api` when the kernel answers with a non-zero `code`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::Result;

/// A notebook as listed by `lsNotebooks`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, serde::Serialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
}

/// An immediate child of a block.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChildBlock {
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
}

/// Operations consumed from the SiYuan kernel.
pub trait SiyuanApi: Send + Sync {
    fn list_notebooks(&self) -> impl std::future::Future<Output = Result<Vec<Notebook>>> + Send;

    /// The notebook's `dailyNoteSavePath` sprig template.
    fn daily_note_template(
        &self,
        notebook: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    fn render_sprig(
        &self,
        template: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Document ids at a human-readable path; empty when none exists.
    fn ids_by_hpath(
        &self,
        notebook: &str,
        hpath: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Create a document and return its id.
    fn create_doc_with_md(
        &self,
        notebook: &str,
        hpath: &str,
        markdown: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Append markdown as the last child of `parent_id`; returns the new block id.
    fn append_block(
        &self,
        parent_id: &str,
        markdown: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Insert markdown right after `previous_id`; returns the new block id.
    fn insert_block_after(
        &self,
        previous_id: &str,
        markdown: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    fn child_blocks(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChildBlock>>> + Send;

    fn delete_block(&self, id: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Set custom attributes; names must start with `custom-`.
    fn set_block_attrs(
        &self,
        id: &str,
        attrs: &BTreeMap<String, String>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Run a read-only SQL statement against the kernel's block database.
    fn query_sql(
        &self,
        stmt: &str,
    ) -> impl std::future::Future<Output = Result<Vec<serde_json::Value>>> + Send;

    /// Write a file into the workspace (e.g. `/data/assets/...`).
    fn put_file(
        &self,
        path: &str,
        content: Vec<u8>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn push_msg(&self, msg: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    fn push_err_msg(&self, msg: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}
