//! Document lookup for `((name))` link tokens.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::error::Result;
use crate::siyuan::SiyuanApi;

use super::transform::LinkResolver;

/// Quote a value for a SiYuan SQL string literal.
#[must_use]
pub fn sql_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Statement finding a document by exact title inside a notebook.
#[must_use]
pub fn document_by_title_query(notebook: &str, title: &str) -> String {
    format!(
        "SELECT id FROM blocks WHERE type='d' AND box={} AND content={} LIMIT 1",
        sql_quote(notebook),
        sql_quote(title)
    )
}

/// Resolves link names against SiYuan, creating missing documents under
/// the configured subject path.
///
/// Lookups are cached for the lifetime of the resolver, so a name that
/// appears in several memos of one run costs one query.
pub struct StoreLinkResolver<'a, S: SiyuanApi> {
    store: &'a S,
    notebook: &'a str,
    subject_path: String,
    cache: Mutex<HashMap<String, String>>,
}

impl<'a, S: SiyuanApi> StoreLinkResolver<'a, S> {
    #[must_use]
    pub fn new(store: &'a S, notebook: &'a str, subject_path: &str) -> Self {
        Self {
            store,
            notebook,
            subject_path: subject_path.trim().trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, name: &str) -> Option<String> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }

    fn remember(&self, name: &str, id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(name.to_string(), id.to_string());
        }
    }
}

impl<S: SiyuanApi> LinkResolver for StoreLinkResolver<'_, S> {
    async fn resolve_document(&self, name: &str) -> Result<String> {
        if let Some(id) = self.cached(name) {
            return Ok(id);
        }

        let rows = self
            .store
            .query_sql(&document_by_title_query(self.notebook, name))
            .await?;
        let existing = rows
            .first()
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_string);

        let id = if let Some(id) = existing {
            debug!(name, id = %id, "Linked document found");
            id
        } else {
            let hpath = format!("{}/{name}", self.subject_path);
            let id = self.store.create_doc_with_md(self.notebook, &hpath, "").await?;
            info!(name, hpath = %hpath, id = %id, "Created linked document");
            id
        };

        self.remember(name, &id);
        Ok(id)
    }
}
