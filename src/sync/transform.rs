//! Memo body rewriting.
//!
//! Two passes, in order:
//! 1. `((name))` link tokens are resolved to SiYuan document references.
//! 2. Tags (`#tag`) are closed (`#tag# `) and optionally prefixed with a
//!    forced parent tag.
//!
//! Both passes are plain string functions; only the document lookup behind
//! [`LinkResolver`] touches the network.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{SyncConfig, TagScope};
use crate::error::Result;

/// `#` followed by a run of non-whitespace, non-`#` characters.
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[^\s#]+").expect("tag pattern is valid"));

/// `((name))` where `name` has no parentheses, quotes or newlines.
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\(\(([^()"\n]+)\)\)"#).expect("link pattern is valid"));

/// Any block reference, resolved (`((id "name"))`) or not.
static REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\([^()\n]*\)\)").expect("reference pattern is valid"));

/// A bare SiYuan block id, already a valid reference.
static BLOCK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{14}-[0-9a-z]{7}$").expect("block id pattern is valid"));

/// Tag rewriting settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    pub scope: TagScope,
    pub parent_tag: Option<String>,
}

/// Resolves a document name to a SiYuan document id.
pub trait LinkResolver: Send + Sync {
    /// Find the document titled `name`, creating it when missing.
    fn resolve_document(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// Close every tag in `text` according to `options`.
///
/// A tag may follow any character (`今天学习#Rust`), except inside a URL
/// (`https://x.dev/page#anchor`, `/docs/#intro`) or a block reference.
/// Headings (`# Title`) never match. A tag that is already closed (`#tag#`) is left alone, which makes
/// the rewrite idempotent.
#[must_use]
pub fn rewrite_tags(text: &str, options: &TagOptions) -> String {
    match options.scope {
        TagScope::Full => rewrite_tags_in(text, options.parent_tag.as_deref()),
        TagScope::LastLine => match text.rsplit_once('\n') {
            Some((head, last)) => {
                format!("{head}\n{}", rewrite_tags_in(last, options.parent_tag.as_deref()))
            }
            None => rewrite_tags_in(text, options.parent_tag.as_deref()),
        },
    }
}

fn rewrite_tags_in(text: &str, parent_tag: Option<&str>) -> String {
    let refs: Vec<_> = REF_RE.find_iter(text).map(|r| r.range()).collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;

    for m in TAG_RE.find_iter(text) {
        let already_closed = text[m.end()..].starts_with('#');
        let in_ref = refs.iter().any(|r| r.contains(&m.start()));
        if already_closed || in_ref || in_url(&text[..m.start()]) {
            continue;
        }

        let body = &m.as_str()[1..];
        out.push_str(&text[last..m.start()]);
        out.push('#');
        if let Some(parent) = parent_tag {
            if body != parent && !body.starts_with(&format!("{parent}/")) {
                out.push_str(parent);
                out.push('/');
            }
        }
        out.push_str(body);
        out.push_str("# ");
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

/// Whether a `#` preceded by `prefix` belongs to a URL.
fn in_url(prefix: &str) -> bool {
    let word = prefix.rsplit(char::is_whitespace).next().unwrap_or_default();
    word.contains("://") || word.ends_with('/')
}

/// Distinct `((name))` references in order of first appearance.
#[must_use]
pub fn link_tokens(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in LINK_RE.captures_iter(text) {
        let name = cap[1].trim();
        if name.is_empty() || BLOCK_ID_RE.is_match(name) {
            continue;
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Rewrite each resolved `((name))` into `((<id> "name"))`.
///
/// Tokens without an entry in `resolved` are kept as written.
#[must_use]
pub fn replace_link_tokens(text: &str, resolved: &HashMap<String, String>) -> String {
    LINK_RE
        .replace_all(text, |cap: &regex::Captures<'_>| {
            let name = cap[1].trim();
            match resolved.get(name) {
                Some(id) => format!("(({id} \"{name}\"))"),
                None => cap[0].to_string(),
            }
        })
        .into_owned()
}

/// Body rewriting for one sync run.
#[derive(Debug, Clone, Default)]
pub struct ContentTransformer {
    pub tags: TagOptions,
    pub bidirectional_links: bool,
}

impl ContentTransformer {
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            tags: TagOptions {
                scope: config.tag_scope,
                parent_tag: config.parent_tag().map(str::to_string),
            },
            bidirectional_links: config.bidirectional_links,
        }
    }

    /// Rewrite a memo body. Links are resolved before tags are touched.
    ///
    /// # Errors
    ///
    /// Returns an error if a linked document cannot be found or created.
    pub async fn transform<R: LinkResolver>(&self, text: &str, resolver: &R) -> Result<String> {
        let linked = if self.bidirectional_links {
            let mut resolved = HashMap::new();
            for name in link_tokens(text) {
                let id = resolver.resolve_document(&name).await?;
                resolved.insert(name, id);
            }
            replace_link_tokens(text, &resolved)
        } else {
            text.to_string()
        };

        Ok(rewrite_tags(&linked, &self.tags))
    }
}
