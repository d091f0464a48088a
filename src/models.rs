//! Core data models shared by the validator and the syncer.
//!
//! Local side: [`LocalDocument`], a Markdown file under a source root.
//! Remote side: transient DTOs for YouTrack projects, knowledge bases and
//! articles. Nothing here outlives a single run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Separator between path segments (and the prefix) in derived titles.
pub const TITLE_SEPARATOR: &str = " / ";

/// Markdown file discovered under a root directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDocument {
    /// Path as walked (root joined with the relative path).
    pub path: PathBuf,
    /// Relative path split into segments, e.g. `["infra", "gw.md"]`.
    pub segments: Vec<String>,
    pub content: String,
}

impl LocalDocument {
    pub fn relative_path(&self) -> String {
        self.segments.join("/")
    }

    pub fn title(&self, prefix: Option<&str>) -> String {
        derive_title(&self.segments, prefix)
    }
}

/// Title of the remote article mirroring a relative path.
///
/// `["a", "b", "c.md"]` → `"a / b / c.md"`; with prefix `"BCs"` →
/// `"BCs / a / b / c.md"`. An empty prefix is ignored.
pub fn derive_title<S: AsRef<str>>(segments: &[S], prefix: Option<&str>) -> String {
    let joined = segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(TITLE_SEPARATOR);
    match prefix {
        Some(p) if !p.is_empty() => format!("{}{}{}", p, TITLE_SEPARATOR, joined),
        _ => joined,
    }
}

/// `{"id": "..."}` reference as used throughout the YouTrack REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
}

impl EntityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(rename = "shortName", default)]
    pub short_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RootArticleRef {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "articlesCount", default)]
    pub articles_count: Option<u64>,
    /// Top-level container article, if the service exposes one.
    #[serde(rename = "rootArticle", default)]
    pub root_article: Option<RootArticleRef>,
}

/// Article as returned by search and create calls.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteArticle {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "knowledgeBase", default)]
    pub knowledge_base: Option<EntityRef>,
    #[serde(default)]
    pub parent: Option<EntityRef>,
}

impl RemoteArticle {
    pub fn knowledge_base_id(&self) -> Option<&str> {
        self.knowledge_base.as_ref().map(|kb| kb.id.as_str())
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.id.as_str())
    }
}

/// Create payload: `{"title", "content", "knowledgeBase": {"id"}, "parent": {"id"}?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    #[serde(rename = "knowledgeBase")]
    pub knowledge_base: EntityRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<EntityRef>,
}

/// Update payload; title and parent are left untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleContent<'a> {
    pub content: &'a str,
}
