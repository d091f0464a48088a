//! Capability interface over the remote knowledge-base service.
//!
//! Resolution and reconciliation only ever talk to a [`KnowledgeBaseApi`],
//! so they run unchanged against the real [`YouTrackClient`] or an
//! in-memory fake in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ markdown_fs  │──▶│  sync        │──▶│ KnowledgeBaseApi │
//! │ (documents)  │   │ (reconcile)  │   │  YouTrack / fake │
//! └──────────────┘   └──────┬───────┘   └──────────────────┘
//!                           │
//!                    resolve (KB + root)
//! ```
//!
//! Implementations return `Ok(None)` / an empty list for "does not
//! exist" and reserve `Err` for failed calls (non-2xx after retries,
//! transport errors, undecodable payloads).
//!
//! [`YouTrackClient`]: crate::youtrack::YouTrackClient

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ArticleDraft, KnowledgeBase, Project, RemoteArticle};

// ═══════════════════════════════════════════════════════════════════════
// KnowledgeBaseApi Trait
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait KnowledgeBaseApi: Send + Sync {
    /// Project whose short name equals `short_name` exactly.
    async fn find_project(&self, short_name: &str) -> Result<Option<Project>>;

    /// The knowledge base embedded in a project, with its root container.
    async fn project_knowledge_base(&self, project_id: &str) -> Result<Option<KnowledgeBase>>;

    /// Knowledge base whose display name equals `name` exactly.
    async fn find_knowledge_base(&self, name: &str) -> Result<Option<KnowledgeBase>>;

    /// Articles the service considers a match for `title`.
    ///
    /// The service may match fuzzily and across knowledge bases; callers
    /// filter down to an exact match within their scope.
    async fn search_articles(&self, title: &str) -> Result<Vec<RemoteArticle>>;

    /// Create an article and return it (at least its id).
    async fn create_article(&self, draft: &ArticleDraft) -> Result<RemoteArticle>;

    /// Overwrite an article's content. Title and parent stay unchanged.
    async fn update_article(&self, article_id: &str, content: &str) -> Result<()>;
}
