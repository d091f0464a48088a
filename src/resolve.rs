//! Destination resolution: which knowledge base, under which parent.
//!
//! Two strategies, picked by [`KbScope`]:
//!
//! - **Project**: project by short name → its knowledge base → the named
//!   logical root article below the knowledge base's root container,
//!   created on first run.
//! - **Knowledge base**: knowledge base by display name; articles are
//!   placed directly in it with no parent.
//!
//! A missing project or knowledge base is fatal ([`PipelineError::NotFound`]).

use anyhow::Result;

use crate::config::{KbScope, SyncSettings};
use crate::error::PipelineError;
use crate::models::{ArticleDraft, EntityRef, RemoteArticle};
use crate::progress::{SyncEvent, SyncReporter};
use crate::traits::KnowledgeBaseApi;

/// Where synced articles live: a knowledge base and an optional parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleScope {
    pub knowledge_base_id: String,
    pub parent_id: Option<String>,
}

impl ArticleScope {
    /// Exact title match inside this scope.
    pub fn matches(&self, article: &RemoteArticle, title: &str) -> bool {
        if article.title.as_deref() != Some(title) {
            return false;
        }
        if article.knowledge_base_id() != Some(self.knowledge_base_id.as_str()) {
            return false;
        }
        match &self.parent_id {
            Some(parent) => article.parent_id() == Some(parent.as_str()),
            None => true,
        }
    }

    pub fn draft(&self, title: &str, content: &str) -> ArticleDraft {
        ArticleDraft {
            title: title.to_string(),
            content: content.to_string(),
            knowledge_base: EntityRef::new(self.knowledge_base_id.clone()),
            parent: self.parent_id.clone().map(EntityRef::new),
        }
    }
}

/// Outcome of resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTarget {
    Ready(ArticleScope),
    /// Dry-run only: the logical root is missing and was not created.
    RootPending {
        knowledge_base_id: String,
        title: String,
    },
}

/// Search for `title` and keep the first exact match inside `scope`.
pub async fn find_article(
    api: &dyn KnowledgeBaseApi,
    scope: &ArticleScope,
    title: &str,
) -> Result<Option<RemoteArticle>> {
    let candidates = api.search_articles(title).await?;
    Ok(candidates.into_iter().find(|a| scope.matches(a, title)))
}

/// Body of a freshly created logical root article.
pub fn root_article_body(title: &str) -> String {
    format!(
        "# {}\n\nThis article is the root for the automated API documentation sync. \
         Pages below it are overwritten on every run.",
        title
    )
}

pub async fn resolve_target(
    api: &dyn KnowledgeBaseApi,
    settings: &SyncSettings,
    dry_run: bool,
    reporter: &dyn SyncReporter,
) -> Result<SyncTarget> {
    match &settings.scope {
        KbScope::Project { short_name } => {
            resolve_project_scope(api, short_name, &settings.root_title, dry_run, reporter).await
        }
        KbScope::KnowledgeBase => {
            resolve_named_scope(api, &settings.root_title, reporter).await
        }
    }
}

async fn resolve_project_scope(
    api: &dyn KnowledgeBaseApi,
    short_name: &str,
    root_title: &str,
    dry_run: bool,
    reporter: &dyn SyncReporter,
) -> Result<SyncTarget> {
    let project = api.find_project(short_name).await?.ok_or_else(|| {
        PipelineError::not_found(format!("project with short name '{}' not found", short_name))
    })?;
    reporter.report(SyncEvent::ProjectResolved {
        short_name: short_name.to_string(),
        id: project.id.clone(),
    });

    let kb = api
        .project_knowledge_base(&project.id)
        .await?
        .ok_or_else(|| {
            PipelineError::not_found(format!(
                "project '{}' has no knowledge base; enable it in YouTrack first",
                short_name
            ))
        })?;
    let container_id = kb.root_article.as_ref().map(|r| r.id.clone());
    reporter.report(SyncEvent::KnowledgeBaseResolved {
        id: kb.id.clone(),
        container_id: container_id.clone(),
    });

    let container_scope = ArticleScope {
        knowledge_base_id: kb.id.clone(),
        parent_id: container_id,
    };

    let root = match find_article(api, &container_scope, root_title).await? {
        Some(existing) => {
            reporter.report(SyncEvent::RootResolved {
                title: root_title.to_string(),
                id: existing.id.clone(),
            });
            existing
        }
        None if dry_run => {
            reporter.report(SyncEvent::RootPending {
                title: root_title.to_string(),
            });
            return Ok(SyncTarget::RootPending {
                knowledge_base_id: kb.id,
                title: root_title.to_string(),
            });
        }
        None => {
            let draft = container_scope.draft(root_title, &root_article_body(root_title));
            let created = api.create_article(&draft).await?;
            reporter.report(SyncEvent::RootCreated {
                title: root_title.to_string(),
                id: created.id.clone(),
            });
            created
        }
    };

    Ok(SyncTarget::Ready(ArticleScope {
        knowledge_base_id: kb.id,
        parent_id: Some(root.id),
    }))
}

async fn resolve_named_scope(
    api: &dyn KnowledgeBaseApi,
    name: &str,
    reporter: &dyn SyncReporter,
) -> Result<SyncTarget> {
    let kb = api.find_knowledge_base(name).await?.ok_or_else(|| {
        PipelineError::not_found(format!("knowledge base '{}' not found", name))
    })?;
    reporter.report(SyncEvent::KnowledgeBaseResolved {
        id: kb.id.clone(),
        container_id: None,
    });
    Ok(SyncTarget::Ready(ArticleScope {
        knowledge_base_id: kb.id,
        parent_id: None,
    }))
}
