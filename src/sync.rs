//! Knowledge-base sync orchestration.
//!
//! Coordinates the full `kb-sync` flow: markdown discovery → destination
//! resolution → per-document reconciliation. Article identity is always
//! re-derived from the title within the resolved scope, so running twice
//! on an unchanged tree creates nothing new on the second pass.

use anyhow::Result;

use crate::config::SyncSettings;
use crate::markdown_fs;
use crate::models::LocalDocument;
use crate::progress::{ArticleAction, SyncEvent, SyncReporter};
use crate::resolve::{self, ArticleScope, SyncTarget};
use crate::traits::KnowledgeBaseApi;

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: u64,
    pub updated: u64,
    pub planned_creates: u64,
    pub planned_updates: u64,
}

impl SyncReport {
    fn record(&mut self, action: ArticleAction) {
        match action {
            ArticleAction::Created => self.created += 1,
            ArticleAction::Updated => self.updated += 1,
            ArticleAction::WouldCreate => self.planned_creates += 1,
            ArticleAction::WouldUpdate => self.planned_updates += 1,
        }
    }

    /// Articles synchronized (or planned, in dry-run).
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.planned_creates + self.planned_updates
    }
}

/// Make the article titled `title` in `scope` hold `content`.
///
/// Exact match → content-only update; otherwise create under the scope's
/// parent. In dry-run the lookup still happens but nothing is written.
pub async fn reconcile_document(
    api: &dyn KnowledgeBaseApi,
    scope: &ArticleScope,
    title: &str,
    content: &str,
    dry_run: bool,
) -> Result<ArticleAction> {
    let existing = resolve::find_article(api, scope, title).await?;

    let action = match (existing, dry_run) {
        (Some(_), true) => ArticleAction::WouldUpdate,
        (None, true) => ArticleAction::WouldCreate,
        (Some(article), false) => {
            api.update_article(&article.id, content).await?;
            ArticleAction::Updated
        }
        (None, false) => {
            api.create_article(&scope.draft(title, content)).await?;
            ArticleAction::Created
        }
    };
    Ok(action)
}

/// Reconcile every document against a resolved target.
pub async fn sync_documents(
    api: &dyn KnowledgeBaseApi,
    target: &SyncTarget,
    documents: &[LocalDocument],
    title_prefix: Option<&str>,
    dry_run: bool,
    reporter: &dyn SyncReporter,
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for doc in documents {
        let title = doc.title(title_prefix);
        let action = match target {
            SyncTarget::Ready(scope) => {
                reconcile_document(api, scope, &title, &doc.content, dry_run).await?
            }
            // Nothing can exist below a root that does not exist yet.
            SyncTarget::RootPending { .. } => ArticleAction::WouldCreate,
        };
        report.record(action);
        reporter.report(SyncEvent::Article { title, action });
    }

    reporter.report(SyncEvent::Finished {
        count: report.total(),
        dry_run,
    });
    Ok(report)
}

/// Entry point for `docpipe kb-sync`.
///
/// A missing source directory is not an error: the run reports it and
/// returns an empty report.
pub async fn run_sync(
    api: &dyn KnowledgeBaseApi,
    settings: &SyncSettings,
    dry_run: bool,
    reporter: &dyn SyncReporter,
) -> Result<SyncReport> {
    if !settings.source.exists() {
        reporter.report(SyncEvent::SourceMissing {
            path: settings.source.clone(),
        });
        return Ok(SyncReport::default());
    }

    let target = resolve::resolve_target(api, settings, dry_run, reporter).await?;

    let documents = markdown_fs::scan_markdown(&settings.source, &[])?;
    tracing::debug!(count = documents.len(), source = %settings.source.display(), "documents discovered");

    sync_documents(
        api,
        &target,
        &documents,
        settings.title_prefix.as_deref(),
        dry_run,
        reporter,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KbScope, SyncSettings};
    use crate::http::RetryPolicy;
    use crate::models::{ArticleDraft, EntityRef, KnowledgeBase, Project, RemoteArticle, RootArticleRef};
    use crate::progress::RecordingReporter;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone)]
    struct StoredArticle {
        id: String,
        title: String,
        content: String,
        kb: String,
        parent: Option<String>,
    }

    #[derive(Default)]
    struct FakeState {
        articles: Vec<StoredArticle>,
        creates: u32,
        updates: u32,
        next_id: u32,
    }

    /// In-memory knowledge base whose search matches by substring, like
    /// the real service does.
    struct FakeApi {
        projects: Vec<Project>,
        project_kb: Option<KnowledgeBase>,
        named_kbs: Vec<KnowledgeBase>,
        state: Mutex<FakeState>,
    }

    impl FakeApi {
        fn project_scoped() -> Self {
            Self {
                projects: vec![Project {
                    id: "0-1".to_string(),
                    short_name: Some("MP".to_string()),
                }],
                project_kb: Some(KnowledgeBase {
                    id: "kb-1".to_string(),
                    name: Some("MP".to_string()),
                    articles_count: None,
                    root_article: Some(RootArticleRef {
                        id: "A-0".to_string(),
                        title: Some("Home".to_string()),
                    }),
                }),
                named_kbs: vec![KnowledgeBase {
                    id: "kb-7".to_string(),
                    name: Some("API Docs".to_string()),
                    articles_count: None,
                    root_article: None,
                }],
                state: Mutex::new(FakeState::default()),
            }
        }

        fn seed(&self, title: &str, kb: &str, parent: Option<&str>) -> String {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("S-{}", state.next_id);
            state.articles.push(StoredArticle {
                id: id.clone(),
                title: title.to_string(),
                content: String::new(),
                kb: kb.to_string(),
                parent: parent.map(str::to_string),
            });
            id
        }

        fn creates(&self) -> u32 {
            self.state.lock().unwrap().creates
        }

        fn updates(&self) -> u32 {
            self.state.lock().unwrap().updates
        }

        fn article(&self, title: &str) -> Option<StoredArticle> {
            self.state
                .lock()
                .unwrap()
                .articles
                .iter()
                .find(|a| a.title == title)
                .cloned()
        }

        fn article_count(&self) -> usize {
            self.state.lock().unwrap().articles.len()
        }
    }

    #[async_trait]
    impl KnowledgeBaseApi for FakeApi {
        async fn find_project(&self, short_name: &str) -> Result<Option<Project>> {
            Ok(self
                .projects
                .iter()
                .find(|p| p.short_name.as_deref() == Some(short_name))
                .cloned())
        }

        async fn project_knowledge_base(&self, _project_id: &str) -> Result<Option<KnowledgeBase>> {
            Ok(self.project_kb.clone())
        }

        async fn find_knowledge_base(&self, name: &str) -> Result<Option<KnowledgeBase>> {
            Ok(self
                .named_kbs
                .iter()
                .find(|kb| kb.name.as_deref() == Some(name))
                .cloned())
        }

        async fn search_articles(&self, title: &str) -> Result<Vec<RemoteArticle>> {
            let needle = title.to_lowercase();
            Ok(self
                .state
                .lock()
                .unwrap()
                .articles
                .iter()
                .filter(|a| a.title.to_lowercase().contains(&needle))
                .map(|a| RemoteArticle {
                    id: a.id.clone(),
                    title: Some(a.title.clone()),
                    knowledge_base: Some(EntityRef::new(a.kb.clone())),
                    parent: a.parent.clone().map(EntityRef::new),
                })
                .collect())
        }

        async fn create_article(&self, draft: &ArticleDraft) -> Result<RemoteArticle> {
            let mut state = self.state.lock().unwrap();
            state.creates += 1;
            state.next_id += 1;
            let id = format!("A-{}", state.next_id);
            state.articles.push(StoredArticle {
                id: id.clone(),
                title: draft.title.clone(),
                content: draft.content.clone(),
                kb: draft.knowledge_base.id.clone(),
                parent: draft.parent.as_ref().map(|p| p.id.clone()),
            });
            Ok(RemoteArticle {
                id,
                title: Some(draft.title.clone()),
                knowledge_base: Some(draft.knowledge_base.clone()),
                parent: draft.parent.clone(),
            })
        }

        async fn update_article(&self, article_id: &str, content: &str) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.updates += 1;
            let article = state
                .articles
                .iter_mut()
                .find(|a| a.id == article_id)
                .ok_or_else(|| anyhow::anyhow!("no article {}", article_id))?;
            article.content = content.to_string();
            Ok(())
        }
    }

    fn settings(source: &Path, prefix: Option<&str>, scope: KbScope) -> SyncSettings {
        SyncSettings {
            base_url: "https://yt.example.com".to_string(),
            token: "token".to_string(),
            root_title: "API Docs".to_string(),
            title_prefix: prefix.map(str::to_string),
            scope,
            source: source.to_path_buf(),
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }

    fn mp() -> KbScope {
        KbScope::Project {
            short_name: "MP".to_string(),
        }
    }

    fn source_tree(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, body) in files {
            let path = tmp.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, body).unwrap();
        }
        tmp
    }

    #[tokio::test]
    async fn test_first_run_creates_root_and_article() {
        let src = source_tree(&[("infra/gw.md", "# Gateway")]);
        let api = FakeApi::project_scoped();
        let reporter = RecordingReporter::new();

        let report = run_sync(&api, &settings(src.path(), Some("API Docs"), mp()), false, &reporter)
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.total(), 1);
        // Root article plus the document.
        assert_eq!(api.creates(), 2);

        let root = api.article("API Docs").unwrap();
        assert_eq!(root.parent.as_deref(), Some("A-0"));
        assert!(root.content.starts_with("# API Docs"));

        let doc = api.article("API Docs / infra / gw.md").unwrap();
        assert_eq!(doc.content, "# Gateway");
        assert_eq!(doc.kb, "kb-1");
        assert_eq!(doc.parent.as_deref(), Some(root.id.as_str()));

        let lines = reporter.lines();
        assert!(lines.contains(&"[YT] created: API Docs / infra / gw.md".to_string()));
        assert_eq!(
            lines.last().unwrap(),
            "[YT] done: 1 article(s) synchronized."
        );
    }

    #[tokio::test]
    async fn test_second_run_only_updates() {
        let src = source_tree(&[("a.md", "A"), ("b/c.md", "C")]);
        let api = FakeApi::project_scoped();
        let cfg = settings(src.path(), None, mp());

        let first = run_sync(&api, &cfg, false, &RecordingReporter::new())
            .await
            .unwrap();
        assert_eq!(first.created, 2);
        let articles_after_first = api.article_count();

        let second = run_sync(&api, &cfg, false, &RecordingReporter::new())
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(api.article_count(), articles_after_first);
        assert_eq!(api.article("b / c.md").unwrap().content, "C");
    }

    #[tokio::test]
    async fn test_update_overwrites_content_only() {
        let src = source_tree(&[("gw.md", "new body")]);
        let api = FakeApi::project_scoped();
        let root = api.seed("API Docs", "kb-1", Some("A-0"));
        let existing = api.seed("gw.md", "kb-1", Some(root.as_str()));

        let report = run_sync(&api, &settings(src.path(), None, mp()), false, &RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(api.creates(), 0);
        let article = api.article("gw.md").unwrap();
        assert_eq!(article.id, existing);
        assert_eq!(article.content, "new body");
        assert_eq!(article.parent.as_deref(), Some(root.as_str()));
    }

    #[tokio::test]
    async fn test_fuzzy_search_hits_are_not_accepted() {
        let src = source_tree(&[("gw.md", "body")]);
        let api = FakeApi::project_scoped();
        let root = api.seed("API Docs", "kb-1", Some("A-0"));
        // Partial title, wrong case, other parent, other knowledge base.
        api.seed("old / gw.md", "kb-1", Some(root.as_str()));
        api.seed("GW.md", "kb-1", Some(root.as_str()));
        api.seed("gw.md", "kb-1", Some("A-0"));
        api.seed("gw.md", "kb-2", Some(root.as_str()));

        let report = run_sync(&api, &settings(src.path(), None, mp()), false, &RecordingReporter::new())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 0);
        assert_eq!(api.updates(), 0);
    }

    #[tokio::test]
    async fn test_existing_root_is_reused() {
        let src = source_tree(&[("x.md", "x")]);
        let api = FakeApi::project_scoped();
        let root = api.seed("API Docs", "kb-1", Some("A-0"));
        let reporter = RecordingReporter::new();

        run_sync(&api, &settings(src.path(), None, mp()), false, &reporter)
            .await
            .unwrap();

        assert_eq!(api.creates(), 1);
        assert!(reporter.events().contains(&SyncEvent::RootResolved {
            title: "API Docs".to_string(),
            id: root,
        }));
    }

    #[tokio::test]
    async fn test_missing_project_is_fatal() {
        let src = source_tree(&[("x.md", "x")]);
        let api = FakeApi::project_scoped();
        let scope = KbScope::Project {
            short_name: "NOPE".to_string(),
        };

        let err = run_sync(&api, &settings(src.path(), None, scope), false, &RecordingReporter::new())
            .await
            .unwrap_err();

        assert_eq!(crate::error::exit_code(&err), 1);
        assert!(err.to_string().contains("NOPE"));
        assert_eq!(api.creates(), 0);
    }

    #[tokio::test]
    async fn test_project_without_knowledge_base_is_fatal() {
        let src = source_tree(&[("x.md", "x")]);
        let mut api = FakeApi::project_scoped();
        api.project_kb = None;

        let err = run_sync(&api, &settings(src.path(), None, mp()), false, &RecordingReporter::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no knowledge base"));
    }

    #[tokio::test]
    async fn test_knowledge_base_scope_creates_without_parent() {
        let src = source_tree(&[("infra/gw.md", "# Gateway")]);
        let api = FakeApi::project_scoped();

        let report = run_sync(
            &api,
            &settings(src.path(), None, KbScope::KnowledgeBase),
            false,
            &RecordingReporter::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(api.creates(), 1);
        let doc = api.article("infra / gw.md").unwrap();
        assert_eq!(doc.kb, "kb-7");
        assert_eq!(doc.parent, None);
    }

    #[tokio::test]
    async fn test_unknown_knowledge_base_name_is_fatal() {
        let src = source_tree(&[("x.md", "x")]);
        let api = FakeApi::project_scoped();
        let mut cfg = settings(src.path(), None, KbScope::KnowledgeBase);
        cfg.root_title = "Missing KB".to_string();

        let err = run_sync(&api, &cfg, false, &RecordingReporter::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing KB"));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let src = source_tree(&[("a.md", "A"), ("b.md", "B")]);
        let api = FakeApi::project_scoped();
        let root = api.seed("API Docs", "kb-1", Some("A-0"));
        api.seed("a.md", "kb-1", Some(root.as_str()));
        let reporter = RecordingReporter::new();

        let report = run_sync(&api, &settings(src.path(), None, mp()), true, &reporter)
            .await
            .unwrap();

        assert_eq!(report.planned_updates, 1);
        assert_eq!(report.planned_creates, 1);
        assert_eq!(api.creates() + api.updates(), 0);
        assert_eq!(
            reporter.lines().last().unwrap(),
            "[YT] dry run: 2 article(s) planned."
        );
    }

    #[tokio::test]
    async fn test_dry_run_with_missing_root_plans_creates() {
        let src = source_tree(&[("a.md", "A")]);
        let api = FakeApi::project_scoped();
        let reporter = RecordingReporter::new();

        let report = run_sync(&api, &settings(src.path(), None, mp()), true, &reporter)
            .await
            .unwrap();

        assert_eq!(report.planned_creates, 1);
        assert_eq!(api.creates(), 0);
        assert!(reporter.events().contains(&SyncEvent::RootPending {
            title: "API Docs".to_string()
        }));
    }

    #[tokio::test]
    async fn test_missing_source_is_nothing_to_do() {
        let tmp = TempDir::new().unwrap();
        let missing: PathBuf = tmp.path().join("build/dokka/gfm");
        let api = FakeApi::project_scoped();
        let reporter = RecordingReporter::new();

        let report = run_sync(&api, &settings(&missing, None, mp()), false, &reporter)
            .await
            .unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(api.creates(), 0);
        assert_eq!(
            reporter.events(),
            vec![SyncEvent::SourceMissing { path: missing }]
        );
    }
}
