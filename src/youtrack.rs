//! YouTrack REST implementation of [`KnowledgeBaseApi`].
//!
//! Endpoints used:
//!
//! | Call | Endpoint |
//! |------|----------|
//! | project lookup | `GET /api/projects?fields=id,shortName` |
//! | project KB | `GET /api/projects/{id}?fields=knowledgeBase(...)` |
//! | KB by name | `GET /api/knowledgeBases?fields=id,name` |
//! | article search | `GET /api/articles?query=title: "..."` |
//! | create | `POST /api/articles` |
//! | update | `POST /api/articles/{id}` |
//!
//! Reads must answer 200 and writes 200 or 201; any other status (after
//! the HTTP layer's retries) becomes a [`PipelineError::Api`] carrying the
//! status and a truncated body. List and search calls page through the
//! results with `$top`/`$skip` until a short page comes back.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SyncSettings;
use crate::error::PipelineError;
use crate::http::{ApiResponse, HttpClient};
use crate::models::{ArticleContent, ArticleDraft, KnowledgeBase, Project, RemoteArticle};
use crate::traits::KnowledgeBaseApi;

const PROJECT_FIELDS: &str = "id,shortName";
const PROJECT_KB_FIELDS: &str = "knowledgeBase(id,articlesCount,rootArticle(id,title))";
const KB_FIELDS: &str = "id,name";
const ARTICLE_FIELDS: &str = "id,title,knowledgeBase(id),parent(id)";

/// `$top` sent with every list or search request.
pub const PAGE_SIZE: usize = 100;

const READ_OK: &[u16] = &[200];
const WRITE_OK: &[u16] = &[200, 201];

#[derive(Debug, Clone)]
pub struct YouTrackClient {
    http: HttpClient,
}

#[derive(Deserialize)]
struct ProjectDetails {
    #[serde(rename = "knowledgeBase", default)]
    knowledge_base: Option<KnowledgeBase>,
}

impl YouTrackClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        let http = HttpClient::new(
            &settings.base_url,
            &settings.token,
            settings.timeout,
            settings.retry,
        )?;
        Ok(Self::new(http))
    }

    fn expect_status(response: ApiResponse, operation: &str, accepted: &[u16]) -> Result<ApiResponse> {
        if accepted.contains(&response.status) {
            Ok(response)
        } else {
            Err(PipelineError::api(operation, response.status, &response.body).into())
        }
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        operation: &str,
    ) -> Result<Vec<T>> {
        let top = PAGE_SIZE.to_string();
        let mut items = Vec::new();
        loop {
            let skip = items.len().to_string();
            let mut params = query.to_vec();
            params.push(("$top", top.as_str()));
            params.push(("$skip", skip.as_str()));

            let response = self.http.get(path, &params).await?;
            let response = Self::expect_status(response, operation, READ_OK)?;
            let page: Vec<T> = response
                .json()
                .with_context(|| format!("decoding {}", operation))?;
            let short = page.len() < PAGE_SIZE;
            items.extend(page);
            if short {
                return Ok(items);
            }
        }
    }
}

/// Search expression matching a title phrase.
pub fn title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
    format!("title: \"{}\"", escaped)
}

#[async_trait]
impl KnowledgeBaseApi for YouTrackClient {
    async fn find_project(&self, short_name: &str) -> Result<Option<Project>> {
        let projects: Vec<Project> = self
            .get_all("/api/projects", &[("fields", PROJECT_FIELDS)], "project list")
            .await?;
        Ok(projects
            .into_iter()
            .find(|p| p.short_name.as_deref() == Some(short_name)))
    }

    async fn project_knowledge_base(&self, project_id: &str) -> Result<Option<KnowledgeBase>> {
        let path = format!("/api/projects/{}", project_id);
        let response = self
            .http
            .get(&path, &[("fields", PROJECT_KB_FIELDS)])
            .await?;
        let response = Self::expect_status(response, "project details", READ_OK)?;
        let details: ProjectDetails = response.json().context("decoding project details")?;
        Ok(details.knowledge_base)
    }

    async fn find_knowledge_base(&self, name: &str) -> Result<Option<KnowledgeBase>> {
        let bases: Vec<KnowledgeBase> = self
            .get_all("/api/knowledgeBases", &[("fields", KB_FIELDS)], "knowledge base list")
            .await?;
        Ok(bases
            .into_iter()
            .find(|kb| kb.name.as_deref() == Some(name)))
    }

    async fn search_articles(&self, title: &str) -> Result<Vec<RemoteArticle>> {
        let query = title_query(title);
        self.get_all(
            "/api/articles",
            &[("query", query.as_str()), ("fields", ARTICLE_FIELDS)],
            "article search",
        )
        .await
    }

    async fn create_article(&self, draft: &ArticleDraft) -> Result<RemoteArticle> {
        let response = self
            .http
            .post_json("/api/articles", &[("fields", "id,title")], draft)
            .await?;
        let response = Self::expect_status(response, "create article", WRITE_OK)?;
        response.json().context("decoding created article")
    }

    async fn update_article(&self, article_id: &str, content: &str) -> Result<()> {
        let path = format!("/api/articles/{}", article_id);
        let response = self
            .http
            .post_json(&path, &[("fields", "id")], &ArticleContent { content })
            .await?;
        Self::expect_status(response, "update article", WRITE_OK)?;
        Ok(())
    }
}
