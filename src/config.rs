use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::PipelineError;
use crate::http::RetryPolicy;

/// Read when `--config` is not given and the file exists.
pub const DEFAULT_CONFIG_PATH: &str = "./config/docpipe.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub frontmatter: FrontmatterConfig,
    #[serde(default)]
    pub youtrack: YouTrackConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontmatterConfig {
    #[serde(default = "default_docs_root")]
    pub docs_root: PathBuf,
    #[serde(default = "default_schema")]
    pub schema: PathBuf,
    /// Subtrees of `docs_root` that are never validated.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for FrontmatterConfig {
    fn default() -> Self {
        Self {
            docs_root: default_docs_root(),
            schema: default_schema(),
            exclude: default_exclude(),
        }
    }
}

fn default_docs_root() -> PathBuf {
    PathBuf::from("docs")
}
fn default_schema() -> PathBuf {
    PathBuf::from("docs/.frontmatter.schema.json")
}
fn default_exclude() -> Vec<String> {
    vec!["_archive".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct YouTrackConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub root_title: Option<String>,
    #[serde(default)]
    pub title_prefix: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: f64,
}

impl Default for YouTrackConfig {
    fn default() -> Self {
        Self {
            url: None,
            project: None,
            root_title: None,
            title_prefix: None,
            scope: None,
            source: default_source(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_source() -> PathBuf {
    PathBuf::from("build/dokka/gfm")
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_secs() -> f64 {
    1.5
}

pub const DEFAULT_PROJECT: &str = "MP";

/// Upper bound for `youtrack.backoff_secs`.
pub const MAX_BACKOFF_SECS: f64 = 3600.0;

/// How the destination knowledge base is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KbScope {
    /// Project by short name, its embedded knowledge base, then a named
    /// logical root article below the knowledge base's root container.
    Project { short_name: String },
    /// Knowledge base by display name; articles live directly in it.
    KnowledgeBase,
}

impl KbScope {
    fn parse(value: &str, project: String) -> Result<Self> {
        match value {
            "project" => Ok(KbScope::Project {
                short_name: project,
            }),
            "knowledge-base" | "kb" => Ok(KbScope::KnowledgeBase),
            other => Err(PipelineError::config(format!(
                "unknown KB_SCOPE '{}'. Must be project or knowledge-base.",
                other
            ))
            .into()),
        }
    }
}

/// Immutable settings for one `kb-sync` run, built once at startup.
#[derive(Clone)]
pub struct SyncSettings {
    pub base_url: String,
    pub token: String,
    /// Root article title (project scope) or knowledge base name.
    pub root_title: String,
    pub title_prefix: Option<String>,
    pub scope: KbScope,
    pub source: PathBuf,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncSettings")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("root_title", &self.root_title)
            .field("title_prefix", &self.title_prefix)
            .field("scope", &self.scope)
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl SyncSettings {
    /// Overlay the environment onto the `[youtrack]` table.
    ///
    /// `env` is the variable lookup (normally `std::env::var`); empty
    /// values count as unset. `src_override` is the `--src` flag.
    pub fn resolve<F>(config: &YouTrackConfig, src_override: Option<PathBuf>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let root_title = lookup("KB_ROOT_TITLE")
            .or_else(|| config.root_title.clone())
            .ok_or_else(|| PipelineError::config("KB_ROOT_TITLE is not set"))?;

        let token =
            lookup("YT_TOKEN").ok_or_else(|| PipelineError::config("YT_TOKEN is not set"))?;

        let base_url = lookup("YT_URL")
            .or_else(|| config.url.clone())
            .ok_or_else(|| PipelineError::config("YT_URL is not set"))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(PipelineError::config(format!(
                "YT_URL must be an http(s) URL, got '{}'",
                base_url
            ))
            .into());
        }

        let title_prefix = lookup("KB_BC_ROOT").or_else(|| {
            config
                .title_prefix
                .clone()
                .filter(|p| !p.trim().is_empty())
        });

        let project = lookup("YT_PROJECT")
            .or_else(|| config.project.clone())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_string());
        let scope_name = lookup("KB_SCOPE")
            .or_else(|| config.scope.clone())
            .unwrap_or_else(|| "project".to_string());
        let scope = KbScope::parse(&scope_name, project)?;

        if config.max_attempts == 0 {
            return Err(PipelineError::config("youtrack.max_attempts must be >= 1").into());
        }
        if config.timeout_secs == 0 {
            return Err(PipelineError::config("youtrack.timeout_secs must be >= 1").into());
        }
        if !(0.0..=MAX_BACKOFF_SECS).contains(&config.backoff_secs) {
            return Err(PipelineError::config(format!(
                "youtrack.backoff_secs must be between 0 and {}",
                MAX_BACKOFF_SECS
            ))
            .into());
        }
        let step = Duration::try_from_secs_f64(config.backoff_secs)
            .map_err(|e| PipelineError::config(format!("youtrack.backoff_secs: {}", e)))?;

        Ok(Self {
            base_url,
            token,
            root_title,
            title_prefix,
            scope,
            source: src_override.unwrap_or_else(|| config.source.clone()),
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryPolicy::new(config.max_attempts, step),
        })
    }

    /// Resolve against the real process environment.
    pub fn from_env(config: &YouTrackConfig, src_override: Option<PathBuf>) -> Result<Self> {
        Self::resolve(config, src_override, |key| std::env::var(key).ok())
    }
}

/// Load the configuration file.
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
/// read when present and built-in defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(PipelineError::config(format!(
                    "config file not found: {}",
                    p.display()
                ))
                .into());
            }
            p.to_path_buf()
        }
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).map_err(|e| {
        PipelineError::config(format!(
            "failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(config)
}
