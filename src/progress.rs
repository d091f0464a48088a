//! Sync progress reporting.
//!
//! The syncer narrates what it resolves and touches as [`SyncEvent`]s.
//! The default reporter prints them as `[YT]` lines on stdout so CI logs
//! can be grepped; `--json` switches to one JSON object per line.

use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Tag prefixed to every syncer output line.
pub const TAG: &str = "[YT]";

/// What happened (or, in dry-run, would happen) to one article.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleAction {
    Created,
    Updated,
    WouldCreate,
    WouldUpdate,
}

impl fmt::Display for ArticleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArticleAction::Created => "created",
            ArticleAction::Updated => "updated",
            ArticleAction::WouldCreate => "would create",
            ArticleAction::WouldUpdate => "would update",
        };
        f.write_str(label)
    }
}

/// A single progress event for `kb-sync`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Source directory is absent; the run ends successfully.
    SourceMissing { path: PathBuf },
    ProjectResolved { short_name: String, id: String },
    KnowledgeBaseResolved {
        id: String,
        container_id: Option<String>,
    },
    RootCreated { title: String, id: String },
    RootResolved { title: String, id: String },
    /// Dry-run only: the logical root does not exist yet.
    RootPending { title: String },
    Article { title: String, action: ArticleAction },
    Finished { count: u64, dry_run: bool },
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncEvent::SourceMissing { path } => write!(
                f,
                "{} source not found: {} - nothing to do.",
                TAG,
                path.display()
            ),
            SyncEvent::ProjectResolved { short_name, id } => {
                write!(f, "{} using project {} (id: {})", TAG, short_name, id)
            }
            SyncEvent::KnowledgeBaseResolved { id, container_id } => write!(
                f,
                "{} using knowledge base {}; root container: {}",
                TAG,
                id,
                container_id.as_deref().unwrap_or("none")
            ),
            SyncEvent::RootCreated { title, id } => {
                write!(f, "{} root article created: {} (id: {})", TAG, title, id)
            }
            SyncEvent::RootResolved { title, id } => {
                write!(f, "{} using root article: {} (id: {})", TAG, title, id)
            }
            SyncEvent::RootPending { title } => {
                write!(f, "{} would create root article: {}", TAG, title)
            }
            SyncEvent::Article { title, action } => write!(f, "{} {}: {}", TAG, action, title),
            SyncEvent::Finished { count, dry_run } => {
                if *dry_run {
                    write!(f, "{} dry run: {} article(s) planned.", TAG, count)
                } else {
                    write!(f, "{} done: {} article(s) synchronized.", TAG, count)
                }
            }
        }
    }
}

/// Receives sync events. Implementations decide where they go.
pub trait SyncReporter: Send + Sync {
    fn report(&self, event: SyncEvent);
}

/// `[YT]` lines on stdout.
pub struct StdoutReporter;

impl SyncReporter for StdoutReporter {
    fn report(&self, event: SyncEvent) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", event);
        let _ = out.flush();
    }
}

/// One JSON object per event on stdout.
pub struct JsonReporter;

impl SyncReporter for JsonReporter {
    fn report(&self, event: SyncEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let mut out = std::io::stdout().lock();
            let _ = writeln!(out, "{}", line);
            let _ = out.flush();
        }
    }
}

/// Keeps every event in memory.
#[derive(Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events().iter().map(ToString::to_string).collect()
    }
}

impl SyncReporter for RecordingReporter {
    fn report(&self, event: SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Output mode for `kb-sync`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Human,
    Json,
}

impl ProgressMode {
    pub fn reporter(&self) -> Box<dyn SyncReporter> {
        match self {
            ProgressMode::Human => Box::new(StdoutReporter),
            ProgressMode::Json => Box::new(JsonReporter),
        }
    }
}
