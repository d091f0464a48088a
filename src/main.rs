//! # Docs Pipeline CLI (`docpipe`)
//!
//! Pipeline steps for documentation publishing. Each command prints
//! tagged result lines on stdout and exits with a status CI can act on.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docpipe frontmatter` | Validate Markdown frontmatter against the JSON Schema |
//! | `docpipe kb-sync` | Mirror generated Markdown into a YouTrack knowledge base |
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | `0` | Success, or nothing to sync |
//! | `1` | Validation failures, API failures, missing project / KB / schema |
//! | `2` | Missing or invalid configuration |
//!
//! ## Examples
//!
//! ```bash
//! # Validate docs/ with docs/.frontmatter.schema.json
//! docpipe frontmatter
//!
//! # Sync Dokka output below the "API Docs" root article of project MP
//! YT_URL=https://yt.example.com YT_TOKEN=perm:... KB_ROOT_TITLE="API Docs" \
//!   docpipe kb-sync --src build/dokka/gfm
//!
//! # Show what would change without writing
//! docpipe kb-sync --dry-run
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docs_pipeline::config::{self, Config, SyncSettings};
use docs_pipeline::error;
use docs_pipeline::frontmatter;
use docs_pipeline::progress::{self, ProgressMode};
use docs_pipeline::sync;
use docs_pipeline::youtrack::YouTrackClient;

/// Documentation pipeline steps: frontmatter validation and knowledge-base sync.
#[derive(Parser)]
#[command(
    name = "docpipe",
    about = "Documentation pipeline steps: frontmatter validation and knowledge-base sync",
    version
)]
struct Cli {
    /// Path to a TOML configuration file.
    ///
    /// Defaults to `./config/docpipe.toml` when that file exists; built-in
    /// defaults apply otherwise. Environment variables override the file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate Markdown frontmatter against a JSON Schema.
    ///
    /// Every `*.md` file under the docs root must start with a `---`
    /// delimited YAML block that satisfies the schema. All failures are
    /// reported; the exit code is 1 if any file failed.
    Frontmatter {
        /// Documentation root (default: `docs`).
        #[arg(long)]
        docs: Option<PathBuf>,

        /// JSON Schema file (default: `docs/.frontmatter.schema.json`).
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Subdirectory of the docs root to skip. Repeatable; replaces the
        /// configured list when given.
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Mirror Markdown files into a YouTrack knowledge base.
    ///
    /// Reads `YT_URL`, `YT_TOKEN` and `KB_ROOT_TITLE` (required) and
    /// `KB_BC_ROOT`, `YT_PROJECT`, `KB_SCOPE` (optional) from the
    /// environment. Each file becomes an article titled after its
    /// relative path; existing articles are updated in place.
    KbSync {
        /// Source directory of generated Markdown (default: `build/dokka/gfm`).
        #[arg(long)]
        src: Option<PathBuf>,

        /// Resolve and compare, but do not create or update anything.
        #[arg(long)]
        dry_run: bool,

        /// Emit progress as JSON lines instead of `[YT]` lines.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOCPIPE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Frontmatter {
            docs,
            schema,
            exclude,
        } => {
            let result = config::load_config(cli.config.as_deref()).and_then(|cfg| {
                let mut settings = cfg.frontmatter;
                if let Some(docs) = docs {
                    settings.docs_root = docs;
                }
                if let Some(schema) = schema {
                    settings.schema = schema;
                }
                if !exclude.is_empty() {
                    settings.exclude = exclude;
                }
                frontmatter::run_validate(&settings)
            });
            match result {
                Ok(report) => ExitCode::from(report.exit_code()),
                Err(e) => fail(frontmatter::TAG, &e),
            }
        }
        Commands::KbSync { src, dry_run, json } => {
            let mode = if json {
                ProgressMode::Json
            } else {
                ProgressMode::Human
            };
            match run_kb_sync(cli.config, src, dry_run, mode).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => fail(progress::TAG, &e),
            }
        }
    }
}

async fn run_kb_sync(
    config_path: Option<PathBuf>,
    src: Option<PathBuf>,
    dry_run: bool,
    mode: ProgressMode,
) -> anyhow::Result<()> {
    let cfg: Config = config::load_config(config_path.as_deref())?;
    let settings = SyncSettings::from_env(&cfg.youtrack, src)?;
    tracing::debug!(?settings, "sync settings");

    let client = YouTrackClient::from_settings(&settings)?;
    let reporter = mode.reporter();
    sync::run_sync(&client, &settings, dry_run, reporter.as_ref()).await?;
    Ok(())
}

fn fail(tag: &str, err: &anyhow::Error) -> ExitCode {
    println!("{} {:#}", tag, err);
    ExitCode::from(error::exit_code(err))
}
