//! # Docs Pipeline
//!
//! Documentation-publishing pipeline steps for CI.
//!
//! Two independent tools share one binary (`docpipe`):
//!
//! - **Frontmatter validation**: every Markdown file under `docs/` must
//!   open with a YAML block that satisfies a JSON Schema.
//! - **Knowledge-base sync**: generated Markdown (e.g. Dokka GFM output)
//!   is mirrored one-way into a YouTrack knowledge base, one article per
//!   file, matched by a title derived from the file's relative path.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ markdown_fs │──▶│ frontmatter │──▶│ [FM] report  │
//! │  (walkdir)  │   └─────────────┘   └──────────────┘
//! │             │   ┌─────────────┐   ┌──────────────┐
//! │             │──▶│ sync        │──▶│ YouTrack API │
//! └─────────────┘   │ + resolve   │   │ (http retry) │
//!                   └─────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docpipe frontmatter                      # validate docs/ against the schema
//! YT_URL=... YT_TOKEN=... KB_ROOT_TITLE="API Docs" \
//!   docpipe kb-sync --src build/dokka/gfm  # mirror generated docs
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overlay |
//! | [`error`] | Error kinds and exit codes |
//! | [`models`] | Local documents, remote DTOs, title derivation |
//! | [`markdown_fs`] | Markdown discovery |
//! | [`frontmatter`] | Frontmatter extraction and schema validation |
//! | [`http`] | Authenticated JSON client with retry |
//! | [`traits`] | Knowledge-base capability interface |
//! | [`youtrack`] | YouTrack REST implementation |
//! | [`resolve`] | Knowledge base and root resolution |
//! | [`sync`] | Create-or-update reconciliation |
//! | [`progress`] | Sync progress reporting |

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod http;
pub mod markdown_fs;
pub mod models;
pub mod progress;
pub mod resolve;
pub mod sync;
pub mod traits;
pub mod youtrack;
