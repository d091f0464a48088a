//! Error kinds that decide the process exit code.
//!
//! Library code returns `anyhow::Result` throughout; the variants here are
//! attached where the failure category matters to the operator (a CI step
//! distinguishes "fix your configuration" from "the remote API refused").
//! The binary calls [`exit_code`] on whatever error bubbles up.

use thiserror::Error;

/// Maximum number of response-body characters surfaced in an API failure.
pub const MAX_BODY_CHARS: usize = 400;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or invalid configuration (environment, TOML, CLI).
    #[error("{0}")]
    Config(String),

    /// The frontmatter schema is missing, unreadable, or not a usable JSON Schema.
    #[error("{0}")]
    Schema(String),

    /// A remote call returned a non-2xx status after retries.
    #[error("{operation} failed: HTTP {status} {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// A configured project, knowledge base, or root article does not exist.
    #[error("{0}")]
    NotFound(String),
}

impl PipelineError {
    pub fn config(msg: impl Into<String>) -> Self {
        PipelineError::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        PipelineError::Schema(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        PipelineError::NotFound(msg.into())
    }

    /// Build an API failure, truncating the body to [`MAX_BODY_CHARS`].
    pub fn api(operation: impl Into<String>, status: u16, body: &str) -> Self {
        PipelineError::Api {
            operation: operation.into(),
            status,
            body: truncate_chars(body, MAX_BODY_CHARS),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Schema(_) | PipelineError::Api { .. } | PipelineError::NotFound(_) => 1,
        }
    }
}

/// Exit code for an arbitrary error: the first [`PipelineError`] in the
/// chain decides, anything else (I/O, transport) is a plain failure.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}

/// Truncate on character (not byte) boundaries.
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
