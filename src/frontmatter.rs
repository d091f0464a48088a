//! Frontmatter validation against a JSON Schema.
//!
//! Each Markdown file under the docs root must open with a YAML block
//! fenced by `---` lines. The block is parsed into JSON and validated
//! against one schema loaded at startup. Files are independent: a failure
//! is recorded and the walk continues, and only the aggregate decides the
//! exit code.
//!
//! Output lines carry the `[FM]` tag so CI logs can be grepped:
//!
//! ```text
//! [FM] missing frontmatter: docs/guide.md
//! [FM] invalid frontmatter in docs/api.md: /title: 123 is not of type "string"
//! ```

use anyhow::Result;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::FrontmatterConfig;
use crate::error::PipelineError;
use crate::markdown_fs;

/// Tag prefixed to every validator output line.
pub const TAG: &str = "[FM]";

const DELIMITER: &str = "---";

/// A compiled JSON Schema, loaded once per run.
pub struct SchemaDocument {
    path: PathBuf,
    validator: jsonschema::Validator,
}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDocument")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SchemaDocument {
    pub fn from_value(path: impl Into<PathBuf>, schema: &Value) -> Result<Self> {
        let path = path.into();
        let validator = jsonschema::validator_for(schema).map_err(|e| {
            PipelineError::schema(format!("schema {} is not usable: {}", path.display(), e))
        })?;
        Ok(Self { path, validator })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All violations of `instance`, rendered as `"<pointer>: <message>"`.
    pub fn violations(&self, instance: &Value) -> Vec<String> {
        self.validator
            .iter_errors(instance)
            .map(|err| {
                let pointer = err.instance_path.to_string();
                if pointer.is_empty() {
                    err.to_string()
                } else {
                    format!("{}: {}", pointer, err)
                }
            })
            .collect()
    }
}

/// Read and compile the schema file.
pub fn load_schema(path: &Path) -> Result<SchemaDocument> {
    if !path.is_file() {
        return Err(
            PipelineError::schema(format!("schema not found: {}", path.display())).into(),
        );
    }
    let text = std::fs::read_to_string(path).map_err(|e| {
        PipelineError::schema(format!("cannot read schema {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        PipelineError::schema(format!("schema {} is not valid JSON: {}", path.display(), e))
    })?;
    SchemaDocument::from_value(path, &value)
}

/// The raw YAML between the opening and closing `---` lines.
///
/// The first line must be exactly `---`; the block ends at the next line
/// that is exactly `---`. `\n` and `\r\n` endings are both accepted. A
/// leading byte-order mark is ignored.
pub fn extract_frontmatter(text: &str) -> Option<&str> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix("---\r\n")
        .or_else(|| text.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let bare = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        if bare == DELIMITER {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    None
}

/// Parse a frontmatter body into JSON. Empty (or comment-only) bodies yield `{}`.
pub fn parse_frontmatter(body: &str) -> Result<Value> {
    let blank = body
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_yaml::from_str(body)
        .map_err(|e| anyhow::anyhow!("YAML parse error: {}", e))?;
    Ok(match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Valid,
    MissingFrontmatter,
    /// YAML parse failure, schema violation, or unreadable file.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn is_failure(&self) -> bool {
        self.outcome != FileOutcome::Valid
    }

    /// The `[FM]` output line for a failure; `None` for valid files.
    pub fn failure_line(&self) -> Option<String> {
        match &self.outcome {
            FileOutcome::Valid => None,
            FileOutcome::MissingFrontmatter => Some(format!(
                "{} missing frontmatter: {}",
                TAG,
                self.path.display()
            )),
            FileOutcome::Invalid(error) => Some(format!(
                "{} invalid frontmatter in {}: {}",
                TAG,
                self.path.display(),
                error
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn passed(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| !f.is_failure())
    }

    /// `0` only if no file failed.
    pub fn exit_code(&self) -> u8 {
        if self.failure_count() == 0 {
            0
        } else {
            1
        }
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{} checked {} file(s): {} passed, {} failed",
            TAG,
            self.files.len(),
            self.files.len() - self.failure_count(),
            self.failure_count()
        )
    }
}

/// Validate already-read text.
pub fn validate_text(schema: &SchemaDocument, text: &str) -> FileOutcome {
    let Some(body) = extract_frontmatter(text) else {
        return FileOutcome::MissingFrontmatter;
    };
    let value = match parse_frontmatter(body) {
        Ok(v) => v,
        Err(e) => return FileOutcome::Invalid(e.to_string()),
    };
    let violations = schema.violations(&value);
    if violations.is_empty() {
        FileOutcome::Valid
    } else {
        FileOutcome::Invalid(violations.join("; "))
    }
}

pub fn validate_file(schema: &SchemaDocument, path: &Path) -> FileReport {
    let outcome = match std::fs::read_to_string(path) {
        Ok(text) => validate_text(schema, &text),
        Err(e) => FileOutcome::Invalid(format!("cannot read file: {}", e)),
    };
    FileReport {
        path: path.to_path_buf(),
        outcome,
    }
}

/// Validate every Markdown file under `docs_root` outside `excluded_dirs`.
pub fn validate_tree(
    schema: &SchemaDocument,
    docs_root: &Path,
    excluded_dirs: &[String],
) -> Result<ValidationReport> {
    let paths = markdown_fs::markdown_paths(docs_root, excluded_dirs)?;
    let files = paths
        .iter()
        .map(|path| validate_file(schema, path))
        .collect();
    Ok(ValidationReport { files })
}

/// Entry point for `docpipe frontmatter`: load the schema, walk, print.
pub fn run_validate(config: &FrontmatterConfig) -> Result<ValidationReport> {
    let schema = load_schema(&config.schema)?;
    tracing::debug!(schema = %schema.path().display(), root = %config.docs_root.display(), "validating frontmatter");

    let report = validate_tree(&schema, &config.docs_root, &config.exclude)?;
    for file in &report.files {
        if let Some(line) = file.failure_line() {
            println!("{}", line);
        }
    }
    println!("{}", report.summary_line());
    Ok(report)
}
