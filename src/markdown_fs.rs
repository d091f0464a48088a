use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};
use walkdir::WalkDir;

use crate::models::LocalDocument;

const DEFAULT_EXCLUDES: [&str; 2] = ["**/.git/**", "**/node_modules/**"];

/// Every `*.md` file under `root`, sorted by relative path.
///
/// `excluded_dirs` are subtrees relative to `root` (e.g. `"_archive"`);
/// nothing below them is returned. An unreadable file is an error.
pub fn scan_markdown(root: &Path, excluded_dirs: &[String]) -> Result<Vec<LocalDocument>> {
    let mut documents = Vec::new();
    for path in markdown_paths(root, excluded_dirs)? {
        documents.push(read_document(root, &path)?);
    }
    Ok(documents)
}

/// Paths of the files [`scan_markdown`] would read, without reading them.
pub fn markdown_paths(root: &Path, excluded_dirs: &[String]) -> Result<Vec<std::path::PathBuf>> {
    if !root.is_dir() {
        bail!("Markdown root does not exist: {}", root.display());
    }

    let include_set = build_globset(&["**/*.md".to_string()])?;

    let mut excludes: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    for dir in excluded_dirs {
        let dir = dir.trim_matches('/');
        if !dir.is_empty() {
            excludes.push(format!("{}/**", dir));
        }
    }
    let exclude_set = build_globset(&excludes)?;

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative_segments(relative).join("/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        paths.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    paths.sort_by_key(|p| relative_segments(p.strip_prefix(root).unwrap_or(p)));

    Ok(paths)
}

/// Read one file under `root` into a [`LocalDocument`].
pub fn read_document(root: &Path, path: &Path) -> Result<LocalDocument> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    Ok(LocalDocument {
        path: path.to_path_buf(),
        segments: relative_segments(relative),
        content,
    })
}

fn relative_segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
