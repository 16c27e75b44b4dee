//! Markdown document discovery.
//!
//! Walks `data.dir`, keeps files whose path relative to the directory
//! matches an include glob and no exclude glob, and reads each into a
//! [`Document`]. Globs treat `/` literally, so the default `*.md` only
//! matches top-level files; use `**/*.md` to recurse.

use anyhow::{bail, Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::WalkDir;

use knowledge_rag_core::Document;

use crate::config::DataConfig;

/// Load every matching document, sorted by filename.
pub fn load_documents(data: &DataConfig) -> Result<Vec<Document>> {
    let root = &data.dir;
    if !root.is_dir() {
        bail!("Document directory does not exist: {}", root.display());
    }

    let include_set = build_globset(&data.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string()];
    default_excludes.extend(data.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut documents = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document: {}", path.display()))?;
        debug!(file = %rel_str, bytes = content.len(), "loaded document");

        documents.push(Document::new(
            rel_str,
            path.display().to_string(),
            content,
        ));
    }

    // Sort for deterministic ordering
    documents.sort_by(|a, b| a.filename.cmp(&b.filename));

    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn data_config(dir: &Path) -> DataConfig {
        DataConfig {
            dir: dir.to_path_buf(),
            ..DataConfig::default()
        }
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_loads_top_level_markdown_sorted() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.md", "# Beta\nbody");
        write(tmp.path(), "a.md", "no heading here");
        write(tmp.path(), "notes.txt", "# Not markdown");
        write(tmp.path(), "sub/c.md", "# Nested");

        let docs = load_documents(&data_config(tmp.path())).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert_eq!(docs[0].title, "Untitled");
        assert_eq!(docs[1].title, "Beta");
        assert_eq!(docs[1].content, "# Beta\nbody");
    }

    #[test]
    fn test_recursive_glob_and_excludes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.md", "# A");
        write(tmp.path(), "sub/c.md", "# C");
        write(tmp.path(), "drafts/d.md", "# D");

        let config = DataConfig {
            dir: tmp.path().to_path_buf(),
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec!["drafts/**".to_string()],
        };
        let docs = load_documents(&config).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "sub/c.md"]);
    }

    #[test]
    fn test_empty_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(load_documents(&data_config(tmp.path())).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = load_documents(&data_config(&tmp.path().join("nope"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_invalid_glob() {
        let tmp = TempDir::new().unwrap();
        let config = DataConfig {
            dir: tmp.path().to_path_buf(),
            include_globs: vec!["[".to_string()],
            exclude_globs: vec![],
        };
        assert!(load_documents(&config).is_err());
    }
}
