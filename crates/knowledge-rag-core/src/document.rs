//! Document construction and Markdown title extraction.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::Document;

/// Title used when a document has no level-1 heading.
pub const UNTITLED: &str = "Untitled";

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?m)^#\s+(.+)$").expect("title pattern is valid"))
}

/// Return the first Markdown level-1 heading in `content`, or `"Untitled"`.
///
/// Lines are scanned top to bottom and the first `# ...` line wins, wherever
/// it appears in the file.
pub fn extract_title(content: &str) -> String {
    title_pattern()
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

impl Document {
    /// Build a document, extracting its title from the content.
    pub fn new(
        filename: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            filename: filename.into(),
            title: extract_title(&content),
            path: path.into(),
            content,
        }
    }
}
