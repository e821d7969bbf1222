//! Text extraction
//!
//! Turns a stored upload into page-addressable text blocks carrying a
//! `source` attribute (the file's basename). Only plain-text formats are
//! extracted in-process; binary formats need tooling the service does not
//! ship and fail with `Unsupported`.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DocentError, Result};

/// Extensions extracted as plain text
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "csv"];

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("static regex is valid"));

/// One extracted block of document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedBlock {
    /// Normalized text content
    pub content: String,
    /// Basename of the originating file
    pub source: String,
    /// Zero-based page number within the file
    pub page: usize,
}

/// Extract the text blocks of a stored document.
///
/// Dispatches on the file extension; unsupported formats fail with
/// [`DocentError::Unsupported`]. Empty blocks are dropped.
pub async fn extract_blocks(path: &Path) -> Result<Vec<ExtractedBlock>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
        return Err(DocentError::Unsupported(if extension.is_empty() {
            "missing file extension".to_string()
        } else {
            extension
        }));
    }

    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DocentError::Extract(format!("Failed to read {}: {e}", path.display())))?;

    let content = normalize_text(&raw);
    if content.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![ExtractedBlock {
        content,
        source,
        page: 0,
    }])
}

/// Collapse runs of blank lines to a single blank line and trim the ends.
fn normalize_text(raw: &str) -> String {
    BLANK_LINES.replace_all(raw, "\n\n").trim().to_string()
}
