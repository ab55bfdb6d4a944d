
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::ChatError;

/// File extensions the indexer recognizes as source documents
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Whether the path carries a recognized document extension
#[inline]
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Extract the plain text content of a source document.
///
/// Fails on unsupported extensions, unreadable files and files that contain
/// no extractable text.
#[inline]
pub fn extract_text(path: &Path) -> Result<String, ChatError> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let text = match extension.as_str() {
        "pdf" => pdf_extract::extract_text(path).map_err(|e| {
            ChatError::Extraction(format!("Failed to extract {}: {}", path.display(), e))
        })?,
        "txt" | "md" => fs::read_to_string(path).map_err(|e| {
            ChatError::Extraction(format!("Failed to read {}: {}", path.display(), e))
        })?,
        _ => {
            return Err(ChatError::Extraction(format!(
                "Unsupported file type: {}",
                path.display()
            )));
        }
    };

    if text.trim().is_empty() {
        return Err(ChatError::Extraction(format!(
            "No text content in {}",
            path.display()
        )));
    }

    debug!(
        "Extracted {} characters from {}",
        text.len(),
        path.display()
    );

    Ok(text)
}
