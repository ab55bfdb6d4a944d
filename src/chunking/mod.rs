
use tracing::debug;

/// A bounded text segment cut from a source document, ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Identifier of the source document (file name)
    pub source: String,
    /// The chunk text
    pub content: String,
    /// Position of this chunk within the document
    pub chunk_index: usize,
}

/// Split text into fixed-size character windows.
///
/// The window size and overlap are tunables, not a contract; adjacent windows
/// share `overlap` characters so sentences cut at a boundary still appear
/// whole in one of them. Splitting happens on character boundaries, so
/// multi-byte text is safe.
#[inline]
pub fn chunk_text(
    source: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<DocumentChunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if !trimmed.is_empty() {
            chunks.push(DocumentChunk {
                source: source.to_string(),
                content: trimmed.to_string(),
                chunk_index: chunks.len(),
            });
        }

        if end == chars.len() {
            break;
        }
        start += step;
    }

    debug!(
        "Split {} ({} chars) into {} chunks",
        source,
        chars.len(),
        chunks.len()
    );

    chunks
}
