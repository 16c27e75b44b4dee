//! Word-boundary sliding-window chunker.
//!
//! Splits document text into overlapping windows of at most `chunk_size`
//! characters. A window that would end inside a word is pulled back to the
//! last space in the window, so words are not cut in half unless a single
//! token is longer than the window.
//!
//! Positions are counted in Unicode scalar values, never bytes, so a cut
//! never lands inside a multi-byte UTF-8 sequence.
//!
//! # Algorithm
//!
//! 1. Start with `start = 0`.
//! 2. Propose `end = start + chunk_size`.
//! 3. If `end` is before the end of the text, scan `[start, end)` backward
//!    for a space; if one is found strictly after `start`, cut there.
//! 4. Otherwise, if `end` reaches the end of the text, this is the last window.
//! 5. Emit the window trimmed of whitespace, skipping blank windows.
//! 6. Advance to `end - overlap`. If that would not move past `start` (the
//!    cut landed within `overlap` of `start`), continue from `end` instead.
//!
//! # Example
//!
//! ```rust
//! use knowledge_rag_core::chunk::chunk_text;
//!
//! let chunks = chunk_text("a bcdefghij klmno", 10, 3).unwrap();
//! assert_eq!(chunks, vec!["a", "bcdefghij", "hij klmno"]);
//! ```

use crate::error::ChunkError;
use crate::models::{Chunk, Document};

/// Checks `chunk_size > 0` and `overlap < chunk_size`.
///
/// An overlap as large as the window would stop the cursor from advancing.
pub fn validate_params(chunk_size: usize, overlap: usize) -> Result<(), ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidConfig(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(ChunkError::InvalidConfig(format!(
            "overlap ({}) must be smaller than chunk_size ({})",
            overlap, chunk_size
        )));
    }
    Ok(())
}

/// Compute the raw `(start, end)` character windows, before trimming.
///
/// Windows are half-open and measured in characters. Every window is
/// returned, including ones that are blank after trimming.
pub fn chunk_spans(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<(usize, usize)>, ChunkError> {
    validate_params(chunk_size, overlap)?;

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start + chunk_size;
        let last = end >= len;

        if last {
            end = len;
        } else if let Some(offset) = chars[start..end].iter().rposition(|&c| c == ' ') {
            let space = start + offset;
            if space > start {
                end = space;
            }
        }

        spans.push((start, end));

        if last {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    Ok(spans)
}

/// Split text into trimmed, non-empty, overlapping chunks.
///
/// # Errors
///
/// Returns [`ChunkError::InvalidConfig`] if `chunk_size` is zero or
/// `overlap >= chunk_size`.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkError> {
    let spans = chunk_spans(text, chunk_size, overlap)?;

    // Byte offset of every char boundary, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    Ok(spans
        .into_iter()
        .map(|(s, e)| text[bounds[s]..bounds[e]].trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect())
}

/// Chunk a document's content and number the chunks densely from 0.
pub fn chunk_document(
    doc: &Document,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkError> {
    Ok(chunk_text(&doc.content, chunk_size, overlap)?
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { text, index })
        .collect())
}
