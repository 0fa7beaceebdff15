
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::DocumentFormat;

/// Configuration for document chunking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Lines per chunk for line-oriented documents
    pub max_lines: usize,
    /// Lines shared between consecutive line-oriented chunks
    pub line_overlap: usize,
    /// Character budget per chunk for paragraph-oriented documents
    pub max_chars: usize,
    /// Characters carried from an overflowing paragraph into the next chunk
    pub char_overlap: usize,
    /// Minimum trimmed line length kept from extracted page text
    pub min_line_chars: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_lines: 20,
            line_overlap: 5,
            max_chars: 1000,
            char_overlap: 100,
            min_line_chars: 20,
        }
    }
}

/// Split a document's text into an ordered sequence of non-empty chunks.
///
/// The strategy is selected by the document's format: source code is windowed
/// by lines with overlap, prose accumulates paragraphs up to a character
/// budget, and extracted page text keeps individual lines above a minimum
/// length. Whitespace-only input yields no chunks for every strategy.
#[inline]
pub fn chunk_document(format: DocumentFormat, text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunks = match format {
        DocumentFormat::Code => chunk_lines(text, config.max_lines, config.line_overlap),
        DocumentFormat::PlainText | DocumentFormat::Docx => {
            chunk_paragraphs(text, config.max_chars, config.char_overlap)
        }
        DocumentFormat::Pdf => chunk_filtered_lines(text, config.min_line_chars),
    };

    debug!("Chunked {} chars into {} chunks", text.len(), chunks.len());
    chunks
}

/// Sliding line windows of `max_lines` lines, advancing `max_lines - overlap`
/// lines per step so consecutive chunks share `overlap` lines of context. The
/// final partial window is emitted even when shorter than `max_lines`.
fn chunk_lines(text: &str, max_lines: usize, overlap: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    // Guarded by config validation; fall back to whole-file steps if violated.
    let stride = max_lines.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < lines.len() {
        let end = (start + max_lines).min(lines.len());
        let chunk = lines[start..end].join("\n");
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        start += stride;
    }
    chunks
}

/// Greedy paragraph accumulation up to `max_chars`. When the next paragraph
/// would overflow the buffer, the buffer is closed as a chunk and the next
/// buffer is seeded with the last `overlap` characters of the overflowing
/// paragraph; the rest of that paragraph is dropped.
fn chunk_paragraphs(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for para in text.split("\n\n") {
        if buffer.len() + para.len() < max_chars {
            buffer.push_str("\n\n");
            buffer.push_str(para);
        } else {
            let closed = buffer.trim();
            if !closed.is_empty() {
                chunks.push(closed.to_string());
            }
            buffer = tail_chars(para, overlap);
        }
    }

    let last = buffer.trim();
    if !last.is_empty() {
        chunks.push(last.to_string());
    }
    chunks
}

/// Keep each line whose trimmed length exceeds `min_chars` as its own chunk.
fn chunk_filtered_lines(text: &str, min_chars: usize) -> Vec<String> {
    text.split('\n')
        .map(str::trim)
        .filter(|line| line.chars().count() > min_chars)
        .map(str::to_string)
        .collect()
}

/// The last `n` characters of `s`, on char boundaries.
fn tail_chars(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let total = s.chars().count();
    s.chars().skip(total.saturating_sub(n)).collect()
}
