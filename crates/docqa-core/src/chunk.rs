//! Text chunkers.
//!
//! Splits cleaned document text into an ordered, non-empty sequence of
//! chunk strings. Sizes are measured in characters.
//!
//! # Strategies
//!
//! - **Fixed**: a sliding window of `chunk_size` characters advanced by
//!   `chunk_size - chunk_overlap`. The last window is the first one that
//!   reaches the end of the text, so `L > S` yields exactly
//!   `ceil((L - O) / (S - O))` chunks and stitching the chunks back
//!   together (dropping the `O`-character overlap of each successor)
//!   reproduces the input.
//! - **Recursive**: tries paragraph (`\n\n`), line (`\n`), word (` `), then
//!   character boundaries. Pieces under the size budget are merged greedily
//!   and each new chunk starts with up to `chunk_overlap` characters carried
//!   from the previous one. Oversized pieces are split again with the next
//!   separator. Separators stay attached to the start of the following
//!   piece.
//!
//! Text no longer than `chunk_size` always yields one chunk equal to the
//! trimmed input.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::{chunk_text, ChunkingParams};
//! use docqa_core::models::ChunkingStrategy;
//!
//! let params = ChunkingParams::new(500, 50);
//! let chunks = chunk_text("Hello world.\n\nSecond paragraph.", ChunkingStrategy::Recursive, &params).unwrap();
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! ```

use std::collections::VecDeque;

use chrono::Utc;

use crate::error::{RagError, Result};
use crate::models::{Chunk, ChunkingStrategy};
use crate::text::char_len;

/// Separators tried by the recursive strategy, in priority order. The empty
/// separator splits into single characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Chunk size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingParams {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Overlap must stay below the size or the window never advances.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ChunkingFailed(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::ChunkingFailed(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self::new(500, 50)
    }
}

/// Split `text` with the given strategy.
///
/// Fails with [`RagError::ChunkingFailed`] on invalid parameters or blank
/// text.
pub fn chunk_text(
    text: &str,
    strategy: ChunkingStrategy,
    params: &ChunkingParams,
) -> Result<Vec<String>> {
    params.validate()?;

    if text.trim().is_empty() {
        return Err(RagError::ChunkingFailed("no text to chunk".to_string()));
    }

    if char_len(text) <= params.chunk_size {
        return Ok(vec![text.trim().to_string()]);
    }

    let chunks = match strategy {
        ChunkingStrategy::Fixed => chunk_fixed(text, params),
        ChunkingStrategy::Recursive => RecursiveSplitter::new(params).split_text(text),
    };

    if chunks.is_empty() {
        return Err(RagError::ChunkingFailed(
            "splitter produced no chunks".to_string(),
        ));
    }
    Ok(chunks)
}

/// Resolve a strategy by name and split. Unknown names fail with
/// [`RagError::ChunkingFailed`].
pub fn chunk_text_named(text: &str, strategy: &str, params: &ChunkingParams) -> Result<Vec<String>> {
    let strategy: ChunkingStrategy = strategy.parse()?;
    chunk_text(text, strategy, params)
}

fn chunk_fixed(text: &str, params: &ChunkingParams) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = params.chunk_size - params.chunk_overlap;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + params.chunk_size).min(chars.len());
        let slice: String = chars[start..end].iter().collect();
        chunks.push(slice.trim().to_string());
        if end >= chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    fn new(params: &ChunkingParams) -> Self {
        Self {
            chunk_size: params.chunk_size,
            chunk_overlap: params.chunk_overlap,
        }
    }

    fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = sep;
                break;
            }
            if text.contains(sep) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_with(&piece, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }
        chunks
    }

    /// Greedily pack pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut out, &window);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        push_joined(&mut out, &window);
        out
    }
}

fn push_joined(out: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split on `separator`, keeping each separator at the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(text[start..idx].to_string());
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(text[start..].to_string());
    }
    pieces
}

/// Wrap chunk strings into [`Chunk`] records with contiguous indices.
pub fn make_chunks(document_id: &str, texts: &[String]) -> Vec<Chunk> {
    let now = Utc::now();
    texts
        .iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            document_id: document_id.to_string(),
            chunk_index: index,
            text: text.clone(),
            created_at: now,
        })
        .collect()
}
