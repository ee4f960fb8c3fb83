//! Fixed-size text chunker with overlap.
//!
//! Splits page text into windows of `chunk_size` characters, advancing
//! the cursor by `chunk_size - overlap` so that consecutive chunks share
//! an `overlap`-character prefix/suffix. All sizes and recorded offsets
//! are in characters, not bytes, so multi-byte UTF-8 text never splits
//! inside a code point.
//!
//! # Algorithm
//!
//! 1. Empty or whitespace-only text yields no chunks.
//! 2. While the cursor is inside the text, emit a window of
//!    `min(chunk_size, remaining)` characters as one chunk.
//! 3. Record the window's `start_index`/`end_index` char offsets in the
//!    chunk metadata and assign the next page-local `chunk_index`.
//! 4. Advance the cursor by `chunk_size - overlap`.
//!
//! The final chunk may be shorter than `chunk_size`; it is still
//! emitted. `overlap >= chunk_size` would keep the cursor from ever
//! advancing, so it is rejected when the chunker is constructed.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::RagError;
use crate::models::DocumentChunk;

/// Default chunk window, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_OVERLAP: usize = 50;

/// Splits text into fixed-size overlapping [`DocumentChunk`]s.
///
/// Pure segmentation: no embedding is attached here and no I/O happens.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker, rejecting configurations where the cursor
    /// could never advance.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be > 0".into()));
        }
        if overlap >= chunk_size {
            return Err(RagError::Configuration(format!(
                "overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk one page of text.
    ///
    /// Returns an empty Vec for empty or whitespace-only input. Chunk
    /// indices are page-local: they restart at 0 for every page.
    pub fn chunk_text(
        &self,
        text: &str,
        document_id: &str,
        page_number: i64,
    ) -> Vec<DocumentChunk> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        // Char-offset → byte-offset table, so windows slice on
        // character boundaries.
        let byte_offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total_chars = byte_offsets.len();
        let step = self.chunk_size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut chunk_index: i64 = 0;

        while start < total_chars {
            let end = (start + self.chunk_size).min(total_chars);
            let byte_start = byte_offsets[start];
            let byte_end = if end == total_chars {
                text.len()
            } else {
                byte_offsets[end]
            };

            let mut metadata = HashMap::new();
            metadata.insert("start_index".to_string(), serde_json::json!(start));
            metadata.insert("end_index".to_string(), serde_json::json!(end));

            chunks.push(DocumentChunk {
                id: Uuid::new_v4().to_string(),
                document_id: document_id.to_string(),
                text: text[byte_start..byte_end].to_string(),
                chunk_index,
                page_number,
                embedding: None,
                metadata,
            });

            chunk_index += 1;
            start += step;
        }

        chunks
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_index(chunk: &DocumentChunk) -> usize {
        chunk.metadata["start_index"].as_u64().unwrap() as usize
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = TextChunker::new(500, 50).unwrap();
        assert!(chunker.chunk_text("", "doc1", 1).is_empty());
        assert!(chunker.chunk_text("   \n\t  ", "doc1", 1).is_empty());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            TextChunker::new(100, 100),
            Err(RagError::Configuration(_))
        ));
        assert!(matches!(
            TextChunker::new(100, 150),
            Err(RagError::Configuration(_))
        ));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn short_text_is_a_single_partial_chunk() {
        let chunker = TextChunker::new(500, 50).unwrap();
        let chunks = chunker.chunk_text("hello world", "doc1", 1);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].page_number, 1);
        assert_eq!(start_index(&chunks[0]), 0);
        assert_eq!(chunks[0].metadata["end_index"].as_u64().unwrap(), 11);
    }

    #[test]
    fn twelve_hundred_chars_make_three_chunks() {
        // chunk_size=500, overlap=50 → start offsets 0, 450, 900, with
        // the last chunk 300 chars long.
        let chunker = TextChunker::new(500, 50).unwrap();
        let text = "a".repeat(1200);
        let chunks = chunker.chunk_text(&text, "doc1", 1);

        assert_eq!(chunks.len(), 3);
        assert_eq!(start_index(&chunks[0]), 0);
        assert_eq!(start_index(&chunks[1]), 450);
        assert_eq!(start_index(&chunks[2]), 900);
        assert_eq!(chunks[0].text.chars().count(), 500);
        assert_eq!(chunks[1].text.chars().count(), 500);
        assert_eq!(chunks[2].text.chars().count(), 300);
    }

    #[test]
    fn chunk_indices_are_contiguous_from_zero() {
        let chunker = TextChunker::new(40, 10).unwrap();
        let text: String = ('a'..='z').cycle().take(400).collect();
        let chunks = chunker.chunk_text(&text, "doc1", 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as i64);
            assert_eq!(chunk.page_number, 2);
        }
    }

    #[test]
    fn dropping_overlap_prefixes_reconstructs_the_text() {
        let chunker = TextChunker::new(100, 25).unwrap();
        let text: String = "The quick brown fox jumps over the lazy dog. "
            .chars()
            .cycle()
            .take(1337)
            .collect();
        let chunks = chunker.chunk_text(&text, "doc1", 1);

        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(&chunk.text);
            } else {
                rebuilt.extend(chunk.text.chars().skip(chunker.overlap()));
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let chunker = TextChunker::new(10, 2).unwrap();
        let text = "héllø wörld ← über ↑ naïve æther ✓ done".repeat(4);
        let chunks = chunker.chunk_text(&text, "doc1", 1);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 10);
        }
    }
}
