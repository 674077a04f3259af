//! Overlapping character-window chunking
//!
//! Long documents are split into windows of at most `max_chars` characters.
//! Consecutive windows share `overlap_chars` characters so that a sentence cut
//! at one boundary is still whole in the neighbouring chunk. A window prefers
//! to end right after whitespace found in its second half.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::document::Document;
use crate::errors::{FixError, Result};

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    pub max_chars: usize,
    /// Characters shared by consecutive chunks
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1000,
            overlap_chars: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(FixError::ConfigError(
                "chunking.max_chars must be greater than 0".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(FixError::ConfigError(
                "chunking.overlap_chars must be less than max_chars".to_string(),
            ));
        }
        Ok(())
    }
}

/// A bounded segment of exactly one source document
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document: Document,
    /// Position of this segment within its source document
    pub chunk_index: usize,
}

/// Splits documents into overlapping chunks
#[derive(Debug, Clone)]
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Character spans (in `char` positions) covering `text`
    pub fn split_spans(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let max = self.config.max_chars;

        if total <= max {
            return vec![0..total];
        }

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = (start + max).min(total);
            let end = if hard_end == total {
                total
            } else {
                let floor = start + max / 2;
                (floor + 1..=hard_end)
                    .rev()
                    .find(|&pos| chars[pos - 1].is_whitespace())
                    .unwrap_or(hard_end)
            };

            spans.push(start..end);
            if end == total {
                break;
            }
            start = end.saturating_sub(self.config.overlap_chars).max(start + 1);
        }

        spans
    }

    /// Split raw text into chunk strings
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let spans = self.split_spans(text);
        if spans.len() == 1 {
            return vec![text.to_string()];
        }

        // byte offset of every char position, plus the end
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();

        spans
            .into_iter()
            .map(|span| text[offsets[span.start]..offsets[span.end]].to_string())
            .collect()
    }

    /// Chunk every document; metadata is copied unchanged into each chunk
    pub fn chunk(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|document| {
                self.split_text(&document.content)
                    .into_iter()
                    .enumerate()
                    .map(move |(chunk_index, content)| Chunk {
                        document: Document {
                            content,
                            metadata: document.metadata.clone(),
                        },
                        chunk_index,
                    })
            })
            .collect()
    }
}
