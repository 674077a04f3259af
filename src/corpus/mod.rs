//! Knowledge corpus: repair guides and forum posts
//!
//! Components:
//! - Loader: soft-failing JSON ingestion of guides and posts
//! - Document: typed retrieval unit with per-source metadata
//! - Chunker: bounded, overlapping segmentation

pub mod chunker;
pub mod document;
pub mod loader;

pub use chunker::{Chunk, ChunkingConfig, TextChunker};
pub use document::{DedupKey, Document, GuideMetadata, Metadata, PostMetadata, SourceKind};
pub use loader::{load_guides, load_posts, Guide, Post};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the corpus files live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub guides_path: PathBuf,
    pub posts_path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            guides_path: PathBuf::from("data/guides.json"),
            posts_path: PathBuf::from("data/techsupport_posts.json"),
        }
    }
}

/// Both source collections, loaded once per index build
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub guides: Vec<Guide>,
    pub posts: Vec<Post>,
}

impl Corpus {
    /// Load both collections; missing files degrade to empty collections
    pub fn load(config: &CorpusConfig) -> Self {
        Self {
            guides: load_guides(&config.guides_path),
            posts: load_posts(&config.posts_path),
        }
    }

    /// One document per source record, posts first
    pub fn documents(&self) -> Vec<Document> {
        self.posts
            .iter()
            .map(Document::from_post)
            .chain(self.guides.iter().map(Document::from_guide))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.guides.is_empty() && self.posts.is_empty()
    }
}
