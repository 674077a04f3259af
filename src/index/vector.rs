//! Exact nearest-neighbour index over embedded chunks
//!
//! The index is built once from the full chunk list and is immutable
//! afterwards, so it can be shared behind an `Arc` and queried concurrently.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::similarity::{cosine_similarities, l2_normalize, rank_top_n};
use crate::corpus::{Chunk, Document};
use crate::embedding::Embedder;
use crate::errors::{FixError, Result};

/// A document returned by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
}

/// Vector index over corpus chunks
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    /// L2-normalized, parallel to `chunks`
    vectors: Vec<Vec<f32>>,
    embedder: Arc<dyn Embedder>,
}

impl VectorIndex {
    /// Embed every chunk and build the index
    pub fn build(chunks: Vec<Chunk>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        let started = Instant::now();
        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.document.content.as_str()).collect();
            let embedded = embedder.embed_batch(&texts)?;
            if embedded.len() != texts.len() {
                return Err(FixError::EmbeddingError(format!(
                    "expected {} vectors, embedder returned {}",
                    texts.len(),
                    embedded.len()
                )));
            }
            for mut vector in embedded {
                if vector.len() != embedder.dimension() {
                    return Err(FixError::EmbeddingError(format!(
                        "vector dimension {} does not match model dimension {}",
                        vector.len(),
                        embedder.dimension()
                    )));
                }
                l2_normalize(&mut vector);
                vectors.push(vector);
            }
        }

        info!(
            chunks = chunks.len(),
            model = embedder.model_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vector index built"
        );

        Ok(Self {
            chunks,
            vectors,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Top-k chunks for a raw query vector of the index dimension
    pub fn search_vector(&self, query: &[f32], top_k: usize, threshold: Option<f32>) -> Result<Vec<ScoredDocument>> {
        if query.len() != self.dimension() {
            return Err(FixError::EmbeddingError(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension()
            )));
        }
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let scores = cosine_similarities(query, &self.vectors);
        Ok(rank_top_n(&scores, top_k, threshold)
            .into_iter()
            .map(|(idx, score)| ScoredDocument {
                document: self.chunks[idx].document.clone(),
                score,
            })
            .collect())
    }

    /// Plain top-k similarity search
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query)?;
        self.search_vector(&vector, top_k, None)
    }

    /// Top-k search keeping only neighbours whose similarity reaches `threshold`.
    ///
    /// An empty result means nothing in the corpus is relevant enough.
    pub fn search_with_threshold(&self, query: &str, top_k: usize, threshold: f32) -> Result<Vec<ScoredDocument>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query)?;
        let results = self.search_vector(&vector, top_k, Some(threshold))?;
        debug!(query, hits = results.len(), threshold, "Threshold search");
        Ok(results)
    }
}
