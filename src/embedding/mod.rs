//! Text embedding backends
//!
//! Every vector compared by cosine similarity must come from the same
//! [`Embedder`]. Embedders return raw vectors; normalization is applied by
//! [`crate::index::similarity::l2_normalize`] at both storage and query time.

pub mod engine;
pub mod hashing;

pub use engine::EmbeddingEngine;
pub use hashing::HashingEmbedder;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::errors::{FixError, Result};

/// A fixed embedding model
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Output dimension
    fn dimension(&self) -> usize;

    /// Identifier of the model that produced the vectors
    fn model_id(&self) -> &str;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| FixError::EmbeddingError("embedder returned no vector".to_string()))
    }
}

/// Which embedder implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// BERT sentence encoder run locally through candle
    Candle,
    /// Deterministic feature hashing, no model download
    Hashing,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// HuggingFace model id for the candle backend
    pub model_id: String,
    /// Token limit per text
    pub max_tokens: usize,
    /// Texts embedded per forward pass during indexing
    pub batch_size: usize,
    /// Dimension of the hashing backend
    pub hashing_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Candle,
            model_id: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            max_tokens: 128,
            batch_size: 16,
            hashing_dimension: 512,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(FixError::ConfigError(
                "embedding.batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(FixError::ConfigError(
                "embedding.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.backend == EmbeddingBackend::Hashing && self.hashing_dimension == 0 {
            return Err(FixError::ConfigError(
                "embedding.hashing_dimension must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Construct the configured embedder.
///
/// A model that cannot be loaded is a fatal startup error.
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    config.validate()?;
    match config.backend {
        EmbeddingBackend::Candle => {
            info!(model = %config.model_id, "Loading embedding model");
            let engine = EmbeddingEngine::new(&config.model_id, config.max_tokens)
                .map_err(|e| FixError::EmbeddingError(format!("{:#}", e)))?;
            Ok(Arc::new(engine))
        }
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(config.hashing_dimension))),
    }
}
