//! Configuration management for fixbuddy
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.fixbuddy/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::corpus::{ChunkingConfig, CorpusConfig};
use crate::embedding::{EmbeddingBackend, EmbeddingConfig};
use crate::enrichment::EnrichmentConfig;
use crate::errors::{FixError, Result};
use crate::rag::{ExpansionConfig, IndexSettings, OllamaQueryExpander, RetrievalConfig, RetrievalPipeline};
use crate::recommend::RecommenderConfig;
use crate::telemetry::TelemetryConfig;

/// Complete configuration for fixbuddy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub recommender: RecommenderConfig,
    pub enrichment: EnrichmentConfig,
    pub expansion: ExpansionConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FixError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| FixError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Default file location, if a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fixbuddy").join("config.toml"))
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.embedding.validate()?;
        self.retrieval.search.validate()?;
        self.enrichment.validate()?;
        self.expansion.validate()?;
        self.telemetry.validate()?;

        if self.recommender.top_n == 0 {
            return Err(FixError::ConfigError(
                "recommender.top_n must be greater than 0".to_string(),
            ));
        }

        if let Some(threshold) = self.recommender.similarity_threshold {
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(FixError::ConfigError(format!(
                    "recommender.similarity_threshold must be within [-1, 1], got {}",
                    threshold
                )));
            }
        }

        if self.retrieval.context.separator.is_empty() {
            return Err(FixError::ConfigError(
                "retrieval.context.separator must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FixError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FixError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| FixError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &Path) -> PathBuf {
        if let Ok(rest) = path.strip_prefix("~") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        path.to_path_buf()
    }

    /// Switch to the self-contained setup: hashing embedder, no remote calls
    pub fn apply_offline(&mut self) {
        self.embedding.backend = EmbeddingBackend::Hashing;
        self.expansion.enabled = false;
        self.enrichment.enabled = false;
    }

    /// Index build inputs with paths expanded
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            corpus: CorpusConfig {
                guides_path: Self::expand_path(&self.corpus.guides_path),
                posts_path: Self::expand_path(&self.corpus.posts_path),
            },
            chunking: self.chunking.clone(),
            batch_size: self.embedding.batch_size,
            recommender: RecommenderConfig {
                embeddings_path: self
                    .recommender
                    .embeddings_path
                    .as_deref()
                    .map(Self::expand_path),
                ..self.recommender.clone()
            },
        }
    }

    /// Query pipeline wired with the enabled remote collaborators
    pub fn pipeline(&self) -> Result<RetrievalPipeline> {
        let mut pipeline = RetrievalPipeline::new(self.retrieval.clone());

        if self.expansion.enabled {
            let expander = OllamaQueryExpander::new(&self.expansion)?;
            pipeline = pipeline.with_expander(Arc::new(expander), self.expansion.timeout());
        }

        if let Some(enricher) = self.enrichment.build()? {
            pipeline = pipeline.with_enricher(enricher);
        }

        Ok(pipeline)
    }
}
