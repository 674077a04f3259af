//! Threshold similarity search, one query at a time
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{FixError, Result};
use crate::index::{ScoredDocument, VectorIndex};

/// Search parameters for retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Maximum number of results per query
    pub top_k: usize,
    /// Minimum cosine similarity (inclusive)
    pub threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: 2,
            threshold: 0.3,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(FixError::ConfigError(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(FixError::ConfigError(format!(
                "retrieval.threshold must be within [-1, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Retrieval engine for semantic search
#[derive(Debug, Clone, Default)]
pub struct RetrievalEngine {
    default_params: SearchParams,
}

impl RetrievalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: SearchParams) -> Self {
        Self {
            default_params: params,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.default_params
    }

    /// Retrieve documents matching one query
    pub fn retrieve(&self, index: &VectorIndex, query: &str) -> Result<Vec<ScoredDocument>> {
        self.retrieve_with_params(index, query, &self.default_params)
    }

    pub fn retrieve_with_params(
        &self,
        index: &VectorIndex,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<ScoredDocument>> {
        let results = index.search_with_threshold(query, params.top_k, params.threshold)?;
        if results.is_empty() {
            debug!(error = %FixError::NoRelevantResults(query.to_string()), "Empty result set");
        }
        Ok(results)
    }

    /// One result set per query, in query order
    pub fn retrieve_many(&self, index: &VectorIndex, queries: &[String]) -> Result<Vec<Vec<ScoredDocument>>> {
        queries.iter().map(|query| self.retrieve(index, query)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{ChunkingConfig, Document, Guide, TextChunker};
    use crate::embedding::HashingEmbedder;
    use std::sync::Arc;

    fn index(titles: &[(u64, &str)]) -> VectorIndex {
        let docs: Vec<Document> = titles
            .iter()
            .map(|(id, title)| {
                Document::from_guide(&Guide {
                    guideid: *id,
                    title: title.to_string(),
                    category: String::new(),
                    subject: String::new(),
                    guide_type: String::new(),
                    data_type: String::new(),
                    url: String::new(),
                    summary: None,
                })
            })
            .collect();
        let chunks = TextChunker::new(ChunkingConfig::default()).unwrap().chunk(&docs);
        VectorIndex::build(chunks, Arc::new(HashingEmbedder::new(512)), 8).unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = SearchParams::default();
        assert_eq!(params.top_k, 2);
        assert!((params.threshold - 0.3).abs() < f32::EPSILON);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_invalid_params() {
        assert!(SearchParams { top_k: 0, threshold: 0.3 }.validate().is_err());
        assert!(SearchParams { top_k: 2, threshold: 1.5 }.validate().is_err());
    }

    #[test]
    fn test_retrieve_many_keeps_query_order() {
        let index = index(&[(1, "Battery replacement"), (2, "Screen replacement")]);
        let engine = RetrievalEngine::new();
        let queries = vec!["battery".to_string(), "screen".to_string()];
        let sets = engine.retrieve_many(&index, &queries).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0][0].document.guideid(), Some(1));
        assert_eq!(sets[1][0].document.guideid(), Some(2));
    }

    #[test]
    fn test_higher_threshold_never_grows_results() {
        let index = index(&[(1, "Fan noise"), (2, "Loud fan"), (3, "Fan cleaning")]);
        let engine = RetrievalEngine::new();
        let mut previous = usize::MAX;
        for threshold in [0.0, 0.1, 0.3, 0.5, 0.9] {
            let params = SearchParams { top_k: 3, threshold };
            let count = engine.retrieve_with_params(&index, "fan", &params).unwrap().len();
            assert!(count <= previous);
            previous = count;
        }
    }
}
