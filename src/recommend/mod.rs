//! Standalone guide recommendation
//!
//! Scores a question against pre-embedded guide titles with cosine similarity
//! and returns the best guides, without query expansion or enrichment.

pub mod preprocessing;
pub mod store;

pub use preprocessing::preprocess_text;
pub use store::GuideEmbeddings;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::corpus::Guide;
use crate::embedding::Embedder;
use crate::errors::{FixError, Result};
use crate::index::similarity::{cosine_similarities, rank_top_n};

/// Recommendation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Maximum guides returned
    pub top_n: usize,
    /// Minimum similarity a guide must reach (None = no floor)
    pub similarity_threshold: Option<f32>,
    /// Cache file for guide embeddings (None = always recompute)
    pub embeddings_path: Option<PathBuf>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_n: 3,
            similarity_threshold: None,
            embeddings_path: None,
        }
    }
}

/// A recommended guide with its similarity to the question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideMatch {
    pub guide: Guide,
    pub score: f32,
}

/// Guide recommender over a fixed guide list
pub struct GuideRecommender {
    guides: Vec<Guide>,
    embeddings: GuideEmbeddings,
    embedder: Arc<dyn Embedder>,
}

impl GuideRecommender {
    /// Build from guides, computing their embeddings
    pub fn build(guides: Vec<Guide>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        let embeddings = GuideEmbeddings::compute(&guides, embedder.as_ref(), batch_size)?;
        Self::with_embeddings(guides, embeddings, embedder)
    }

    /// Build from guides and an embeddings cache file.
    ///
    /// A stale or unreadable cache is recomputed and rewritten.
    pub fn build_cached(
        guides: Vec<Guide>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
        cache_path: &std::path::Path,
    ) -> Result<Self> {
        match GuideEmbeddings::load(cache_path, embedder.as_ref()) {
            Ok(store) if store.matches(&guides) => {
                info!(path = %cache_path.display(), "Using cached guide embeddings");
                return Self::with_embeddings(guides, store, embedder);
            }
            Ok(_) => info!(path = %cache_path.display(), "Guide embeddings cache is stale, recomputing"),
            Err(e) => debug!(error = %e, "No usable guide embeddings cache"),
        }

        let store = GuideEmbeddings::compute(&guides, embedder.as_ref(), batch_size)?;
        if let Err(e) = store.save(cache_path) {
            warn!(error = %e, "Failed to write guide embeddings cache");
        }
        Self::with_embeddings(guides, store, embedder)
    }

    /// Build from precomputed embeddings
    pub fn with_embeddings(
        guides: Vec<Guide>,
        embeddings: GuideEmbeddings,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        embeddings.check_compatible(embedder.as_ref())?;
        if !embeddings.matches(&guides) {
            return Err(FixError::ConfigError(format!(
                "{} guide embeddings for {} guides",
                embeddings.len(),
                guides.len()
            )));
        }
        Ok(Self {
            guides,
            embeddings,
            embedder,
        })
    }

    pub fn len(&self) -> usize {
        self.guides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guides.is_empty()
    }

    /// Similarity of the question to every guide, in guide order
    pub fn score(&self, question: &str) -> Result<Vec<f32>> {
        let query = self.embedder.embed(&preprocess_text(question))?;
        Ok(cosine_similarities(&query, &self.embeddings.vectors))
    }

    /// Best guides for a question.
    ///
    /// Returns at most `top_n` guides ranked by descending score. When a
    /// threshold is given only guides reaching it are returned, which may be
    /// none at all.
    pub fn predict_guides(
        &self,
        question: &str,
        top_n: usize,
        similarity_threshold: Option<f32>,
    ) -> Result<Vec<GuideMatch>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.score(question)?;
        let matches: Vec<GuideMatch> = rank_top_n(&scores, top_n, similarity_threshold)
            .into_iter()
            .map(|(idx, score)| GuideMatch {
                guide: self.guides[idx].clone(),
                score,
            })
            .collect();

        debug!(question, matches = matches.len(), "Guide recommendation");
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;

    fn guide(id: u64, title: &str) -> Guide {
        Guide {
            guideid: id,
            title: title.to_string(),
            category: String::new(),
            subject: String::new(),
            guide_type: String::new(),
            data_type: String::new(),
            url: String::new(),
            summary: None,
        }
    }

    fn recommender(guides: Vec<Guide>) -> GuideRecommender {
        GuideRecommender::build(guides, Arc::new(HashingEmbedder::new(512)), 8).unwrap()
    }

    #[test]
    fn test_predict_ranks_relevant_guide_first() {
        let rec = recommender(vec![
            guide(1, "Battery replacement"),
            guide(2, "Replace the screen"),
            guide(3, "Keyboard cleaning"),
        ]);
        let matches = rec.predict_guides("my screen is cracked", 3, None).unwrap();
        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].guide.guideid, 2);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_predict_respects_top_n() {
        let rec = recommender(vec![guide(1, "Fan"), guide(2, "Fan noise"), guide(3, "Loud fan")]);
        assert_eq!(rec.predict_guides("fan", 2, None).unwrap().len(), 2);
    }

    #[test]
    fn test_threshold_may_return_nothing() {
        let rec = recommender(vec![guide(1, "Battery replacement")]);
        let matches = rec.predict_guides("zzzz", 3, Some(0.9)).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_identical_titles_keep_guide_order() {
        let rec = recommender(vec![guide(5, "Hinge repair"), guide(6, "Hinge repair")]);
        let matches = rec.predict_guides("hinge", 2, None).unwrap();
        assert_eq!(matches[0].guide.guideid, 5);
        assert_eq!(matches[1].guide.guideid, 6);
    }

    #[test]
    fn test_mismatched_embeddings_rejected() {
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(64));
        let store = GuideEmbeddings::compute(&[guide(1, "Fan")], embedder.as_ref(), 8).unwrap();
        let result = GuideRecommender::with_embeddings(vec![guide(2, "Other")], store, embedder);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_recommender() {
        let rec = recommender(Vec::new());
        assert!(rec.predict_guides("anything", 3, None).unwrap().is_empty());
    }
}
