//! Precomputed guide embeddings
//!
//! Vectors are stored already L2-normalized and the file records which model
//! produced them, so a store can only be loaded for the embedder it was
//! computed with.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::preprocessing::preprocess_text;
use crate::corpus::Guide;
use crate::embedding::Embedder;
use crate::errors::{FixError, Result};
use crate::index::similarity::l2_normalize;

/// Normalized embeddings of guide titles, parallel to a guide list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideEmbeddings {
    pub model_id: String,
    pub dimension: usize,
    pub normalized: bool,
    pub guideids: Vec<u64>,
    /// Preprocessed title each vector was computed from
    #[serde(default)]
    pub texts: Vec<String>,
    pub vectors: Vec<Vec<f32>>,
}

impl GuideEmbeddings {
    /// Embed the preprocessed title of every guide
    pub fn compute(guides: &[Guide], embedder: &dyn Embedder, batch_size: usize) -> Result<Self> {
        let texts: Vec<String> = guides.iter().map(|g| preprocess_text(&g.title)).collect();

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size.max(1)) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            for mut vector in embedder.embed_batch(&refs)? {
                l2_normalize(&mut vector);
                vectors.push(vector);
            }
        }

        Ok(Self {
            model_id: embedder.model_id().to_string(),
            dimension: embedder.dimension(),
            normalized: true,
            guideids: guides.iter().map(|g| g.guideid).collect(),
            texts,
            vectors,
        })
    }

    /// Persist to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string(self)?)?;
        info!(path = %path.display(), guides = self.vectors.len(), "Guide embeddings saved");
        Ok(())
    }

    /// Load a store and check it was produced by `embedder`
    pub fn load(path: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&contents)?;
        store.check_compatible(embedder)?;
        Ok(store)
    }

    /// Refuse vectors that would not be comparable with the embedder's output
    pub fn check_compatible(&self, embedder: &dyn Embedder) -> Result<()> {
        if !self.normalized {
            return Err(FixError::ConfigError(
                "guide embeddings are not L2-normalized".to_string(),
            ));
        }
        if self.model_id != embedder.model_id() || self.dimension != embedder.dimension() {
            return Err(FixError::ConfigError(format!(
                "guide embeddings were computed with {} ({}d), active model is {} ({}d)",
                self.model_id,
                self.dimension,
                embedder.model_id(),
                embedder.dimension()
            )));
        }
        if self.vectors.len() != self.guideids.len() || self.texts.len() != self.guideids.len() {
            return Err(FixError::ConfigError(
                "guide embeddings file is inconsistent".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether this store was computed from exactly these guides and titles
    pub fn matches(&self, guides: &[Guide]) -> bool {
        self.guideids.len() == guides.len()
            && self.texts.len() == guides.len()
            && self
                .guideids
                .iter()
                .zip(&self.texts)
                .zip(guides)
                .all(|((id, text), g)| *id == g.guideid && *text == preprocess_text(&g.title))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use tempfile::TempDir;

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

    #[test]
    fn test_compute_normalizes() {
        let embedder = HashingEmbedder::new(64);
        let store = GuideEmbeddings::compute(&[guide(1, "Replace battery")], &embedder, 8).unwrap();
        let norm: f32 = store.vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(store.normalized);
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("embeddings").join("guides.json");
        let embedder = HashingEmbedder::new(64);
        let guides = vec![guide(1, "Replace battery"), guide(2, "Fix hinge")];

        let store = GuideEmbeddings::compute(&guides, &embedder, 8).unwrap();
        store.save(&path).unwrap();

        let loaded = GuideEmbeddings::load(&path, &embedder).unwrap();
        assert!(loaded.matches(&guides));
        assert_eq!(loaded.vectors, store.vectors);
    }

    #[test]
    fn test_renamed_guide_does_not_match() {
        let embedder = HashingEmbedder::new(64);
        let store = GuideEmbeddings::compute(&[guide(1, "Fan cleaning"), guide(2, "Hinge repair")], &embedder, 8)
            .unwrap();

        let renamed = vec![guide(1, "Battery replacement"), guide(2, "Hinge repair")];
        assert!(!store.matches(&renamed));
        assert!(store.matches(&[guide(1, "Fan cleaning!"), guide(2, "hinge repair")]));
    }

    #[test]
    fn test_load_rejects_file_without_texts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guides.json");
        let embedder = HashingEmbedder::new(64);
        let mut store = GuideEmbeddings::compute(&[guide(1, "Fan")], &embedder, 8).unwrap();
        store.texts.clear();
        store.save(&path).unwrap();

        assert!(GuideEmbeddings::load(&path, &embedder).is_err());
    }

    #[test]
    fn test_load_rejects_other_model() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("guides.json");
        let store = GuideEmbeddings::compute(&[guide(1, "Fan")], &HashingEmbedder::new(64), 8).unwrap();
        store.save(&path).unwrap();

        let result = GuideEmbeddings::load(&path, &HashingEmbedder::new(128));
        assert!(matches!(result, Err(FixError::ConfigError(_))));
    }
}
