// Local sentence embeddings via a BERT encoder run through candle
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};

use super::Embedder;
use crate::errors::FixError;

/// Sentence embedding engine (mean-pooled BERT hidden states)
pub struct EmbeddingEngine {
    model: Arc<BertModel>,
    tokenizer: Arc<Tokenizer>,
    device: Device,
    model_id: String,
    dimension: usize,
}

impl EmbeddingEngine {
    /// Load `model_id` from the Hugging Face hub, fetching it into the local cache if needed
    pub fn new(model_id: &str, max_tokens: usize) -> Result<Self> {
        let device = Device::Cpu;

        let api = Api::new().context("hf-hub client unavailable")?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));

        let config_path = repo.get("config.json")
            .context("config.json not found for model")?;
        let tokenizer_path = repo.get("tokenizer.json")
            .context("tokenizer.json not found for model")?;
        let weights_path = repo.get("model.safetensors")
            .context("model.safetensors not found for model")?;

        let config_contents = std::fs::read_to_string(config_path)
            .context("Unreadable model config")?;
        let config: Config = serde_json::from_str(&config_contents)
            .context("Model config is not a BERT config")?;
        let dimension = serde_json::from_str::<serde_json::Value>(&config_contents)
            .ok()
            .and_then(|raw| raw.get("hidden_size").and_then(|v| v.as_u64()))
            .context("Model config has no hidden_size")? as usize;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Tokenizer load failed: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)
                .context("Failed to load model weights")?
        };

        let model = BertModel::load(vb, &config)
            .context("BERT weights do not match config")?;

        Ok(Self {
            model: Arc::new(model),
            tokenizer: Arc::new(tokenizer),
            device,
            model_id: model_id.to_string(),
            dimension,
        })
    }

    /// Generate embeddings for multiple texts in one forward pass
    fn forward_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self.tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("Could not tokenize batch: {}", e))?;

        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);
        let batch_size = texts.len();

        // Right-pad ids and mask to the longest sequence
        let mut padded_ids = vec![0u32; batch_size * max_len];
        let mut padded_mask = vec![0u32; batch_size * max_len];
        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            padded_ids[i * max_len..i * max_len + ids.len()].copy_from_slice(ids);
            padded_mask[i * max_len..i * max_len + mask.len()].copy_from_slice(mask);
        }

        let token_ids = Tensor::from_vec(padded_ids, (batch_size, max_len), &self.device)?;
        let attention_mask = Tensor::from_vec(padded_mask, (batch_size, max_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = Self::mean_pool(&hidden, &attention_mask)?;

        Ok(pooled.to_vec2::<f32>()?)
    }

    /// Average token states, ignoring padding
    fn mean_pool(embeddings: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let mask_expanded = attention_mask
            .unsqueeze(2)?
            .expand(embeddings.shape())?
            .to_dtype(embeddings.dtype())?;

        let sum_embeddings = (embeddings * &mask_expanded)?.sum(1)?;
        let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum_embeddings.broadcast_div(&sum_mask)?)
    }
}

impl Embedder for EmbeddingEngine {
    fn embed_batch(&self, texts: &[&str]) -> crate::errors::Result<Vec<Vec<f32>>> {
        self.forward_batch(texts)
            .map_err(|e| FixError::EmbeddingError(format!("{:#}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
