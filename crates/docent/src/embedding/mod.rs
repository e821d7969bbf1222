//! Embedding generation
//!
//! Wraps fastembed's all-MiniLM-L6-v2 (384 dimensions) behind the
//! `TextEmbedder` trait so fast unit tests can substitute a deterministic
//! mock (see `crate::testing`).

use std::sync::Mutex;

use fastembed::{InitOptions, TextEmbedding};

use crate::error::{DocentError, Result};

/// Embedding dimension produced by the bundled model
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Anything that can turn text into a fixed-size vector.
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, preserving order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// The real fastembed-backed model.
pub struct EmbeddingModel {
    model: Mutex<TextEmbedding>,
}

impl EmbeddingModel {
    /// Load the embedding model. Downloads weights on first use.
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
                .with_show_download_progress(false),
        )
        .map_err(|e| DocentError::Embedding(format!("Failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Mutex::new(model),
        })
    }
}

impl TextEmbedder for EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text.to_string()])?;
        embeddings
            .pop()
            .ok_or_else(|| DocentError::Embedding("Model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| DocentError::Embedding("Embedding model lock poisoned".to_string()))?;

        model
            .embed(texts.to_vec(), None)
            .map_err(|e| DocentError::Embedding(format!("Failed to embed texts: {e}")))
    }
}
