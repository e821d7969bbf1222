//! Test utilities - deterministic stand-ins for heavy components

use crate::embedding::{EMBEDDING_DIMENSIONS, TextEmbedder};
use crate::error::Result;

/// Mock embedding model for fast unit tests that don't need real ML.
/// Produces deterministic 384-dimensional vectors based on input text hash.
#[derive(Debug, Clone, Default)]
pub struct MockEmbeddingModel;

impl MockEmbeddingModel {
    pub fn new() -> Self {
        Self
    }
}

impl TextEmbedder for MockEmbeddingModel {
    /// Generate a deterministic "embedding" from text using hashing.
    /// Returns a 384-dim vector (matching real model dimensions) in range [-1, 1].
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        Ok((0..EMBEDDING_DIMENSIONS)
            .map(|i| {
                let x = seed
                    .wrapping_mul(i as u64 + 1)
                    .wrapping_add(0x9e3779b97f4a7c15);
                let normalized = (x as f32) / (u64::MAX as f32);
                (normalized * 2.0) - 1.0
            })
            .collect())
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}
