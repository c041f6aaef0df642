//! Deterministic mock embedder for tests and for running without the
//! `local-embeddings` feature.

use async_trait::async_trait;

use crate::embeddings::similarity::normalize;
use crate::embeddings::TextEmbedder;
use crate::error::Result;

/// Produces a deterministic, non-semantic embedding derived from a hash of
/// the input text. Never use in production — similarity scores carry no
/// real semantic meaning.
pub struct MockTextEmbedder {
    name: String,
    dimension: usize,
}

impl MockTextEmbedder {
    #[must_use]
    pub fn new(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
        }
    }

    #[must_use]
    pub fn generate(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let value = ((seed >> 16) as f32) / 32768.0 - 1.0;
            embedding.push(value);
        }
        normalize(embedding)
    }
}

#[async_trait]
impl TextEmbedder for MockTextEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
