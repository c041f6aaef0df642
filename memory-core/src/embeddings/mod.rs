//! Dual-embedding registry (spec §4.1 Embedding Registry, C1).
//!
//! The registry holds up to two lazy-loaded [`TextEmbedder`]s — one tuned
//! for source code, one for natural-language/reflection text — behind
//! [`tokio::sync::OnceCell`] so the (possibly expensive) model load happens
//! once, on first use, not at service start.

pub mod local;
pub mod mock;
pub mod similarity;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::Result;

/// A text embedder: converts text to a fixed-dimension dense vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. The default calls [`TextEmbedder::embed`] in a
    /// loop; implementations backed by a batching-capable model should
    /// override this.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// The fixed output dimension of this embedder's model.
    fn dimension(&self) -> usize;

    /// Identifier for the underlying model, used in payload provenance.
    fn model_name(&self) -> &str;
}

/// Which of the registry's two embedders to use for a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    /// Tuned for source code (signatures, docstrings, bodies).
    Code,
    /// Tuned for natural language: memories, GHAP axis texts, commit
    /// messages, value candidates.
    Semantic,
}

/// A factory that lazily constructs a [`TextEmbedder`] the first time it is
/// needed. Kept as a boxed closure so the registry doesn't need to know
/// whether the backing model is the ONNX-backed [`local::LocalTextEmbedder`]
/// or a [`mock::MockTextEmbedder`] used in tests.
pub type EmbedderFactory = Box<dyn Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync>;

/// Holds up to two lazily-initialized embedders behind [`OnceCell`]s so the
/// (possibly slow) model load happens once, on first call, not at startup.
pub struct EmbeddingRegistry {
    code: OnceCell<Arc<dyn TextEmbedder>>,
    semantic: OnceCell<Arc<dyn TextEmbedder>>,
    code_factory: EmbedderFactory,
    semantic_factory: EmbedderFactory,
}

impl EmbeddingRegistry {
    #[must_use]
    pub fn new(code_factory: EmbedderFactory, semantic_factory: EmbedderFactory) -> Self {
        Self {
            code: OnceCell::new(),
            semantic: OnceCell::new(),
            code_factory,
            semantic_factory,
        }
    }

    /// Construct a registry where both axes share the same embedder factory.
    #[must_use]
    pub fn uniform(factory: EmbedderFactory) -> Self
    where
    {
        let shared: Arc<dyn Fn() -> Result<Arc<dyn TextEmbedder>> + Send + Sync> = Arc::from(factory);
        let a = shared.clone();
        let b = shared;
        Self {
            code: OnceCell::new(),
            semantic: OnceCell::new(),
            code_factory: Box::new(move || a()),
            semantic_factory: Box::new(move || b()),
        }
    }

    async fn get(&self, kind: EmbedderKind) -> Result<&Arc<dyn TextEmbedder>> {
        match kind {
            EmbedderKind::Code => self.code.get_or_try_init(|| async { (self.code_factory)() }).await,
            EmbedderKind::Semantic => {
                self.semantic
                    .get_or_try_init(|| async { (self.semantic_factory)() })
                    .await
            }
        }
    }

    /// Embed a single text with the embedder selected by `kind`.
    pub async fn embed(&self, kind: EmbedderKind, text: &str) -> Result<Vec<f32>> {
        self.get(kind).await?.embed(text).await
    }

    /// Embed a batch of texts with the embedder selected by `kind`.
    pub async fn embed_batch(&self, kind: EmbedderKind, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.get(kind).await?.embed_batch(texts).await
    }

    /// The dimension of the embedder selected by `kind`, loading it if needed.
    pub async fn dimension(&self, kind: EmbedderKind) -> Result<usize> {
        Ok(self.get(kind).await?.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::mock::MockTextEmbedder;

    fn mock_registry() -> EmbeddingRegistry {
        EmbeddingRegistry::new(
            Box::new(|| Ok(Arc::new(MockTextEmbedder::new("code-mock", 8)) as Arc<dyn TextEmbedder>)),
            Box::new(|| {
                Ok(Arc::new(MockTextEmbedder::new("semantic-mock", 16)) as Arc<dyn TextEmbedder>)
            }),
        )
    }

    #[tokio::test]
    async fn loads_each_embedder_exactly_once() {
        let registry = mock_registry();
        let a = registry.embed(EmbedderKind::Code, "fn foo() {}").await.unwrap();
        let b = registry.embed(EmbedderKind::Code, "fn foo() {}").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.dimension(EmbedderKind::Code).await.unwrap(), 8);
        assert_eq!(registry.dimension(EmbedderKind::Semantic).await.unwrap(), 16);
    }

    #[tokio::test]
    async fn code_and_semantic_embedders_are_independent() {
        let registry = mock_registry();
        let code = registry.embed(EmbedderKind::Code, "same text").await.unwrap();
        let semantic = registry.embed(EmbedderKind::Semantic, "same text").await.unwrap();
        assert_ne!(code.len(), semantic.len());
    }
}
