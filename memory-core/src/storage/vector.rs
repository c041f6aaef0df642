//! Vector store abstraction (spec §4.2, C2).
//!
//! Implementations come in two flavors: [`crate::storage::vector_mock::InMemoryVectorStore`]
//! for tests, and a real backend (`LibsqlVectorStore`, in the
//! `learning-memory-storage-turso` crate) that rides on libsql's native
//! vector-column support. Callers hold a `Box<dyn VectorStore>` so the two
//! are interchangeable.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::types::CollectionInfo;

/// Distance metric a collection is created with. Cosine is the only metric
/// this system uses (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Cosine,
}

/// Payload filter: AND semantics over equality, plus a `$gte` range predicate
/// for `timestamp`/`created_at` fields (spec §4.2 `search`/`scroll`).
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub equals: HashMap<String, Value>,
    pub gte: Option<(String, Value)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.gte = Some((field.into(), value.into()));
        self
    }

    /// Whether `payload` satisfies every predicate in this filter.
    #[must_use]
    pub fn matches(&self, payload: &Value) -> bool {
        for (field, expected) in &self.equals {
            let Some(actual) = payload.get(field) else {
                return false;
            };
            if actual != expected {
                return false;
            }
        }
        if let Some((field, threshold)) = &self.gte {
            let Some(actual) = payload.get(field) else {
                return false;
            };
            match (actual.as_str(), threshold.as_str()) {
                (Some(a), Some(t)) if a < t => return false,
                (Some(_), Some(_)) => {}
                _ => match (actual.as_f64(), threshold.as_f64()) {
                    (Some(a), Some(t)) if a < t => return false,
                    _ => {}
                },
            }
        }
        true
    }
}

/// One vector plus its metadata, as returned by `get`/`scroll`/`search`.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Option<Vec<f32>>,
    pub payload: Value,
}

/// A scored search hit (spec §4.2 `search`).
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Collection CRUD plus point-level vector operations (spec §4.2).
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a collection. Must fail with an "already exists" error kind
    /// (an internal [`crate::error::Error`] the caller can pattern-match and
    /// swallow) rather than silently succeeding, so [`crate::storage::guard::CollectionGuard`]
    /// can distinguish "nothing to do" from a real failure.
    async fn create_collection(&self, name: &str, dimension: usize, distance: Distance) -> Result<()>;

    /// `None` if absent; distinguishes absence from a transport failure,
    /// which surfaces as `Err`.
    async fn get_collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Fails with [`crate::error::Error::DimensionMismatch`] if
    /// `vector.len() != collection.dimension`.
    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: Value) -> Result<()>;

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchHit>>;

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        filter: Option<&Filter>,
        with_vectors: bool,
    ) -> Result<Vec<VectorRecord>>;

    async fn get(&self, collection: &str, id: &str, with_vector: bool) -> Result<Option<VectorRecord>>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64>;
}
