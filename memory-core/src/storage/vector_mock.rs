//! In-memory [`VectorStore`] used by tests and by the clusterer/searcher
//! unit tests that don't need a real database.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::embeddings::similarity::cosine_similarity;
use crate::error::{Error, Result};
use crate::storage::vector::{Distance, Filter, SearchHit, VectorRecord, VectorStore};
use crate::types::CollectionInfo;

struct Collection {
    dimension: usize,
    points: HashMap<String, (Vec<f32>, Value)>,
}

#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimension: usize, _distance: Distance) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(Error::VectorStore(format!("collection `{name}` already exists")));
        }
        collections.insert(
            name.to_string(),
            Collection {
                dimension,
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn get_collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let collections = self.collections.read();
        Ok(collections.get(name).map(|c| CollectionInfo {
            name: name.to_string(),
            dimension: c.dimension,
            vector_count: c.points.len() as u64,
        }))
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().remove(name);
        Ok(())
    }

    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: Value) -> Result<()> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| Error::not_found("collection", collection))?;
        if vector.len() != coll.dimension {
            return Err(Error::DimensionMismatch {
                collection: collection.to_string(),
                expected: coll.dimension,
                actual: vector.len(),
            });
        }
        coll.points.insert(id.to_string(), (vector, payload));
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_vector: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::not_found("collection", collection))?;

        let mut hits: Vec<SearchHit> = coll
            .points
            .iter()
            .filter(|(_, (_, payload))| filter.is_none_or(|f| f.matches(payload)))
            .map(|(id, (vector, payload))| SearchHit {
                id: id.clone(),
                score: cosine_similarity(query_vector, vector),
                payload: payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scroll(
        &self,
        collection: &str,
        limit: usize,
        filter: Option<&Filter>,
        with_vectors: bool,
    ) -> Result<Vec<VectorRecord>> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::not_found("collection", collection))?;

        let records = coll
            .points
            .iter()
            .filter(|(_, (_, payload))| filter.is_none_or(|f| f.matches(payload)))
            .take(limit)
            .map(|(id, (vector, payload))| VectorRecord {
                id: id.clone(),
                vector: with_vectors.then(|| vector.clone()),
                payload: payload.clone(),
            })
            .collect();
        Ok(records)
    }

    async fn get(&self, collection: &str, id: &str, with_vector: bool) -> Result<Option<VectorRecord>> {
        let collections = self.collections.read();
        let Some(coll) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(coll.points.get(id).map(|(vector, payload)| VectorRecord {
            id: id.to_string(),
            vector: with_vector.then(|| vector.clone()),
            payload: payload.clone(),
        }))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if let Some(coll) = self.collections.write().get_mut(collection) {
            coll.points.remove(id);
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| Error::not_found("collection", collection))?;
        Ok(coll
            .points
            .values()
            .filter(|(_, payload)| filter.is_none_or(|f| f.matches(payload)))
            .count() as u64)
    }
}
