//! Memory CRUD: `store_memory` / `retrieve_memories` / `list_memories` /
//! `delete_memory` (spec §3.1, §6.1). No dedicated component number — a thin
//! `VectorStore` + `CollectionGuard` wrapper following the same
//! ensure-then-write idiom as [`crate::code::indexer`] and
//! [`crate::learning::values`].

use std::sync::Arc;

use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::{Error, Result};
use crate::ids::new_id;
use crate::storage::{CollectionGuard, Filter, VectorStore};
use crate::types::{Memory, MemoryCategory};

pub const MEMORIES_COLLECTION: &str = "memories";
const RETRIEVE_LIMIT_CAP: usize = 100;

/// CRUD over the `memories` vector collection.
pub struct MemoryStore {
    vector_store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingRegistry>,
    guard: CollectionGuard,
}

impl MemoryStore {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, embeddings: Arc<EmbeddingRegistry>) -> Self {
        let guard = CollectionGuard::new(vector_store.clone(), MEMORIES_COLLECTION);
        Self {
            vector_store,
            embeddings,
            guard,
        }
    }

    /// `store_memory` (spec §3.1): created by value, mutable only via
    /// delete+store.
    pub async fn store_memory(
        &self,
        content: &str,
        category: MemoryCategory,
        importance: f32,
        tags: Vec<String>,
    ) -> Result<Memory> {
        let memory = Memory {
            id: new_id().to_string(),
            content: content.to_string(),
            category,
            importance,
            tags,
            created_at: chrono::Utc::now(),
        };
        memory.validate()?;

        let dimension = self.embeddings.dimension(EmbedderKind::Semantic).await?;
        self.guard.ensure(dimension).await?;

        let vector = self.embeddings.embed(EmbedderKind::Semantic, &memory.content).await?;
        let payload = serde_json::json!({
            "content": memory.content,
            "category": memory.category,
            "importance": memory.importance,
            "tags": memory.tags,
            "created_at": memory.created_at.to_rfc3339(),
        });
        self.vector_store.upsert(MEMORIES_COLLECTION, &memory.id, vector, payload).await?;

        Ok(memory)
    }

    /// `retrieve_memories(query, limit, category?, min_importance?)`
    /// (spec §4.12): semantic search over the collection, capped at 100.
    pub async fn retrieve_memories(
        &self,
        query: &str,
        limit: usize,
        category: Option<MemoryCategory>,
        min_importance: Option<f32>,
    ) -> Result<Vec<Memory>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.vector_store.get_collection_info(MEMORIES_COLLECTION).await?.is_none() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(category) = category {
            filter = filter.with_equals("category", serde_json::to_value(category)?);
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty());

        let vector = self.embeddings.embed(EmbedderKind::Semantic, query).await?;
        let capped = limit.min(RETRIEVE_LIMIT_CAP);
        let hits = self
            .vector_store
            .search(MEMORIES_COLLECTION, &vector, capped, filter.as_ref())
            .await?;

        let memories: Vec<Memory> = hits
            .iter()
            .filter_map(|hit| memory_from_payload(&hit.id, &hit.payload))
            .filter(|m| min_importance.is_none_or(|min| m.importance >= min))
            .collect();

        Ok(memories)
    }

    /// `list_memories(category?, limit)`: newest first.
    pub async fn list_memories(&self, category: Option<MemoryCategory>, limit: usize) -> Result<Vec<Memory>> {
        if self.vector_store.get_collection_info(MEMORIES_COLLECTION).await?.is_none() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(category) = category {
            filter = filter.with_equals("category", serde_json::to_value(category)?);
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty());

        let records = self
            .vector_store
            .scroll(MEMORIES_COLLECTION, usize::MAX, filter.as_ref(), false)
            .await?;

        let mut memories: Vec<Memory> = records
            .iter()
            .filter_map(|r| memory_from_payload(&r.id, &r.payload))
            .collect();
        memories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        memories.truncate(limit);
        Ok(memories)
    }

    /// `delete_memory(id)`: destroys the record (spec §3.1 lifecycle).
    pub async fn delete_memory(&self, id: &str) -> Result<()> {
        if self.vector_store.get(MEMORIES_COLLECTION, id, false).await?.is_none() {
            return Err(Error::not_found("memory", id));
        }
        self.vector_store.delete(MEMORIES_COLLECTION, id).await
    }
}

fn memory_from_payload(id: &str, payload: &serde_json::Value) -> Option<Memory> {
    Some(Memory {
        id: id.to_string(),
        content: payload.get("content")?.as_str()?.to_string(),
        category: serde_json::from_value(payload.get("category")?.clone()).ok()?,
        importance: payload.get("importance")?.as_f64()? as f32,
        tags: payload
            .get("tags")?
            .as_array()?
            .iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect(),
        created_at: payload
            .get("created_at")?
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::mock::MockTextEmbedder;
    use crate::storage::InMemoryVectorStore;

    fn store() -> MemoryStore {
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let embeddings = Arc::new(EmbeddingRegistry::uniform(Box::new(|| {
            Ok(Arc::new(MockTextEmbedder::new("semantic-mock", 8)) as Arc<dyn crate::embeddings::TextEmbedder>)
        })));
        MemoryStore::new(vector_store, embeddings)
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let store = store();
        let stored = store
            .store_memory("prefers tabs over spaces", MemoryCategory::Preference, 0.8, vec!["style".into()])
            .await
            .unwrap();

        let results = store.retrieve_memories("prefers tabs over spaces", 10, None, None).await.unwrap();
        assert!(results.iter().any(|m| m.id == stored.id));
    }

    #[tokio::test]
    async fn retrieve_with_empty_query_returns_empty() {
        let store = store();
        store.store_memory("something", MemoryCategory::Fact, 0.5, vec![]).await.unwrap();
        let results = store.retrieve_memories("   ", 10, None, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn store_memory_rejects_invalid_importance() {
        let store = store();
        let err = store.store_memory("x", MemoryCategory::Fact, 1.5, vec![]).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[tokio::test]
    async fn list_memories_sorts_newest_first() {
        let store = store();
        let first = store.store_memory("first", MemoryCategory::Event, 0.2, vec![]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = store.store_memory("second", MemoryCategory::Event, 0.3, vec![]).await.unwrap();

        let listed = store.list_memories(None, 10).await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[tokio::test]
    async fn delete_memory_removes_the_record() {
        let store = store();
        let stored = store.store_memory("gone soon", MemoryCategory::Fact, 0.1, vec![]).await.unwrap();
        store.delete_memory(&stored.id).await.unwrap();
        let err = store.delete_memory(&stored.id).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
