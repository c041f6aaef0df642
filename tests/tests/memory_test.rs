//! Black-box coverage of `store_memory`/`retrieve_memories`/`list_memories`/
//! `delete_memory` (spec §4.12 scenario: round-trip retrieval) and the
//! memory validation boundary behaviors.

use std::sync::Arc;

use learning_memory_core::error::ErrorKind;
use learning_memory_core::memory::MemoryStore;
use learning_memory_core::storage::{InMemoryVectorStore, VectorStore};
use learning_memory_core::types::MemoryCategory;
use learning_memory_test_utils::mock_embeddings;

fn store() -> MemoryStore {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    MemoryStore::new(vector_store, mock_embeddings())
}

#[tokio::test]
async fn store_then_retrieve_finds_the_same_memory() {
    let store = store();
    let stored = store
        .store_memory("prefer tabs over spaces", MemoryCategory::Preference, 0.8, vec!["style".into()])
        .await
        .unwrap();

    let hits = store.retrieve_memories("prefer tabs over spaces", 5, None, None).await.unwrap();
    assert!(hits.iter().any(|m| m.id == stored.id));
}

#[tokio::test]
async fn list_memories_is_newest_first() {
    let store = store();
    store.store_memory("first", MemoryCategory::Fact, 0.5, vec![]).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    store.store_memory("second", MemoryCategory::Fact, 0.5, vec![]).await.unwrap();

    let listed = store.list_memories(None, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].content, "second");
    assert_eq!(listed[1].content, "first");
}

#[tokio::test]
async fn delete_memory_removes_it_from_listing() {
    let store = store();
    let memory = store.store_memory("temporary", MemoryCategory::Event, 0.3, vec![]).await.unwrap();
    store.delete_memory(&memory.id).await.unwrap();

    let listed = store.list_memories(None, 10).await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn delete_memory_on_unknown_id_is_not_found() {
    let store = store();
    let err = store.delete_memory("does-not-exist").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn empty_query_retrieves_nothing_without_erroring() {
    let store = store();
    store.store_memory("anything", MemoryCategory::Fact, 0.5, vec![]).await.unwrap();
    let hits = store.retrieve_memories("   ", 5, None, None).await.unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn importance_outside_unit_range_is_rejected() {
    let store = store();
    let err = store
        .store_memory("bad importance", MemoryCategory::Fact, 1.5, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn oversized_content_is_rejected() {
    let store = store();
    let too_long = "x".repeat(10_001);
    let err = store
        .store_memory(&too_long, MemoryCategory::Fact, 0.5, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn too_many_tags_is_rejected() {
    let store = store();
    let tags: Vec<String> = (0..21).map(|i| format!("tag{i}")).collect();
    let err = store.store_memory("tagged", MemoryCategory::Fact, 0.5, tags).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
}

#[tokio::test]
async fn cold_store_accepts_the_first_memory_without_precreating_the_collection() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    assert!(vector_store.get_collection_info("memories").await.unwrap().is_none());

    let store = MemoryStore::new(vector_store, mock_embeddings());
    store.store_memory("cold start", MemoryCategory::Fact, 0.5, vec![]).await.unwrap();
}
