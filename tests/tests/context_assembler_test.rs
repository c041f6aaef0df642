//! Graceful degradation (spec §4.13): when one requested source has no
//! backing collection at all, `assemble_context` still returns `Ok` and
//! simply reports zero items for that source, never surfacing an error.

use std::sync::Arc;

use learning_memory_core::config::{ClusteringConfig, ContextConfig};
use learning_memory_core::ghap::{GhapCollector, GhapJournal, GhapPersister};
use learning_memory_core::learning::ValueStore;
use learning_memory_core::memory::MemoryStore;
use learning_memory_core::search::Searcher;
use learning_memory_core::storage::{InMemoryVectorStore, VectorStore};
use learning_memory_core::types::MemoryCategory;
use learning_memory_core::ContextAssembler;
use learning_memory_test_utils::mock_embeddings;

#[tokio::test]
async fn missing_code_collection_degrades_gracefully_alongside_populated_sources() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let embeddings = mock_embeddings();

    let memories = MemoryStore::new(vector_store.clone(), embeddings.clone());
    memories
        .store_memory("the deploy pipeline retries three times before paging", MemoryCategory::Fact, 0.6, vec![])
        .await
        .unwrap();

    let journal_dir = tempfile::tempdir().unwrap();
    let collector = GhapCollector::new(GhapJournal::new(journal_dir.path().join("current_ghap.json")));
    let persister = GhapPersister::new(vector_store.clone(), embeddings.clone());
    persister.ensure_collections().await.unwrap();

    collector
        .create_ghap(
            "debugging",
            "systematic-elimination",
            "stop the deploy pipeline from paging",
            "the retry budget is too low",
            "raise the retry budget to five",
            "paging stops for transient failures",
        )
        .unwrap();
    let resolved = collector
        .resolve_ghap("confirmed", "paging stopped after the retry budget change", None, None, None)
        .unwrap();
    persister.persist(&resolved).await.unwrap();

    assert!(vector_store.get_collection_info("code_units").await.unwrap().is_none());

    let searcher = Arc::new(Searcher::new(vector_store.clone(), embeddings.clone()));
    let values = Arc::new(ValueStore::new(vector_store.clone(), embeddings, ClusteringConfig::default()));
    let assembler = ContextAssembler::new(searcher, values, ContextConfig::default());

    let result = assembler
        .assemble_context(
            "deploy pipeline retries",
            &["memories".to_string(), "code".to_string(), "experiences".to_string()],
            10,
            2000,
        )
        .await
        .unwrap();

    assert!(result.sources_used.contains_key("memories"));
    assert!(result.sources_used.contains_key("experiences"));
    assert!(
        !result.sources_used.contains_key("code"),
        "an absent collection must contribute zero items, not an error"
    );
}
