//! End-to-end GHAP reflection lifecycle: create -> update -> resolve ->
//! persist -> findable via `search_experiences` on the `full` and
//! `strategy` axes, absent from the `surprise`/`root_cause` axes when the
//! entry never recorded a surprise.

use std::sync::Arc;

use learning_memory_core::ghap::{GhapCollector, GhapJournal, GhapPersister};
use learning_memory_core::search::Searcher;
use learning_memory_core::storage::{InMemoryVectorStore, VectorStore};
use learning_memory_test_utils::mock_embeddings;

fn collector() -> GhapCollector {
    let dir = tempfile::tempdir().unwrap();
    let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
    std::mem::forget(dir);
    GhapCollector::new(journal)
}

#[tokio::test]
async fn resolved_entry_is_findable_on_full_and_strategy_axes_only() {
    let collector = collector();
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let embeddings = mock_embeddings();
    let persister = GhapPersister::new(vector_store.clone(), embeddings.clone());
    persister.ensure_collections().await.unwrap();

    let created = collector
        .create_ghap(
            "debugging",
            "systematic-elimination",
            "make the failing test pass",
            "the off-by-one is in the range bound",
            "widen the upper bound by one",
            "the test passes and no other test regresses",
        )
        .unwrap();

    let updated = collector
        .update_ghap(Some("the bound is off by two, not one"), None, None, None, Some("first attempt undershot"))
        .unwrap();
    assert_eq!(updated.iteration_count, 1);
    assert_eq!(updated.id, created.id);

    let resolved = collector.resolve_ghap("confirmed", "the test passes reliably", None, None, None).unwrap();
    assert_eq!(resolved.id, created.id);
    assert!(collector.get_current().unwrap().is_none());

    persister.persist(&resolved).await.unwrap();

    let searcher = Searcher::new(vector_store.clone(), embeddings.clone());

    let full_hits = searcher.search_experiences("make the failing test pass", "full", None, None, None, 5).await.unwrap();
    assert!(full_hits.iter().any(|hit| hit.ghap_id == resolved.id));

    let strategy_hits = searcher
        .search_experiences("systematic-elimination", "strategy", None, None, None, 5)
        .await
        .unwrap();
    assert!(strategy_hits.iter().any(|hit| hit.ghap_id == resolved.id));

    let surprise_record = vector_store.get("ghap_surprise", &resolved.id, false).await.unwrap();
    assert!(surprise_record.is_none());
    let root_cause_record = vector_store.get("ghap_root_cause", &resolved.id, false).await.unwrap();
    assert!(root_cause_record.is_none());
}

#[tokio::test]
async fn falsified_entry_with_surprise_is_findable_on_all_four_axes() {
    let collector = collector();
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let embeddings = mock_embeddings();
    let persister = GhapPersister::new(vector_store.clone(), embeddings);
    persister.ensure_collections().await.unwrap();

    collector
        .create_ghap(
            "debugging",
            "root-cause-analysis",
            "stop the flaky integration test",
            "a shared temp dir leaks state across tests",
            "isolate each test in its own temp dir",
            "the suite passes ten times in a row",
        )
        .unwrap();

    let resolved = collector
        .resolve_ghap(
            "falsified",
            "still flaky after isolating temp dirs",
            "the leak was actually a global mutex, not the filesystem",
            Some(learning_memory_core::types::RootCause {
                category: "wrong-assumption".to_string(),
                description: "assumed the filesystem was the shared resource".to_string(),
            }),
            None,
        )
        .unwrap();

    persister.persist(&resolved).await.unwrap();

    for axis in ["ghap_full", "ghap_strategy", "ghap_surprise", "ghap_root_cause"] {
        let record = vector_store.get(axis, &resolved.id, false).await.unwrap();
        assert!(record.is_some(), "expected {axis} to contain the resolved entry");
    }
}

#[tokio::test]
async fn creating_while_active_orphans_the_previous_entry() {
    let collector = collector();
    let first = collector
        .create_ghap("debugging", "research-first", "goal one", "hyp one", "act one", "pred one")
        .unwrap();
    let second = collector
        .create_ghap("refactoring", "divide-and-conquer", "goal two", "hyp two", "act two", "pred two")
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(collector.get_current().unwrap().unwrap().id, second.id);
}
