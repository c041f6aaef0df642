//! Orphan-prevention: re-indexing a file that lost units must remove the
//! vectors for the units that no longer exist, not just add the survivors.

use std::sync::Arc;
use std::time::Duration;

use learning_memory_core::code::CodeIndexer;
use learning_memory_core::storage::{Filter, InMemoryVectorStore, MetadataStore, VectorStore};
use learning_memory_test_utils::{mock_embeddings, InMemoryMetadataStore};

const FIVE_FUNCTIONS: &str = "\
def add(a, b):
    return a + b

def sub(a, b):
    return a - b

def mul(a, b):
    return a * b

def div(a, b):
    return a / b

def neg(a):
    return -a
";

const THREE_FUNCTIONS: &str = "\
def add(a, b):
    return a + b

def sub(a, b):
    return a - b

def mul(a, b):
    return a * b
";

fn indexer(vector_store: Arc<dyn VectorStore>) -> CodeIndexer {
    let metadata_store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    CodeIndexer::new(vector_store, metadata_store, mock_embeddings())
}

async fn units_for(vector_store: &Arc<dyn VectorStore>, project: &str, file_path: &str) -> Vec<String> {
    let filter = Filter::new()
        .with_equals("project", serde_json::json!(project))
        .with_equals("file_path", serde_json::json!(file_path));
    vector_store
        .scroll("code_units", usize::MAX, Some(&filter), false)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[tokio::test]
async fn reindexing_a_shrunk_file_removes_the_dropped_units() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let indexer = indexer(vector_store.clone());

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("math_utils.py");
    let file_path_str = file.to_string_lossy().to_string();

    std::fs::write(&file, FIVE_FUNCTIONS).unwrap();
    let written = indexer.index_file(&file, "proj").await.unwrap();
    assert_eq!(written, 5);

    let ids_before = units_for(&vector_store, "proj", &file_path_str).await;
    assert_eq!(ids_before.len(), 5);

    tokio::time::sleep(Duration::from_millis(20)).await;
    std::fs::write(&file, THREE_FUNCTIONS).unwrap();
    let written = indexer.index_file(&file, "proj").await.unwrap();
    assert_eq!(written, 3);

    let ids_after = units_for(&vector_store, "proj", &file_path_str).await;
    assert_eq!(ids_after.len(), 3, "stale units from the shrunk file must be gone");

    let survivors: std::collections::HashSet<_> = ["add", "sub", "mul"].into_iter().collect();
    for id in &ids_after {
        let record = vector_store.get("code_units", id, false).await.unwrap().unwrap();
        let name = record.payload.get("name").unwrap().as_str().unwrap();
        assert!(survivors.contains(name), "unexpected surviving unit {name}");
    }
}

#[tokio::test]
async fn unchanged_file_is_not_reindexed() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let indexer = indexer(vector_store.clone());

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("math_utils.py");
    std::fs::write(&file, FIVE_FUNCTIONS).unwrap();

    let first = indexer.index_file(&file, "proj").await.unwrap();
    assert_eq!(first, 5);

    let second = indexer.index_file(&file, "proj").await.unwrap();
    assert_eq!(second, 0, "an unchanged file must report 0 units written");
}

#[tokio::test]
async fn a_file_emptied_of_units_clears_its_metadata_row() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let metadata_store = Arc::new(InMemoryMetadataStore::new());
    let indexer = CodeIndexer::new(vector_store.clone(), metadata_store.clone(), mock_embeddings());

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("math_utils.py");
    let file_path_str = file.to_string_lossy().to_string();
    std::fs::write(&file, FIVE_FUNCTIONS).unwrap();
    indexer.index_file(&file, "proj").await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    std::fs::write(&file, "# nothing but a comment\n").unwrap();
    let written = indexer.index_file(&file, "proj").await.unwrap();
    assert_eq!(written, 0);

    let row = metadata_store.get_indexed_file("proj", &file_path_str).await.unwrap();
    assert!(row.is_none());

    let remaining = units_for(&vector_store, "proj", &file_path_str).await;
    assert!(remaining.is_empty());
}
