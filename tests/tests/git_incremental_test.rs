//! Incremental git indexing: a cold repo is indexed in full on the first
//! call; a subsequent call with new commits on top indexes only those new
//! commits and advances the cursor.

use std::sync::Arc;

use learning_memory_core::git::{GitAnalyzer, GitReader};
use learning_memory_core::storage::{InMemoryVectorStore, MetadataStore, VectorStore};
use learning_memory_test_utils::{mock_embeddings, InMemoryMetadataStore, TestRepo};

const COMMIT_COUNT: usize = 12;

fn analyzer(repo_path: String, vector_store: Arc<dyn VectorStore>, metadata_store: Arc<dyn MetadataStore>) -> GitAnalyzer {
    let reader = GitReader::open(&repo_path).unwrap();
    GitAnalyzer::new(repo_path, reader, vector_store, metadata_store, mock_embeddings(), 5)
}

#[tokio::test]
async fn force_reindex_covers_the_whole_history_then_incremental_picks_up_new_commits() {
    let repo = TestRepo::init();
    for i in 0..COMMIT_COUNT {
        repo.commit_file(&format!("file_{i}.txt"), &format!("content {i}\n"), &format!("commit {i}"));
    }

    let repo_path = repo.path().to_string_lossy().to_string();
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let metadata_store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let analyzer = analyzer(repo_path.clone(), vector_store.clone(), metadata_store.clone());

    let stats = analyzer.index_commits(None, None, true).await.unwrap();
    assert_eq!(stats.commits_indexed as usize, COMMIT_COUNT);
    assert!(!stats.rewrite_detected);

    let reader = GitReader::open(&repo_path).unwrap();
    let head = reader.get_head_sha().await.unwrap();
    let state = metadata_store.get_git_index_state(&repo_path).await.unwrap().unwrap();
    assert_eq!(state.last_indexed_sha.as_deref(), Some(head.as_str()));
    assert_eq!(state.commit_count as usize, COMMIT_COUNT);

    repo.commit_file("extra_1.txt", "extra 1\n", "extra commit 1");
    repo.commit_file("extra_2.txt", "extra 2\n", "extra commit 2");

    let stats = analyzer.index_commits(None, None, false).await.unwrap();
    assert_eq!(stats.commits_indexed, 2, "only the two new commits should be indexed");

    let new_head = reader.get_head_sha().await.unwrap();
    assert_ne!(new_head, head);
    let state = metadata_store.get_git_index_state(&repo_path).await.unwrap().unwrap();
    assert_eq!(state.last_indexed_sha.as_deref(), Some(new_head.as_str()));
    assert_eq!(state.commit_count as usize, COMMIT_COUNT + 2);
}

#[tokio::test]
async fn reindexing_at_an_unchanged_head_indexes_nothing() {
    let repo = TestRepo::init();
    repo.commit_file("a.txt", "hello\n", "initial commit");

    let repo_path = repo.path().to_string_lossy().to_string();
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    let metadata_store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::new());
    let analyzer = analyzer(repo_path, vector_store, metadata_store);

    analyzer.index_commits(None, None, true).await.unwrap();
    let stats = analyzer.index_commits(None, None, false).await.unwrap();
    assert_eq!(stats.commits_indexed, 0);
}
