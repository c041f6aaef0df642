//! In-memory [`MetadataStore`] and a deterministic [`EmbeddingRegistry`],
//! mirroring the shape of `memory-core`'s own `InMemoryVectorStore` so the
//! two can be combined into a full in-memory stack for tests that don't
//! need a real database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use learning_memory_core::embeddings::mock::MockTextEmbedder;
use learning_memory_core::embeddings::{EmbeddingRegistry, TextEmbedder};
use learning_memory_core::error::Result;
use learning_memory_core::storage::MetadataStore;
use learning_memory_core::types::{GitIndexState, IndexedFile};

/// In-memory [`MetadataStore`]: one map keyed by `(project, file_path)` for
/// indexed-file rows, one keyed by `repo_path` for git cursors, one flat map
/// for settings.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    files: RwLock<HashMap<(String, String), IndexedFile>>,
    git_state: RwLock<HashMap<String, GitIndexState>>,
    settings: RwLock<HashMap<String, String>>,
}

impl InMemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_indexed_file(&self, project: &str, file_path: &str) -> Result<Option<IndexedFile>> {
        Ok(self.files.read().get(&(project.to_string(), file_path.to_string())).cloned())
    }

    async fn upsert_indexed_file(&self, row: &IndexedFile) -> Result<()> {
        self.files
            .write()
            .insert((row.project.clone(), row.file_path.clone()), row.clone());
        Ok(())
    }

    async fn delete_indexed_file(&self, project: &str, file_path: &str) -> Result<()> {
        self.files.write().remove(&(project.to_string(), file_path.to_string()));
        Ok(())
    }

    async fn list_indexed_files(&self, project: Option<&str>) -> Result<Vec<IndexedFile>> {
        let files = self.files.read();
        Ok(files
            .values()
            .filter(|row| project.is_none_or(|p| row.project == p))
            .cloned()
            .collect())
    }

    async fn get_git_index_state(&self, repo_path: &str) -> Result<Option<GitIndexState>> {
        Ok(self.git_state.read().get(repo_path).cloned())
    }

    async fn upsert_git_index_state(&self, state: &GitIndexState) -> Result<()> {
        self.git_state.write().insert(state.repo_path.clone(), state.clone());
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.settings.read().get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.settings.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A uniform registry backed by deterministic hash embeddings (16 dims for
/// both axes). Never semantically meaningful, but stable across calls with
/// the same input, which is all clustering/similarity tests need.
#[must_use]
pub fn mock_embeddings() -> Arc<EmbeddingRegistry> {
    Arc::new(EmbeddingRegistry::uniform(Box::new(|| {
        Ok(Arc::new(MockTextEmbedder::new("test-mock", 16)) as Arc<dyn TextEmbedder>)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn indexed_file_round_trips() {
        let store = InMemoryMetadataStore::new();
        let row = IndexedFile {
            project: "proj".into(),
            file_path: "src/lib.rs".into(),
            content_hash: "abc".into(),
            mtime: chrono::Utc::now(),
            language: Some("rust".into()),
            unit_count: 2,
            indexed_at: chrono::Utc::now(),
        };
        store.upsert_indexed_file(&row).await.unwrap();
        let fetched = store.get_indexed_file("proj", "src/lib.rs").await.unwrap();
        assert_eq!(fetched, Some(row));
    }

    #[tokio::test]
    async fn deleting_a_missing_file_is_a_no_op() {
        let store = InMemoryMetadataStore::new();
        store.delete_indexed_file("proj", "missing.rs").await.unwrap();
    }
}
