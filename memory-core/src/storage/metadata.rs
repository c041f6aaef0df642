//! Metadata Store abstraction (spec §4.5-§4.7, C3): the relational side of
//! persistence — change-detection rows, the git indexing cursor, and
//! process settings. Backed by libsql in `learning-memory-storage-turso`;
//! no in-memory mock is provided because nothing in this crate's tests
//! needs one independent of the vector store mock.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GitIndexState, IndexedFile};

/// Relational store for indexed-file rows, git-index state, and settings
/// (spec §4.5 `needs_reindex`, §4.7 `index_commits`, §6.2).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_indexed_file(&self, project: &str, file_path: &str) -> Result<Option<IndexedFile>>;

    async fn upsert_indexed_file(&self, row: &IndexedFile) -> Result<()>;

    async fn delete_indexed_file(&self, project: &str, file_path: &str) -> Result<()>;

    async fn list_indexed_files(&self, project: Option<&str>) -> Result<Vec<IndexedFile>>;

    async fn get_git_index_state(&self, repo_path: &str) -> Result<Option<GitIndexState>>;

    async fn upsert_git_index_state(&self, state: &GitIndexState) -> Result<()>;

    async fn get_setting(&self, key: &str) -> Result<Option<String>>;

    async fn set_setting(&self, key: &str, value: &str) -> Result<()>;
}
