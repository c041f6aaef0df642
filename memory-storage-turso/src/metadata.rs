//! [`MetadataStore`] over libsql: `indexed_files`, `git_index_state`, and
//! `settings` (spec §4.5, §4.7, §6.2), grounded in the teacher's
//! `storage/episodes.rs` direct-libsql query style (no ORM, prepared
//! statements via `libsql::params!`).

use async_trait::async_trait;
use libsql::params;

use learning_memory_core::error::{Error, Result};
use learning_memory_core::storage::metadata::MetadataStore;
use learning_memory_core::types::{GitIndexState, IndexedFile};

use crate::TursoStore;

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::MetadataStore(e.to_string())
}

fn parse_rfc3339(text: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| store_err(e.to_string()))
}

#[async_trait]
impl MetadataStore for TursoStore {
    async fn get_indexed_file(&self, project: &str, file_path: &str) -> Result<Option<IndexedFile>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT project, file_path, content_hash, mtime, language, unit_count, indexed_at \
                 FROM indexed_files WHERE project = ? AND file_path = ?",
                params![project, file_path],
            )
            .await
            .map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };

        let mtime: String = row.get(3).map_err(store_err)?;
        let indexed_at: String = row.get(6).map_err(store_err)?;
        Ok(Some(IndexedFile {
            project: row.get(0).map_err(store_err)?,
            file_path: row.get(1).map_err(store_err)?,
            content_hash: row.get(2).map_err(store_err)?,
            mtime: parse_rfc3339(&mtime)?,
            language: row.get(4).map_err(store_err)?,
            unit_count: row.get::<i64>(5).map_err(store_err)? as u32,
            indexed_at: parse_rfc3339(&indexed_at)?,
        }))
    }

    async fn upsert_indexed_file(&self, row: &IndexedFile) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO indexed_files (project, file_path, content_hash, mtime, language, unit_count, indexed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(project, file_path) DO UPDATE SET \
                content_hash = excluded.content_hash, mtime = excluded.mtime, \
                language = excluded.language, unit_count = excluded.unit_count, \
                indexed_at = excluded.indexed_at",
            params![
                row.project.as_str(),
                row.file_path.as_str(),
                row.content_hash.as_str(),
                row.mtime.to_rfc3339(),
                row.language.clone(),
                i64::from(row.unit_count),
                row.indexed_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_indexed_file(&self, project: &str, file_path: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute("DELETE FROM indexed_files WHERE project = ? AND file_path = ?", params![project, file_path])
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_indexed_files(&self, project: Option<&str>) -> Result<Vec<IndexedFile>> {
        let conn = self.connection().await?;
        let sql = "SELECT project, file_path, content_hash, mtime, language, unit_count, indexed_at FROM indexed_files \
                    WHERE ?1 IS NULL OR project = ?1";
        let mut rows = conn.query(sql, params![project]).await.map_err(store_err)?;

        let mut files = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let mtime: String = row.get(3).map_err(store_err)?;
            let indexed_at: String = row.get(6).map_err(store_err)?;
            files.push(IndexedFile {
                project: row.get(0).map_err(store_err)?,
                file_path: row.get(1).map_err(store_err)?,
                content_hash: row.get(2).map_err(store_err)?,
                mtime: parse_rfc3339(&mtime)?,
                language: row.get(4).map_err(store_err)?,
                unit_count: row.get::<i64>(5).map_err(store_err)? as u32,
                indexed_at: parse_rfc3339(&indexed_at)?,
            });
        }
        Ok(files)
    }

    async fn get_git_index_state(&self, repo_path: &str) -> Result<Option<GitIndexState>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query(
                "SELECT repo_path, last_indexed_sha, last_indexed_at, commit_count FROM git_index_state WHERE repo_path = ?",
                params![repo_path],
            )
            .await
            .map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };

        let last_indexed_at: Option<String> = row.get(2).map_err(store_err)?;
        Ok(Some(GitIndexState {
            repo_path: row.get(0).map_err(store_err)?,
            last_indexed_sha: row.get(1).map_err(store_err)?,
            last_indexed_at: last_indexed_at.map(|s| parse_rfc3339(&s)).transpose()?,
            commit_count: row.get::<i64>(3).map_err(store_err)? as u32,
        }))
    }

    async fn upsert_git_index_state(&self, state: &GitIndexState) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO git_index_state (repo_path, last_indexed_sha, last_indexed_at, commit_count) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(repo_path) DO UPDATE SET \
                last_indexed_sha = excluded.last_indexed_sha, \
                last_indexed_at = excluded.last_indexed_at, \
                commit_count = excluded.commit_count",
            params![
                state.repo_path.as_str(),
                state.last_indexed_sha.clone(),
                state.last_indexed_at.map(|dt| dt.to_rfc3339()),
                i64::from(state.commit_count),
            ],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection().await?;
        let mut rows = conn.query("SELECT value FROM settings WHERE key = ?", params![key]).await.map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };
        Ok(Some(row.get(0).map_err(store_err)?))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .await
        .map_err(store_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TursoStore;
    use tempfile::TempDir;

    async fn store() -> (TursoStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = TursoStore::open_local(dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    fn sample_file() -> IndexedFile {
        IndexedFile {
            project: "core".into(),
            file_path: "src/lib.rs".into(),
            content_hash: "abc123".into(),
            mtime: chrono::Utc::now(),
            language: Some("rust".into()),
            unit_count: 3,
            indexed_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn indexed_file_round_trips_and_upserts_in_place() {
        let (store, _dir) = store().await;
        let mut file = sample_file();
        store.upsert_indexed_file(&file).await.unwrap();

        let loaded = store.get_indexed_file("core", "src/lib.rs").await.unwrap().unwrap();
        assert_eq!(loaded.content_hash, "abc123");

        file.content_hash = "def456".into();
        store.upsert_indexed_file(&file).await.unwrap();
        let loaded = store.get_indexed_file("core", "src/lib.rs").await.unwrap().unwrap();
        assert_eq!(loaded.content_hash, "def456");

        let all = store.list_indexed_files(Some("core")).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn delete_indexed_file_removes_the_row() {
        let (store, _dir) = store().await;
        store.upsert_indexed_file(&sample_file()).await.unwrap();
        store.delete_indexed_file("core", "src/lib.rs").await.unwrap();
        assert!(store.get_indexed_file("core", "src/lib.rs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn git_index_state_round_trips() {
        let (store, _dir) = store().await;
        let state = GitIndexState {
            repo_path: "/repo".into(),
            last_indexed_sha: Some("deadbeef".into()),
            last_indexed_at: Some(chrono::Utc::now()),
            commit_count: 42,
        };
        store.upsert_git_index_state(&state).await.unwrap();
        let loaded = store.get_git_index_state("/repo").await.unwrap().unwrap();
        assert_eq!(loaded.commit_count, 42);
        assert_eq!(loaded.last_indexed_sha.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn settings_round_trip_and_overwrite() {
        let (store, _dir) = store().await;
        assert!(store.get_setting("embedder_dimension").await.unwrap().is_none());
        store.set_setting("embedder_dimension", "768").await.unwrap();
        assert_eq!(store.get_setting("embedder_dimension").await.unwrap().as_deref(), Some("768"));
        store.set_setting("embedder_dimension", "1024").await.unwrap();
        assert_eq!(store.get_setting("embedder_dimension").await.unwrap().as_deref(), Some("1024"));
    }
}
