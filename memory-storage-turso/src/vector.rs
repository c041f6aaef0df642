//! [`VectorStore`] over libsql: one `vec_<collection>` table per collection,
//! an `F32_BLOB(dimension)` column, and brute-force cosine ranking via
//! libsql's native `vector_distance_cos`/`vector32` functions (spec §4.2,
//! C2 — generalizing the teacher's fixed per-dimension embedding tables to
//! arbitrary named collections).

use async_trait::async_trait;
use libsql::params;

use learning_memory_core::error::{Error, Result};
use learning_memory_core::storage::vector::{Distance, Filter, SearchHit, VectorRecord, VectorStore};
use learning_memory_core::types::CollectionInfo;

use crate::schema::{create_vector_table_sql, drop_vector_table_sql, vector_table_name};
use crate::TursoStore;

fn store_err(e: impl std::fmt::Display) -> Error {
    Error::VectorStore(e.to_string())
}

fn vector_to_json(vector: &[f32]) -> Result<String> {
    serde_json::to_string(vector).map_err(Error::from)
}

fn json_to_vector(text: &str) -> Result<Vec<f32>> {
    serde_json::from_str(text).map_err(Error::from)
}

impl TursoStore {
    async fn collection_dimension(&self, name: &str) -> Result<Option<usize>> {
        let conn = self.connection().await?;
        let mut rows = conn
            .query("SELECT dimension FROM vector_collections WHERE name = ?", params![name])
            .await
            .map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };
        let dimension: i64 = row.get(0).map_err(store_err)?;
        Ok(Some(dimension as usize))
    }
}

#[async_trait]
impl VectorStore for TursoStore {
    async fn create_collection(&self, name: &str, dimension: usize, _distance: Distance) -> Result<()> {
        if self.collection_dimension(name).await?.is_some() {
            return Err(Error::VectorStore(format!("collection `{name}` already exists")));
        }

        let conn = self.connection().await?;
        conn.execute(&create_vector_table_sql(name, dimension), ()).await.map_err(store_err)?;
        conn.execute("INSERT INTO vector_collections (name, dimension) VALUES (?, ?)", params![name, dimension as i64])
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get_collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        let Some(dimension) = self.collection_dimension(name).await? else {
            return Ok(None);
        };

        let conn = self.connection().await?;
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {}", vector_table_name(name)), ())
            .await
            .map_err(store_err)?;
        let vector_count: i64 = match rows.next().await.map_err(store_err)? {
            Some(row) => row.get(0).map_err(store_err)?,
            None => 0,
        };

        Ok(Some(CollectionInfo { name: name.to_string(), dimension, vector_count: vector_count as u64 }))
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(&drop_vector_table_sql(name), ()).await.map_err(store_err)?;
        conn.execute("DELETE FROM vector_collections WHERE name = ?", params![name]).await.map_err(store_err)?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, id: &str, vector: Vec<f32>, payload: serde_json::Value) -> Result<()> {
        let Some(dimension) = self.collection_dimension(collection).await? else {
            return Err(Error::not_found("collection", collection));
        };
        if vector.len() != dimension {
            return Err(Error::DimensionMismatch { collection: collection.to_string(), expected: dimension, actual: vector.len() });
        }

        let vector_json = vector_to_json(&vector)?;
        let payload_json = serde_json::to_string(&payload)?;
        let conn = self.connection().await?;
        let sql = format!(
            "INSERT INTO {table} (id, embedding, payload) VALUES (?, vector32(?), ?) \
             ON CONFLICT(id) DO UPDATE SET embedding = vector32(?), payload = ?",
            table = vector_table_name(collection)
        );
        conn.execute(&sql, params![id, vector_json.clone(), payload_json.clone(), vector_json, payload_json])
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn search(&self, collection: &str, query_vector: &[f32], limit: usize, filter: Option<&Filter>) -> Result<Vec<SearchHit>> {
        if self.collection_dimension(collection).await?.is_none() {
            return Err(Error::not_found("collection", collection));
        }

        let query_json = vector_to_json(query_vector)?;
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT id, payload, vector_distance_cos(embedding, vector32(?)) AS dist FROM {table} ORDER BY dist ASC",
            table = vector_table_name(collection)
        );
        let mut rows = conn.query(&sql, params![query_json]).await.map_err(store_err)?;

        let mut hits = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let id: String = row.get(0).map_err(store_err)?;
            let payload_text: String = row.get(1).map_err(store_err)?;
            let dist: f64 = row.get(2).map_err(store_err)?;
            let payload: serde_json::Value = serde_json::from_str(&payload_text)?;

            if filter.is_none_or(|f| f.matches(&payload)) {
                hits.push(SearchHit { id, score: (1.0 - dist) as f32, payload });
            }
            if hits.len() >= limit {
                break;
            }
        }
        Ok(hits)
    }

    async fn scroll(&self, collection: &str, limit: usize, filter: Option<&Filter>, with_vectors: bool) -> Result<Vec<VectorRecord>> {
        if self.collection_dimension(collection).await?.is_none() {
            return Err(Error::not_found("collection", collection));
        }

        let conn = self.connection().await?;
        let sql = format!(
            "SELECT id, payload, vector_extract(embedding) FROM {table}",
            table = vector_table_name(collection)
        );
        let mut rows = conn.query(&sql, ()).await.map_err(store_err)?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let id: String = row.get(0).map_err(store_err)?;
            let payload_text: String = row.get(1).map_err(store_err)?;
            let payload: serde_json::Value = serde_json::from_str(&payload_text)?;

            if !filter.is_none_or(|f| f.matches(&payload)) {
                continue;
            }

            let vector = if with_vectors {
                let vector_text: String = row.get(2).map_err(store_err)?;
                Some(json_to_vector(&vector_text)?)
            } else {
                None
            };

            records.push(VectorRecord { id, vector, payload });
            if records.len() >= limit {
                break;
            }
        }
        Ok(records)
    }

    async fn get(&self, collection: &str, id: &str, with_vector: bool) -> Result<Option<VectorRecord>> {
        if self.collection_dimension(collection).await?.is_none() {
            return Ok(None);
        }

        let conn = self.connection().await?;
        let sql = format!(
            "SELECT payload, vector_extract(embedding) FROM {table} WHERE id = ?",
            table = vector_table_name(collection)
        );
        let mut rows = conn.query(&sql, params![id]).await.map_err(store_err)?;
        let Some(row) = rows.next().await.map_err(store_err)? else {
            return Ok(None);
        };

        let payload_text: String = row.get(0).map_err(store_err)?;
        let payload: serde_json::Value = serde_json::from_str(&payload_text)?;
        let vector = if with_vector {
            let vector_text: String = row.get(1).map_err(store_err)?;
            Some(json_to_vector(&vector_text)?)
        } else {
            None
        };

        Ok(Some(VectorRecord { id: id.to_string(), vector, payload }))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if self.collection_dimension(collection).await?.is_none() {
            return Ok(());
        }
        let conn = self.connection().await?;
        let sql = format!("DELETE FROM {table} WHERE id = ?", table = vector_table_name(collection));
        conn.execute(&sql, params![id]).await.map_err(store_err)?;
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> Result<u64> {
        if self.collection_dimension(collection).await?.is_none() {
            return Err(Error::not_found("collection", collection));
        }

        let conn = self.connection().await?;
        if filter.is_none() {
            let mut rows = conn
                .query(&format!("SELECT COUNT(*) FROM {}", vector_table_name(collection)), ())
                .await
                .map_err(store_err)?;
            let count: i64 = match rows.next().await.map_err(store_err)? {
                Some(row) => row.get(0).map_err(store_err)?,
                None => 0,
            };
            return Ok(count as u64);
        }

        let mut rows = conn
            .query(&format!("SELECT payload FROM {}", vector_table_name(collection)), ())
            .await
            .map_err(store_err)?;
        let mut count = 0u64;
        while let Some(row) = rows.next().await.map_err(store_err)? {
            let payload_text: String = row.get(0).map_err(store_err)?;
            let payload: serde_json::Value = serde_json::from_str(&payload_text)?;
            if filter.is_none_or(|f| f.matches(&payload)) {
                count += 1;
            }
        }
        Ok(count)
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

    #[tokio::test]
    async fn create_collection_rejects_duplicate() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 4, Distance::Cosine).await.unwrap();
        let err = store.create_collection("memories", 4, Distance::Cosine).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn upsert_rejects_dimension_mismatch() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 4, Distance::Cosine).await.unwrap();
        let err = store.upsert("memories", "a", vec![1.0, 2.0], serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn search_ranks_by_cosine_similarity_descending() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 2, Distance::Cosine).await.unwrap();
        store.upsert("memories", "same", vec![1.0, 0.0], serde_json::json!({"tag": "a"})).await.unwrap();
        store.upsert("memories", "orthogonal", vec![0.0, 1.0], serde_json::json!({"tag": "b"})).await.unwrap();

        let hits = store.search("memories", &[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(hits[0].id, "same");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn search_applies_payload_filter() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 2, Distance::Cosine).await.unwrap();
        store.upsert("memories", "a", vec![1.0, 0.0], serde_json::json!({"project": "x"})).await.unwrap();
        store.upsert("memories", "b", vec![1.0, 0.0], serde_json::json!({"project": "y"})).await.unwrap();

        let filter = Filter::new().with_equals("project", serde_json::json!("y"));
        let hits = store.search("memories", &[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[tokio::test]
    async fn get_and_delete_round_trip() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 2, Distance::Cosine).await.unwrap();
        store.upsert("memories", "a", vec![1.0, 0.0], serde_json::json!({})).await.unwrap();

        let record = store.get("memories", "a", true).await.unwrap().unwrap();
        assert_eq!(record.vector.unwrap(), vec![1.0, 0.0]);

        store.delete("memories", "a").await.unwrap();
        assert!(store.get("memories", "a", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_collection_drops_the_table_and_registry_row() {
        let (store, _dir) = store().await;
        store.create_collection("memories", 2, Distance::Cosine).await.unwrap();
        store.delete_collection("memories").await.unwrap();
        assert!(store.get_collection_info("memories").await.unwrap().is_none());
    }
}
