//! Searcher (spec §4.12, C13): a unified read surface over the five typed
//! semantic searches. Every method embeds the query, builds a payload
//! filter, delegates to `VectorStore.search`, and maps hits into the
//! canonical result records in [`super::types`].

use std::sync::Arc;

use tracing::warn;

use crate::code::CODE_COLLECTION;
use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::Result;
use crate::git::COMMITS_COLLECTION;
use crate::learning::values::VALUES_COLLECTION;
use crate::memory::MEMORIES_COLLECTION;
use crate::storage::{Filter, SearchHit, VectorStore};
use crate::types::{axis_collection_name, MemoryCategory};

use super::types::{
    CodeSearchResult, CommitSearchResult, ExperienceSearchResult, MemorySearchResult, ValueSearchResult,
};

const MEMORIES_LIMIT_CAP: usize = 100;
const CODE_LIMIT_CAP: usize = 50;
const EXPERIENCES_LIMIT_CAP: usize = 50;

/// Unified read surface (spec §4.12). Holds no state of its own beyond the
/// vector store and embedding registry every other component already
/// shares.
pub struct Searcher {
    vector_store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingRegistry>,
}

impl Searcher {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, embeddings: Arc<EmbeddingRegistry>) -> Self {
        Self { vector_store, embeddings }
    }

    /// `search_memories(query, limit, category?, min_importance?)`.
    pub async fn search_memories(
        &self,
        query: &str,
        limit: usize,
        category: Option<MemoryCategory>,
        min_importance: Option<f32>,
    ) -> Result<Vec<MemorySearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let Some(hits) = self.search_collection(MEMORIES_COLLECTION, EmbedderKind::Semantic, query, limit.min(MEMORIES_LIMIT_CAP), category.map(|c| Filter::new().with_equals("category", serde_json::json!(c)))).await? else {
            return Ok(Vec::new());
        };

        Ok(hits
            .iter()
            .filter_map(memory_result)
            .filter(|m| min_importance.is_none_or(|min| m.importance >= min))
            .collect())
    }

    /// `search_code(query, limit, project?, language?)`. Uses the code
    /// embedder for both the query and `code_units` (spec §4.12 step 1).
    pub async fn search_code(
        &self,
        query: &str,
        limit: usize,
        project: Option<&str>,
        language: Option<&str>,
    ) -> Result<Vec<CodeSearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(project) = project {
            filter = filter.with_equals("project", serde_json::json!(project));
        }
        if let Some(language) = language {
            filter = filter.with_equals("language", serde_json::json!(language));
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty());

        let Some(hits) = self.search_collection(CODE_COLLECTION, EmbedderKind::Code, query, limit.min(CODE_LIMIT_CAP), filter).await? else {
            return Ok(Vec::new());
        };

        Ok(hits.iter().filter_map(code_result).collect())
    }

    /// `search_experiences(query, axis, domain?, strategy?, outcome?, limit)`.
    pub async fn search_experiences(
        &self,
        query: &str,
        axis: &str,
        domain: Option<&str>,
        strategy: Option<&str>,
        outcome: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ExperienceSearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(domain) = domain {
            filter = filter.with_equals("domain", serde_json::json!(domain));
        }
        if let Some(strategy) = strategy {
            filter = filter.with_equals("strategy", serde_json::json!(strategy));
        }
        if let Some(outcome) = outcome {
            filter = filter.with_equals("outcome_status", serde_json::json!(outcome));
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty());

        let collection = axis_collection_name(axis);
        let Some(hits) = self
            .search_collection(&collection, EmbedderKind::Semantic, query, limit.min(EXPERIENCES_LIMIT_CAP), filter)
            .await?
        else {
            return Ok(Vec::new());
        };

        Ok(hits.iter().filter_map(experience_result).collect())
    }

    /// `search_values(query, limit, axis?)`.
    pub async fn search_values(&self, query: &str, limit: usize, axis: Option<&str>) -> Result<Vec<ValueSearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let filter = axis.map(|a| Filter::new().with_equals("axis", serde_json::json!(a)));
        let Some(hits) = self.search_collection(VALUES_COLLECTION, EmbedderKind::Semantic, query, limit, filter).await? else {
            return Ok(Vec::new());
        };

        Ok(hits.iter().filter_map(value_result).collect())
    }

    /// `search_commits(query, limit, author?, since?)`.
    pub async fn search_commits(
        &self,
        query: &str,
        limit: usize,
        author: Option<&str>,
        since: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<CommitSearchResult>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut filter = Filter::new();
        if let Some(author) = author {
            filter = filter.with_equals("author", serde_json::json!(author));
        }
        if let Some(since) = since {
            filter = filter.with_gte("timestamp", serde_json::json!(since.to_rfc3339()));
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty() || f.gte.is_some());

        let Some(hits) = self.search_collection(COMMITS_COLLECTION, EmbedderKind::Semantic, query, limit, filter).await? else {
            return Ok(Vec::new());
        };

        Ok(hits.iter().filter_map(commit_result).collect())
    }

    /// `find_similar_code(unit_id, limit, project?)`: search by an existing
    /// unit's stored vector rather than re-embedding text, excluding the
    /// unit itself from its own results.
    pub async fn find_similar_code(
        &self,
        unit_id: &str,
        limit: usize,
        project: Option<&str>,
    ) -> Result<Vec<CodeSearchResult>> {
        let Some(record) = self.vector_store.get(CODE_COLLECTION, unit_id, true).await? else {
            return Err(crate::error::Error::not_found("code_unit", unit_id));
        };
        let Some(vector) = record.vector else {
            return Err(crate::error::Error::not_found("code_unit", unit_id));
        };

        let mut filter = Filter::new();
        if let Some(project) = project {
            filter = filter.with_equals("project", serde_json::json!(project));
        }
        let filter = Some(filter).filter(|f| !f.equals.is_empty());

        let hits = self
            .vector_store
            .search(CODE_COLLECTION, &vector, limit.min(CODE_LIMIT_CAP) + 1, filter.as_ref())
            .await?;

        Ok(hits
            .iter()
            .filter(|hit| hit.id != unit_id)
            .filter_map(code_result)
            .take(limit.min(CODE_LIMIT_CAP))
            .collect())
    }

    /// Shared embed-then-search step. If the backing collection does not
    /// exist yet, logs a warning and returns `None` rather than raising
    /// (spec §4.12 "If the backing collection does not exist...").
    async fn search_collection(
        &self,
        collection: &str,
        embedder: EmbedderKind,
        query: &str,
        limit: usize,
        filter: Option<Filter>,
    ) -> Result<Option<Vec<SearchHit>>> {
        if self.vector_store.get_collection_info(collection).await?.is_none() {
            warn!(collection, "search requested against a collection that does not exist yet");
            return Ok(None);
        }

        let vector = self.embeddings.embed(embedder, query).await?;
        let hits = self.vector_store.search(collection, &vector, limit, filter.as_ref()).await?;
        Ok(Some(hits))
    }
}

fn memory_result(hit: &SearchHit) -> Option<MemorySearchResult> {
    let payload = &hit.payload;
    Some(MemorySearchResult {
        id: hit.id.clone(),
        content: payload.get("content")?.as_str()?.to_string(),
        category: serde_json::from_value(payload.get("category")?.clone()).ok()?,
        importance: payload.get("importance")?.as_f64()? as f32,
        tags: payload
            .get("tags")?
            .as_array()?
            .iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect(),
        created_at: parse_timestamp(payload.get("created_at")?)?,
        score: hit.score,
    })
}

fn code_result(hit: &SearchHit) -> Option<CodeSearchResult> {
    let payload = &hit.payload;
    Some(CodeSearchResult {
        id: hit.id.clone(),
        project: payload.get("project")?.as_str()?.to_string(),
        name: payload.get("name")?.as_str()?.to_string(),
        qualified_name: payload.get("qualified_name")?.as_str()?.to_string(),
        unit_type: serde_json::from_value(payload.get("unit_type")?.clone()).ok()?,
        signature: payload.get("signature")?.as_str()?.to_string(),
        content: payload.get("content").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        file_path: payload.get("file_path")?.as_str()?.to_string(),
        start_line: payload.get("start_line")?.as_u64()? as u32,
        end_line: payload.get("end_line")?.as_u64()? as u32,
        language: payload.get("language")?.as_str()?.to_string(),
        docstring: payload.get("docstring").and_then(|v| v.as_str()).map(str::to_string),
        complexity: payload.get("complexity").and_then(serde_json::Value::as_u64).map(|c| c as u32),
        score: hit.score,
    })
}

fn experience_result(hit: &SearchHit) -> Option<ExperienceSearchResult> {
    let payload = &hit.payload;
    Some(ExperienceSearchResult {
        ghap_id: payload.get("ghap_id")?.as_str()?.to_string(),
        axis: payload.get("axis")?.as_str()?.to_string(),
        domain: payload.get("domain")?.as_str()?.to_string(),
        strategy: payload.get("strategy")?.as_str()?.to_string(),
        goal: payload.get("goal")?.as_str()?.to_string(),
        hypothesis: payload.get("hypothesis")?.as_str()?.to_string(),
        action: payload.get("action")?.as_str()?.to_string(),
        prediction: payload.get("prediction")?.as_str()?.to_string(),
        outcome_status: payload.get("outcome_status")?.as_str()?.to_string(),
        outcome_result: payload.get("outcome_result")?.as_str()?.to_string(),
        surprise: payload.get("surprise").and_then(|v| v.as_str()).map(str::to_string),
        root_cause: payload.get("root_cause").filter(|v| !v.is_null()).cloned(),
        lesson: payload.get("lesson").filter(|v| !v.is_null()).cloned(),
        confidence_tier: payload.get("confidence_tier")?.as_str()?.to_string(),
        created_at: parse_timestamp(payload.get("created_at")?)?,
        score: hit.score,
    })
}

fn value_result(hit: &SearchHit) -> Option<ValueSearchResult> {
    let payload = &hit.payload;
    Some(ValueSearchResult {
        id: hit.id.clone(),
        text: payload.get("text")?.as_str()?.to_string(),
        axis: payload.get("axis")?.as_str()?.to_string(),
        cluster_id: payload.get("cluster_id")?.as_str()?.to_string(),
        cluster_size: payload.get("cluster_size")?.as_u64()? as usize,
        similarity_to_centroid: payload.get("similarity_to_centroid")?.as_f64()? as f32,
        created_at: parse_timestamp(payload.get("created_at")?)?,
        score: hit.score,
    })
}

fn commit_result(hit: &SearchHit) -> Option<CommitSearchResult> {
    let payload = &hit.payload;
    Some(CommitSearchResult {
        sha: hit.id.clone(),
        message: payload.get("message")?.as_str()?.to_string(),
        author: payload.get("author")?.as_str()?.to_string(),
        author_email: payload.get("author_email")?.as_str()?.to_string(),
        timestamp: parse_timestamp(payload.get("timestamp")?)?,
        files_changed: payload
            .get("files_changed")?
            .as_array()?
            .iter()
            .filter_map(|f| f.as_str().map(str::to_string))
            .collect(),
        insertions: payload.get("insertions")?.as_u64()? as u32,
        deletions: payload.get("deletions")?.as_u64()? as u32,
        score: hit.score,
    })
}

fn parse_timestamp(value: &serde_json::Value) -> Option<chrono::DateTime<chrono::Utc>> {
    value
        .as_str()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::mock::MockTextEmbedder;
    use crate::storage::{Distance, InMemoryVectorStore};
    use crate::types::MemoryCategory;

    fn registry() -> Arc<EmbeddingRegistry> {
        Arc::new(EmbeddingRegistry::uniform(Box::new(|| {
            Ok(Arc::new(MockTextEmbedder::new("mock", 8)) as Arc<dyn crate::embeddings::TextEmbedder>)
        })))
    }

    #[tokio::test]
    async fn search_memories_returns_empty_for_blank_query() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let searcher = Searcher::new(store, registry());
        let results = searcher.search_memories("  ", 10, None, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_memories_returns_empty_when_collection_absent() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let searcher = Searcher::new(store, registry());
        let results = searcher.search_memories("anything", 10, None, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_memories_maps_hits_and_filters_by_importance() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        store.create_collection(MEMORIES_COLLECTION, 8, Distance::Cosine).await.unwrap();
        store
            .upsert(
                MEMORIES_COLLECTION,
                "m1",
                vec![1.0; 8],
                serde_json::json!({
                    "content": "prefers tabs",
                    "category": MemoryCategory::Preference,
                    "importance": 0.9,
                    "tags": ["style"],
                    "created_at": chrono::Utc::now().to_rfc3339(),
                }),
            )
            .await
            .unwrap();

        let searcher = Searcher::new(store, registry());
        let results = searcher.search_memories("prefers tabs", 10, None, Some(0.95)).await.unwrap();
        assert!(results.is_empty());

        let results = searcher.search_memories("prefers tabs", 10, None, Some(0.5)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m1");
    }

    #[tokio::test]
    async fn search_commits_returns_empty_when_collection_absent() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let searcher = Searcher::new(store, registry());
        let results = searcher.search_commits("fix bug", 500, None, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn find_similar_code_rejects_unknown_unit_id() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let searcher = Searcher::new(store, registry());
        let err = searcher.find_similar_code("missing", 5, None).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn find_similar_code_excludes_the_queried_unit_from_its_own_results() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        store.create_collection(CODE_COLLECTION, 8, Distance::Cosine).await.unwrap();
        store
            .upsert(CODE_COLLECTION, "u1", vec![1.0; 8], serde_json::json!({
                "project": "p", "name": "f", "qualified_name": "p::f", "unit_type": "function",
                "signature": "fn f()", "file_path": "a.rs", "start_line": 1, "end_line": 2, "language": "rust",
            }))
            .await
            .unwrap();
        store
            .upsert(CODE_COLLECTION, "u2", vec![1.0; 8], serde_json::json!({
                "project": "p", "name": "g", "qualified_name": "p::g", "unit_type": "function",
                "signature": "fn g()", "file_path": "b.rs", "start_line": 1, "end_line": 2, "language": "rust",
            }))
            .await
            .unwrap();

        let searcher = Searcher::new(store, registry());
        let results = searcher.find_similar_code("u1", 5, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "u2");
    }
}
