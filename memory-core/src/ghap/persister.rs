//! GHAP Persister (spec §4.9, C10): axis-text synthesis, batch embedding,
//! and upsert into the four axis collections, with the retry policy shared
//! with the code/commit embed-fallback paths.

use std::sync::Arc;

use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::search::ExperienceSearchResult;
use crate::storage::{CollectionGuard, Filter, VectorStore};
use crate::types::{axis_collection_name, AxisTexts, GhapEntry, GHAP_AXIS_COLLECTIONS};

/// Persists resolved [`GhapEntry`] records into the four axis collections
/// (`ghap_full`, `ghap_strategy`, `ghap_surprise`, `ghap_root_cause`).
pub struct GhapPersister {
    vector_store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingRegistry>,
    guards: Vec<CollectionGuard>,
}

impl GhapPersister {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, embeddings: Arc<EmbeddingRegistry>) -> Self {
        let guards = GHAP_AXIS_COLLECTIONS
            .iter()
            .map(|axis| CollectionGuard::new(vector_store.clone(), axis_collection_name(axis)))
            .collect();
        Self {
            vector_store,
            embeddings,
            guards,
        }
    }

    /// Ensure all four axis collections exist at the embedder's current
    /// dimension (spec §4.9 "ensured once at service bootstrap").
    pub async fn ensure_collections(&self) -> Result<()> {
        let dimension = self.embeddings.dimension(EmbedderKind::Semantic).await?;
        for guard in &self.guards {
            guard.ensure(dimension).await?;
        }
        Ok(())
    }

    /// Persist a resolved entry with the spec's default retry policy (3
    /// attempts, 1s/2s/4s backoff). The journal resolution is never rolled
    /// back on failure — the caller may retry `persist` again later.
    pub async fn persist(&self, entry: &GhapEntry) -> Result<()> {
        let mut policy = RetryPolicy::with_config(RetryConfig::default());
        policy
            .execute(|| self.persist_once(entry))
            .await
            .map_err(|e| Error::Persist(e.to_string()))
    }

    /// `list_ghap_entries(outcome?, limit)`: resolved entries from the
    /// `ghap_full` axis collection, newest first.
    pub async fn list_resolved(&self, outcome: Option<&str>, limit: usize) -> Result<Vec<ExperienceSearchResult>> {
        let collection = axis_collection_name("full");
        if self.vector_store.get_collection_info(&collection).await?.is_none() {
            return Ok(Vec::new());
        }

        let filter = outcome.map(|o| Filter::new().with_equals("outcome_status", serde_json::json!(o)));
        let records = self.vector_store.scroll(&collection, usize::MAX, filter.as_ref(), false).await?;

        let mut entries: Vec<ExperienceSearchResult> = records.iter().filter_map(resolved_entry_from_record).collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn persist_once(&self, entry: &GhapEntry) -> Result<()> {
        let Some(resolution) = &entry.resolution else {
            return Err(Error::InvalidState("cannot persist an unresolved GHAP entry".into()));
        };

        let texts = build_axis_texts(entry);
        let mut present: Vec<(&str, &str)> = vec![("full", texts.full.as_str())];
        if let Some(strategy) = &texts.strategy {
            present.push(("strategy", strategy));
        }
        if let Some(surprise) = &texts.surprise {
            present.push(("surprise", surprise));
        }
        if let Some(root_cause) = &texts.root_cause {
            present.push(("root_cause", root_cause));
        }

        let batch: Vec<String> = present.iter().map(|(_, text)| (*text).to_string()).collect();
        let vectors = self.embeddings.embed_batch(EmbedderKind::Semantic, &batch).await?;

        for ((axis, _), vector) in present.into_iter().zip(vectors) {
            let collection = axis_collection_name(axis);
            let payload = serde_json::json!({
                "ghap_id": entry.id,
                "domain": entry.domain,
                "strategy": entry.strategy,
                "goal": entry.goal,
                "hypothesis": entry.hypothesis,
                "action": entry.action,
                "prediction": entry.prediction,
                "outcome_status": resolution.status,
                "outcome_result": resolution.result,
                "surprise": resolution.surprise,
                "root_cause": resolution.root_cause,
                "lesson": resolution.lesson,
                "confidence_tier": resolution.confidence_tier,
                "created_at": entry.created_at.to_rfc3339(),
                "axis": axis,
            });
            self.vector_store.upsert(&collection, &entry.id, vector, payload).await?;
        }

        Ok(())
    }
}

fn resolved_entry_from_record(record: &crate::storage::VectorRecord) -> Option<ExperienceSearchResult> {
    let payload = &record.payload;
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
        created_at: payload
            .get("created_at")?
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())?
            .with_timezone(&chrono::Utc),
        score: 1.0,
    })
}

/// Synthesize the four axis texts for a resolved entry (spec §4.9).
fn build_axis_texts(entry: &GhapEntry) -> AxisTexts {
    let Some(resolution) = &entry.resolution else {
        return AxisTexts::default();
    };

    let mut full = format!(
        "{}/{}\n\nGoal: {}\nHypothesis: {}\nAction: {}\nPrediction: {}\n\nOutcome: {} — {}",
        entry.domain, entry.strategy, entry.goal, entry.hypothesis, entry.action, entry.prediction,
        resolution.status.as_str(), resolution.result,
    );
    if let Some(surprise) = &resolution.surprise {
        full.push_str(&format!("\n\nSurprise: {surprise}"));
    }
    if let Some(lesson) = &resolution.lesson {
        if let Some(takeaway) = &lesson.takeaway {
            full.push_str(&format!("\n\nLesson: {takeaway}"));
        }
    }

    let strategy = format!(
        "Strategy: {}\nAction: {}\nOutcome: {} — {}",
        entry.strategy, entry.action, resolution.status.as_str(), resolution.result
    );

    let surprise = resolution
        .surprise
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .cloned();

    let root_cause = resolution
        .root_cause
        .as_ref()
        .filter(|rc| !rc.description.trim().is_empty())
        .map(|rc| format!("{}: {}", rc.category, rc.description));

    AxisTexts {
        full,
        strategy: Some(strategy),
        surprise,
        root_cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::mock::MockTextEmbedder;
    use crate::storage::InMemoryVectorStore;
    use crate::types::{ConfidenceTier, OutcomeStatus, Resolution, RootCause};

    fn resolved_entry(with_surprise: bool) -> GhapEntry {
        GhapEntry {
            id: "entry-1".into(),
            domain: "debugging".into(),
            strategy: "systematic-elimination".into(),
            goal: "fix flaky test".into(),
            hypothesis: "race condition".into(),
            action: "add barrier".into(),
            prediction: "passes reliably".into(),
            iteration_count: 1,
            created_at: chrono::Utc::now(),
            history: Vec::new(),
            resolution: Some(Resolution {
                status: OutcomeStatus::Falsified,
                result: "still flaky".into(),
                surprise: with_surprise.then(|| "the lock wasn't the issue".to_string()),
                root_cause: with_surprise.then(|| RootCause {
                    category: "wrong-assumption".into(),
                    description: "assumed single writer".into(),
                }),
                lesson: None,
                resolved_at: chrono::Utc::now(),
                confidence_tier: ConfidenceTier::Bronze,
            }),
        }
    }

    fn persister() -> GhapPersister {
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let embeddings = Arc::new(EmbeddingRegistry::uniform(Box::new(|| {
            Ok(Arc::new(MockTextEmbedder::new("semantic-mock", 8)) as Arc<dyn crate::embeddings::TextEmbedder>)
        })));
        GhapPersister::new(vector_store, embeddings)
    }

    #[tokio::test]
    async fn persist_writes_all_four_axes_when_surprise_present() {
        let persister = persister();
        persister.ensure_collections().await.unwrap();
        let entry = resolved_entry(true);
        persister.persist(&entry).await.unwrap();

        for axis in GHAP_AXIS_COLLECTIONS {
            let collection = axis_collection_name(axis);
            let record = persister.vector_store.get(&collection, &entry.id, false).await.unwrap();
            assert!(record.is_some(), "missing axis collection {collection}");
        }
    }

    #[tokio::test]
    async fn persist_skips_surprise_and_root_cause_axes_when_absent() {
        let persister = persister();
        persister.ensure_collections().await.unwrap();
        let entry = resolved_entry(false);
        persister.persist(&entry).await.unwrap();

        let full = persister.vector_store.get("ghap_full", &entry.id, false).await.unwrap();
        assert!(full.is_some());
        let surprise = persister.vector_store.get("ghap_surprise", &entry.id, false).await.unwrap();
        assert!(surprise.is_none());
    }

    #[tokio::test]
    async fn persist_rejects_unresolved_entry() {
        let persister = persister();
        persister.ensure_collections().await.unwrap();
        let mut entry = resolved_entry(true);
        entry.resolution = None;
        let err = persister.persist(&entry).await.unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
    }

    #[tokio::test]
    async fn list_resolved_is_empty_before_anything_is_persisted() {
        let persister = persister();
        let entries = persister.list_resolved(None, 10).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn list_resolved_filters_by_outcome_and_sorts_newest_first() {
        let persister = persister();
        persister.ensure_collections().await.unwrap();

        let mut older = resolved_entry(true);
        older.id = "entry-older".into();
        older.created_at = chrono::Utc::now() - chrono::Duration::days(1);
        persister.persist(&older).await.unwrap();

        let newer = resolved_entry(true);
        persister.persist(&newer).await.unwrap();

        let entries = persister.list_resolved(Some("falsified"), 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ghap_id, newer.id);

        let entries = persister.list_resolved(Some("confirmed"), 10).await.unwrap();
        assert!(entries.is_empty());
    }
}
