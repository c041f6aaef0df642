//! Value Store (spec §4.11, C12): admits principle statements against a
//! cluster centroid and stores them once admitted.

use std::sync::Arc;

use crate::config::ClusteringConfig;
use crate::embeddings::similarity::{cosine_distance, population_mean_stddev};
use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::{Error, Result};
use crate::ids::new_id;
use crate::storage::{CollectionGuard, Filter, VectorStore};
use crate::types::{Value, ValueValidation, MAX_VALUE_TEXT_LEN};

use super::clusterer::{parse_cluster_id, Clusterer};

pub const VALUES_COLLECTION: &str = "values";

/// Validates and stores principle statements admitted against a cluster
/// centroid (spec §4.11).
pub struct ValueStore {
    vector_store: Arc<dyn VectorStore>,
    embeddings: Arc<EmbeddingRegistry>,
    clusterer: Clusterer,
    guard: CollectionGuard,
}

impl ValueStore {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, embeddings: Arc<EmbeddingRegistry>, config: ClusteringConfig) -> Self {
        let clusterer = Clusterer::new(vector_store.clone(), config);
        let guard = CollectionGuard::new(vector_store.clone(), VALUES_COLLECTION);
        Self {
            vector_store,
            embeddings,
            clusterer,
            guard,
        }
    }

    /// `validate_value_candidate(text, cluster_id)` (spec §4.11 steps 1-5).
    pub async fn validate_value_candidate(&self, text: &str, cluster_id: &str) -> Result<ValueValidation> {
        let (_axis, _label) = parse_cluster_id(cluster_id)?;

        let Some(cluster) = self.clusterer.cluster_by_id(cluster_id).await? else {
            return Ok(ValueValidation {
                valid: false,
                similarity: None,
                centroid_distance: f32::MAX,
                threshold_distance: 0.0,
                reason: Some(format!("cluster `{cluster_id}` no longer exists")),
            });
        };

        let candidate_vector = self.embeddings.embed(EmbedderKind::Semantic, text).await?;
        let member_vectors = self.member_vectors(&cluster).await?;

        let distances: Vec<f32> = member_vectors
            .iter()
            .map(|v| cosine_distance(v, &cluster.centroid))
            .collect();
        let (mean, stddev) = population_mean_stddev(&distances);
        let threshold = mean + self.clusterer_sigma() * stddev;

        let centroid_distance = cosine_distance(&candidate_vector, &cluster.centroid);
        let similarity = 1.0 - centroid_distance;
        let valid = centroid_distance <= threshold;

        Ok(ValueValidation {
            valid,
            similarity: Some(similarity),
            centroid_distance,
            threshold_distance: threshold,
            reason: (!valid).then(|| {
                format!("candidate distance {centroid_distance:.4} exceeds threshold {threshold:.4}")
            }),
        })
    }

    /// `store_value(text, cluster_id, axis)` (spec §4.11): rejects (does not
    /// store) candidates that fail admission.
    pub async fn store_value(&self, text: &str, cluster_id: &str, axis: &str) -> Result<Value> {
        if text.trim().is_empty() || text.len() > MAX_VALUE_TEXT_LEN {
            return Err(Error::validation("text", format!("value text must be 1..={MAX_VALUE_TEXT_LEN} bytes")));
        }

        let validation = self.validate_value_candidate(text, cluster_id).await?;
        if !validation.valid {
            return Err(Error::validation(
                "text",
                validation.reason.unwrap_or_else(|| "value candidate rejected".into()),
            ));
        }

        let cluster = self
            .clusterer
            .cluster_by_id(cluster_id)
            .await?
            .ok_or_else(|| Error::not_found("cluster", cluster_id))?;

        let dimension = self.embeddings.dimension(EmbedderKind::Semantic).await?;
        self.guard.ensure(dimension).await?;

        let vector = self.embeddings.embed(EmbedderKind::Semantic, text).await?;
        let id = new_id().to_string();
        let value = Value {
            id: id.clone(),
            text: text.to_string(),
            axis: axis.to_string(),
            cluster_id: cluster_id.to_string(),
            cluster_size: cluster.size,
            similarity_to_centroid: validation.similarity.unwrap_or(0.0),
            created_at: chrono::Utc::now(),
        };

        let payload = serde_json::json!({
            "text": value.text,
            "axis": value.axis,
            "cluster_id": value.cluster_id,
            "cluster_size": value.cluster_size,
            "similarity_to_centroid": value.similarity_to_centroid,
            "created_at": value.created_at.to_rfc3339(),
        });
        self.vector_store.upsert(VALUES_COLLECTION, &id, vector, payload).await?;

        Ok(value)
    }

    /// `list_values(axis?, limit)` (spec §4.11): sorted by `cluster_size`
    /// desc, then `created_at` desc.
    pub async fn list_values(&self, axis: Option<&str>, limit: usize) -> Result<Vec<Value>> {
        if self.vector_store.get_collection_info(VALUES_COLLECTION).await?.is_none() {
            return Ok(Vec::new());
        }

        let filter = axis.map(|a| Filter::new().with_equals("axis", a));
        let records = self
            .vector_store
            .scroll(VALUES_COLLECTION, usize::MAX, filter.as_ref(), false)
            .await?;

        let mut values: Vec<Value> = records.iter().filter_map(value_from_payload).collect();
        values.sort_by(|a, b| {
            b.cluster_size
                .cmp(&a.cluster_size)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        values.truncate(limit);
        Ok(values)
    }

    async fn member_vectors(&self, cluster: &crate::types::Cluster) -> Result<Vec<Vec<f32>>> {
        let collection = crate::types::axis_collection_name(&cluster.axis);
        let mut vectors = Vec::with_capacity(cluster.member_ids.len());
        for id in &cluster.member_ids {
            if let Some(record) = self.vector_store.get(&collection, id, true).await? {
                if let Some(vector) = record.vector {
                    vectors.push(vector);
                }
            }
        }
        Ok(vectors)
    }

    fn clusterer_sigma(&self) -> f32 {
        self.clusterer.value_admission_sigma() as f32
    }
}

fn value_from_payload(record: &crate::storage::VectorRecord) -> Option<Value> {
    let payload = &record.payload;
    Some(Value {
        id: record.id.clone(),
        text: payload.get("text")?.as_str()?.to_string(),
        axis: payload.get("axis")?.as_str()?.to_string(),
        cluster_id: payload.get("cluster_id")?.as_str()?.to_string(),
        cluster_size: payload.get("cluster_size")?.as_u64()? as usize,
        similarity_to_centroid: payload.get("similarity_to_centroid")?.as_f64()? as f32,
        created_at: payload
            .get("created_at")?
            .as_str()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc))?,
    })
}
