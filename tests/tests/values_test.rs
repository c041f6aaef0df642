//! Value admission (spec §4.10-§4.11): clustering requires a minimum
//! membership, and admission distance is exact when every cluster member
//! was embedded from byte-identical text (centroid, mean distance, and
//! stddev all collapse to the member vector / zero), so admit/reject is
//! provable without depending on the embedder's actual numbers.

use std::sync::Arc;

use learning_memory_core::config::ClusteringConfig;
use learning_memory_core::embeddings::mock::MockTextEmbedder;
use learning_memory_core::embeddings::{EmbedderKind, TextEmbedder};
use learning_memory_core::error::Error;
use learning_memory_core::learning::clusterer::Clusterer;
use learning_memory_core::learning::values::ValueStore;
use learning_memory_core::storage::{Distance, InMemoryVectorStore, VectorStore};
use learning_memory_core::types::MIN_CLUSTERABLE_VECTORS;
use learning_memory_test_utils::mock_embeddings;

const SEED_TEXT: &str = "tests should isolate shared state between runs";
const OTHER_TEXT: &str = "prefer composition over inheritance";

async fn seed_identical_cluster(vector_store: &Arc<dyn VectorStore>, axis: &str, count: usize) -> Vec<f32> {
    let embedder = MockTextEmbedder::new("seed", 16);
    let vector = embedder.embed(SEED_TEXT).await.unwrap();
    let collection = format!("ghap_{axis}");
    vector_store.create_collection(&collection, vector.len(), Distance::Cosine).await.unwrap();
    for i in 0..count {
        vector_store
            .upsert(&collection, &format!("member-{i}"), vector.clone(), serde_json::json!({}))
            .await
            .unwrap();
    }
    vector
}

#[tokio::test]
async fn clustering_below_the_minimum_membership_is_insufficient_data() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    seed_identical_cluster(&vector_store, "full", MIN_CLUSTERABLE_VECTORS - 1).await;

    let clusterer = Clusterer::new(vector_store, ClusteringConfig::default());
    let err = clusterer.cluster_axis("full").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InsufficientData { found, required } if found == MIN_CLUSTERABLE_VECTORS - 1 && required == MIN_CLUSTERABLE_VECTORS
    ));
}

#[tokio::test]
async fn identical_text_is_admitted_and_divergent_text_is_rejected() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    seed_identical_cluster(&vector_store, "full", MIN_CLUSTERABLE_VECTORS).await;

    let clusterer = Clusterer::new(vector_store.clone(), ClusteringConfig::default());
    let result = clusterer.cluster_axis("full").await.unwrap();
    assert_eq!(result.clusters.len(), 1, "identical vectors must collapse into a single cluster");
    let cluster = &result.clusters[0];
    assert_eq!(cluster.size, MIN_CLUSTERABLE_VECTORS);

    let values = ValueStore::new(vector_store, mock_embeddings(), ClusteringConfig::default());

    let same_text = values.validate_value_candidate(SEED_TEXT, &cluster.cluster_id).await.unwrap();
    assert!(same_text.valid, "a candidate identical to every cluster member must be admitted");
    assert_eq!(same_text.centroid_distance, 0.0);
    assert_eq!(same_text.threshold_distance, 0.0);

    let other_text = values.validate_value_candidate(OTHER_TEXT, &cluster.cluster_id).await.unwrap();
    assert!(!other_text.valid, "a divergent candidate must be rejected against a zero-width cluster");
    assert!(other_text.centroid_distance > other_text.threshold_distance);
}

#[tokio::test]
async fn store_value_persists_an_admitted_candidate_and_rejects_a_divergent_one() {
    let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
    seed_identical_cluster(&vector_store, "strategy", MIN_CLUSTERABLE_VECTORS).await;

    let clusterer = Clusterer::new(vector_store.clone(), ClusteringConfig::default());
    let result = clusterer.cluster_axis("strategy").await.unwrap();
    let cluster_id = result.clusters[0].cluster_id.clone();

    let values = ValueStore::new(vector_store, mock_embeddings(), ClusteringConfig::default());

    let stored = values.store_value(SEED_TEXT, &cluster_id, "strategy").await.unwrap();
    assert_eq!(stored.cluster_id, cluster_id);
    assert_eq!(stored.cluster_size, MIN_CLUSTERABLE_VECTORS);

    let err = values.store_value(OTHER_TEXT, &cluster_id, "strategy").await.unwrap_err();
    assert_eq!(err.kind(), learning_memory_core::error::ErrorKind::ValidationError);

    let listed = values.list_values(Some("strategy"), 10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, stored.id);
}
