//! Clusterer (spec §4.10, C11): on-demand density-based clustering over one
//! GHAP axis collection. Clusters are never persisted — every call rescans
//! the collection from scratch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClusteringConfig;
use crate::embeddings::similarity::{cosine_distance, normalize};
use crate::error::{Error, Result};
use crate::storage::VectorStore;
use crate::types::{axis_collection_name, Cluster, ClusteringResult, MIN_CLUSTERABLE_VECTORS};

/// Marks a point that didn't end up density-reachable from any core point.
const NOISE_LABEL: i32 = -1;

/// Runs `cluster_axis` (spec §4.10) against one axis collection.
///
/// The clustering itself is a density-based scheme in the HDBSCAN family: for
/// each point we compute its core distance (the distance to its
/// `min_samples`-th nearest neighbor), derive a neighborhood radius from the
/// mean core distance, then expand clusters the way DBSCAN does — any point
/// reachable from a core point joins that point's cluster, everything else is
/// noise. Clusters smaller than `min_cluster_size` are folded back into noise
/// to honor that knob without a full cluster-stability hierarchy.
pub struct Clusterer {
    vector_store: Arc<dyn VectorStore>,
    config: ClusteringConfig,
}

impl Clusterer {
    #[must_use]
    pub fn new(vector_store: Arc<dyn VectorStore>, config: ClusteringConfig) -> Self {
        Self { vector_store, config }
    }

    /// `cluster_axis(axis)` (spec §4.10).
    pub async fn cluster_axis(&self, axis: &str) -> Result<ClusteringResult> {
        let collection = axis_collection_name(axis);
        let records = self
            .vector_store
            .scroll(&collection, usize::MAX, None, true)
            .await?;

        if records.len() < MIN_CLUSTERABLE_VECTORS {
            return Err(Error::InsufficientData {
                found: records.len(),
                required: MIN_CLUSTERABLE_VECTORS,
            });
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let vectors: Vec<Vec<f32>> = records
            .iter()
            .map(|r| r.vector.clone().unwrap_or_default())
            .collect();
        let weights: Vec<Option<f32>> = records
            .iter()
            .map(|r| r.payload.get("weight").and_then(serde_json::Value::as_f64).map(|w| w as f32))
            .collect();

        let labels = self.density_cluster(&vectors);

        let mut by_label: HashMap<i32, Vec<usize>> = HashMap::new();
        for (idx, label) in labels.iter().enumerate() {
            by_label.entry(*label).or_default().push(idx);
        }

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut noise_count = by_label.get(&NOISE_LABEL).map_or(0, Vec::len);

        for (label, members) in by_label {
            if label == NOISE_LABEL {
                continue;
            }
            if members.len() < self.config.min_cluster_size {
                noise_count += members.len();
                continue;
            }

            let centroid = centroid_of(&members, &vectors);
            let member_ids: Vec<String> = members.iter().map(|&i| ids[i].clone()).collect();
            let member_weights: Vec<f32> = members.iter().filter_map(|&i| weights[i]).collect();
            let avg_weight = if member_weights.len() == members.len() && !member_weights.is_empty() {
                Some(member_weights.iter().sum::<f32>() / member_weights.len() as f32)
            } else {
                None
            };

            clusters.push(Cluster {
                cluster_id: Cluster::format_id(axis, label),
                axis: axis.to_string(),
                label,
                size: members.len(),
                centroid,
                member_ids,
                avg_weight,
            });
        }

        clusters.sort_by(|a, b| b.size.cmp(&a.size));

        Ok(ClusteringResult { clusters, noise_count })
    }

    /// Recompute a single named cluster (used by value admission, spec
    /// §4.11 step 3, to avoid the caller re-deriving the axis separately).
    pub async fn cluster_by_id(&self, cluster_id: &str) -> Result<Option<Cluster>> {
        let (axis, _) = parse_cluster_id(cluster_id)?;
        let result = self.cluster_axis(&axis).await?;
        Ok(result.clusters.into_iter().find(|c| c.cluster_id == cluster_id))
    }

    #[must_use]
    pub fn value_admission_sigma(&self) -> f64 {
        self.config.value_admission_sigma
    }

    fn density_cluster(&self, vectors: &[Vec<f32>]) -> Vec<i32> {
        let n = vectors.len();
        let min_samples = self.config.min_samples.max(1);

        let mut core_distances = vec![0.0_f32; n];
        for i in 0..n {
            let mut distances: Vec<f32> = (0..n)
                .filter(|&j| j != i)
                .map(|j| cosine_distance(&vectors[i], &vectors[j]))
                .collect();
            distances.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let kth_index = min_samples.saturating_sub(1).min(distances.len().saturating_sub(1));
            core_distances[i] = distances.get(kth_index).copied().unwrap_or(f32::MAX);
        }

        let eps = if core_distances.iter().all(|d| *d == f32::MAX) {
            0.0
        } else {
            let finite: Vec<f32> = core_distances.iter().copied().filter(|d| *d < f32::MAX).collect();
            finite.iter().sum::<f32>() / finite.len().max(1) as f32
        };

        let mut labels = vec![NOISE_LABEL; n];
        let mut visited = vec![false; n];
        let mut next_label = 0_i32;

        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;

            let neighbors = region_query(start, &vectors[start], vectors, eps);
            if neighbors.len() + 1 < min_samples {
                continue;
            }

            let label = next_label;
            next_label += 1;
            labels[start] = label;

            let mut queue = neighbors;
            let mut cursor = 0;
            while cursor < queue.len() {
                let point = queue[cursor];
                cursor += 1;

                if !visited[point] {
                    visited[point] = true;
                    let point_neighbors = region_query(point, &vectors[point], vectors, eps);
                    if point_neighbors.len() + 1 >= min_samples {
                        for candidate in point_neighbors {
                            if !queue.contains(&candidate) {
                                queue.push(candidate);
                            }
                        }
                    }
                }

                if labels[point] == NOISE_LABEL {
                    labels[point] = label;
                }
            }
        }

        labels
    }
}

/// Unit-normalized mean of the vectors at `members` (spec §4.10 step 4).
fn centroid_of(members: &[usize], vectors: &[Vec<f32>]) -> Vec<f32> {
    let dim = vectors.first().map_or(0, Vec::len);
    let mut sum = vec![0.0_f32; dim];
    for &idx in members {
        for (s, v) in sum.iter_mut().zip(&vectors[idx]) {
            *s += v;
        }
    }
    let count = members.len().max(1) as f32;
    for s in &mut sum {
        *s /= count;
    }
    normalize(sum)
}

fn region_query(origin: usize, point: &[f32], vectors: &[Vec<f32>], eps: f32) -> Vec<usize> {
    (0..vectors.len())
        .filter(|&j| j != origin && cosine_distance(point, &vectors[j]) <= eps)
        .collect()
}

/// Recovers `(axis, label)` from a `cluster_id` of the form `{axis}_{label}`
/// (spec §4.11 step 1: "Parse cluster_id; recover axis. Reject invalid
/// format.").
pub fn parse_cluster_id(cluster_id: &str) -> Result<(String, i32)> {
    let (axis, label) = cluster_id
        .rsplit_once('_')
        .ok_or_else(|| Error::validation("cluster_id", format!("malformed cluster id `{cluster_id}`")))?;
    let label: i32 = label
        .parse()
        .map_err(|_| Error::validation("cluster_id", format!("malformed cluster id `{cluster_id}`")))?;
    if !crate::constants::is_member(crate::constants::VALID_AXES, axis) {
        return Err(Error::validation("cluster_id", format!("unknown axis `{axis}` in cluster id")));
    }
    Ok((axis.to_string(), label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryVectorStore;

    async fn seed(store: &Arc<dyn VectorStore>, collection: &str, points: &[(&str, Vec<f32>)]) {
        store.create_collection(collection, points[0].1.len(), crate::storage::Distance::Cosine).await.unwrap();
        for (id, vector) in points {
            store
                .upsert(collection, id, vector.clone(), serde_json::json!({}))
                .await
                .unwrap();
        }
    }

    fn two_tight_groups(per_group: usize) -> Vec<(String, Vec<f32>)> {
        let mut points = Vec::new();
        for i in 0..per_group {
            points.push((format!("a{i}"), vec![1.0, 0.01 * i as f32, 0.0]));
        }
        for i in 0..per_group {
            points.push((format!("b{i}"), vec![0.0, 0.01 * i as f32, 1.0]));
        }
        points
    }

    #[tokio::test]
    async fn cluster_axis_fails_below_minimum_membership() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let owned: Vec<(String, Vec<f32>)> = (0..5).map(|i| (format!("p{i}"), vec![1.0, i as f32])).collect();
        let borrowed: Vec<(&str, Vec<f32>)> = owned.iter().map(|(id, v)| (id.as_str(), v.clone())).collect();
        seed(&store, "ghap_full", &borrowed).await;

        let clusterer = Clusterer::new(store, ClusteringConfig::default());
        let err = clusterer.cluster_axis("full").await.unwrap_err();
        assert!(matches!(err, Error::InsufficientData { found: 5, required: 20 }));
    }

    #[tokio::test]
    async fn cluster_axis_separates_two_dense_groups() {
        let store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let owned = two_tight_groups(12);
        let borrowed: Vec<(&str, Vec<f32>)> = owned.iter().map(|(id, v)| (id.as_str(), v.clone())).collect();
        seed(&store, "ghap_strategy", &borrowed).await;

        let mut config = ClusteringConfig::default();
        config.min_cluster_size = 3;
        config.min_samples = 3;
        let clusterer = Clusterer::new(store, config);
        let result = clusterer.cluster_axis("strategy").await.unwrap();

        assert!(!result.clusters.is_empty());
        for cluster in &result.clusters {
            assert!(!cluster.is_noise());
            assert_eq!(cluster.axis, "strategy");
            assert!((cluster.centroid.iter().map(|x| x * x).sum::<f32>().sqrt() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn parse_cluster_id_recovers_axis_and_label() {
        let (axis, label) = parse_cluster_id("strategy_3").unwrap();
        assert_eq!(axis, "strategy");
        assert_eq!(label, 3);
    }

    #[test]
    fn parse_cluster_id_handles_negative_noise_label() {
        let (axis, label) = parse_cluster_id("full_-1").unwrap();
        assert_eq!(axis, "full");
        assert_eq!(label, -1);
    }

    #[test]
    fn parse_cluster_id_rejects_unknown_axis() {
        assert!(parse_cluster_id("bogus_1").is_err());
    }

    #[test]
    fn parse_cluster_id_rejects_malformed_input() {
        assert!(parse_cluster_id("no-underscore").is_err());
    }
}
