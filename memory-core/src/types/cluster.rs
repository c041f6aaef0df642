//! Clustering and value-admission types (spec §3.1, §4.10-§4.11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum membership a clusterable axis must have before clustering runs
/// (spec §4.10 step 2).
pub const MIN_CLUSTERABLE_VECTORS: usize = 20;

/// Transient result of density-based clustering over one axis (spec §3.1
/// Cluster). Never persisted; recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub cluster_id: String,
    pub axis: String,
    pub label: i32,
    pub size: usize,
    pub centroid: Vec<f32>,
    pub member_ids: Vec<String>,
    pub avg_weight: Option<f32>,
}

impl Cluster {
    #[must_use]
    pub fn format_id(axis: &str, label: i32) -> String {
        format!("{axis}_{label}")
    }

    #[must_use]
    pub fn is_noise(&self) -> bool {
        self.label == -1
    }
}

/// Result of running the clusterer over an axis (spec §4.10 step 5): clusters
/// sorted by size descending, plus the noise count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub clusters: Vec<Cluster>,
    pub noise_count: usize,
}

/// Outcome of validating a candidate value statement against a cluster
/// centroid (spec §4.11 `validate_value_candidate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueValidation {
    pub valid: bool,
    pub similarity: Option<f32>,
    pub centroid_distance: f32,
    pub threshold_distance: f32,
    pub reason: Option<String>,
}

/// A principle statement admitted against a cluster (spec §3.1 Value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: String,
    pub text: String,
    pub axis: String,
    pub cluster_id: String,
    pub cluster_size: usize,
    pub similarity_to_centroid: f32,
    pub created_at: DateTime<Utc>,
}

pub const MAX_VALUE_TEXT_LEN: usize = 500;
