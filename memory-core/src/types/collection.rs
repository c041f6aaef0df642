//! Reflective vector-collection metadata (spec §3.1 CollectionInfo).

use serde::{Deserialize, Serialize};

/// `{name, dimension, vector_count}` for one vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub vector_count: u64,
}

/// The fixed set of axis collections the GHAP persister writes into
/// (spec §4.9).
pub const GHAP_AXIS_COLLECTIONS: &[&str] =
    &["ghap_full", "ghap_strategy", "ghap_surprise", "ghap_root_cause"];

/// Name of the collection backing a given axis.
#[must_use]
pub fn axis_collection_name(axis: &str) -> String {
    format!("ghap_{axis}")
}
