//! Runtime configuration (spec §6.4).
//!
//! Embedding dimensions are never configured directly here — they are a
//! property of the model each [`crate::embeddings::EmbeddingRegistry`] loads,
//! and the [`crate::storage::guard::CollectionGuard`] discovers the effective
//! dimension at call time rather than trusting a config value.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration, assembled from defaults and overridden by
/// environment variables via [`MemoryConfig::from_env`].
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub storage: StorageConfig,
    pub git: GitConfig,
    pub ghap: GhapConfig,
    pub clustering: ClusteringConfig,
    pub context: ContextConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            git: GitConfig::default(),
            ghap: GhapConfig::default(),
            clustering: ClusteringConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

impl MemoryConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MEMORY_DB_PATH") {
            config.storage.db_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("MEMORY_JOURNAL_PATH") {
            config.ghap.journal_path = PathBuf::from(path);
        }

        if let Ok(years) = std::env::var("MEMORY_GIT_INDEX_YEARS") {
            match years.parse() {
                Ok(v) => config.git.default_index_window_years = v,
                Err(_) => tracing::warn!(
                    value = %years,
                    "invalid MEMORY_GIT_INDEX_YEARS, keeping default"
                ),
            }
        }

        if let Ok(size) = std::env::var("MEMORY_GIT_BATCH_SIZE") {
            match size.parse() {
                Ok(v) => config.git.commit_batch_size = v,
                Err(_) => tracing::warn!(
                    value = %size,
                    "invalid MEMORY_GIT_BATCH_SIZE, keeping default"
                ),
            }
        }

        if let Ok(min) = std::env::var("MEMORY_CLUSTER_MIN_SIZE") {
            match min.parse() {
                Ok(v) => config.clustering.min_cluster_size = v,
                Err(_) => tracing::warn!(
                    value = %min,
                    "invalid MEMORY_CLUSTER_MIN_SIZE, keeping default"
                ),
            }
        }

        if let Ok(tokens) = std::env::var("MEMORY_CONTEXT_TOKEN_BUDGET") {
            match tokens.parse() {
                Ok(v) => config.context.default_token_budget = v,
                Err(_) => tracing::warn!(
                    value = %tokens,
                    "invalid MEMORY_CONTEXT_TOKEN_BUDGET, keeping default"
                ),
            }
        }

        config
    }
}

/// Metadata/vector store location and connection shape.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./learning-memory.db"),
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Git reader/analyzer defaults (spec §4.7, §4.8).
#[derive(Debug, Clone)]
pub struct GitConfig {
    pub default_index_window_years: u32,
    pub commit_batch_size: usize,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_index_window_years: 5,
            commit_batch_size: 64,
        }
    }
}

/// GHAP journal location and persistence retry shape (spec §4.9, §4.10).
#[derive(Debug, Clone)]
pub struct GhapConfig {
    pub journal_path: PathBuf,
}

impl Default for GhapConfig {
    fn default() -> Self {
        Self {
            journal_path: PathBuf::from("./ghap-journal.json"),
        }
    }
}

/// Density-based clustering defaults (spec §4.10-§4.11).
#[derive(Debug, Clone)]
pub struct ClusteringConfig {
    pub min_cluster_size: usize,
    /// Minimum core-point neighborhood size for the density-based clusterer.
    pub min_samples: usize,
    pub value_admission_sigma: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 5,
            min_samples: 5,
            value_admission_sigma: 1.0,
        }
    }
}

/// Context assembler defaults (spec §4.14).
#[derive(Debug, Clone)]
pub struct ContextConfig {
    pub default_token_budget: usize,
    pub per_item_truncation_fraction: f64,
    pub fuzzy_dedup_threshold: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_token_budget: 4_000,
            per_item_truncation_fraction: 0.25,
            fuzzy_dedup_threshold: 0.90,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = MemoryConfig::default();
        assert_eq!(config.git.default_index_window_years, 5);
        assert_eq!(config.clustering.min_cluster_size, 5);
        assert!((config.context.fuzzy_dedup_threshold - 0.90).abs() < f64::EPSILON);
        assert!((config.context.per_item_truncation_fraction - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn from_env_overrides_git_window() {
        // SAFETY-free: test env vars are process-local to this test binary run,
        // and the crate does not spawn threads that read env concurrently here.
        unsafe {
            std::env::set_var("MEMORY_GIT_INDEX_YEARS", "2");
        }
        let config = MemoryConfig::from_env();
        assert_eq!(config.git.default_index_window_years, 2);
        unsafe {
            std::env::remove_var("MEMORY_GIT_INDEX_YEARS");
        }
    }

    #[test]
    fn from_env_ignores_unparseable_override() {
        unsafe {
            std::env::set_var("MEMORY_CLUSTER_MIN_SIZE", "not-a-number");
        }
        let config = MemoryConfig::from_env();
        assert_eq!(config.clustering.min_cluster_size, 5);
        unsafe {
            std::env::remove_var("MEMORY_CLUSTER_MIN_SIZE");
        }
    }
}
