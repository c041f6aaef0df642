//! Data-model types (spec §3): one submodule per entity family, re-exported
//! here for convenient access as `memory_core::types::*`.

pub mod cluster;
pub mod code;
pub mod collection;
pub mod git;
pub mod ghap;
pub mod memory;

pub use cluster::{Cluster, ClusteringResult, Value, ValueValidation, MAX_VALUE_TEXT_LEN, MIN_CLUSTERABLE_VECTORS};
pub use code::{FileIndexOutcome, IndexStats, IndexedFile, IndexingError, SemanticUnit, UnitType};
pub use collection::{axis_collection_name, CollectionInfo, GHAP_AXIS_COLLECTIONS};
pub use git::{
    BlameLine, Commit, CommitIndexStats, CommitIndexingError, FileAuthor, FileChurn, FileHistoryEntry, GitIndexState,
};
pub use ghap::{AxisTexts, ConfidenceTier, GhapEntry, GhapUpdate, Lesson, OutcomeStatus, Resolution, RootCause};
pub use memory::{Memory, MemoryCategory};
