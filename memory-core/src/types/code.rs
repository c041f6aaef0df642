//! Types produced by the code parser and indexer (spec §3.1, §4.4-§4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexingErrorKind;

/// Kind of fragment a [`SemanticUnit`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Function,
    Class,
    Method,
    Module,
    Key,
}

/// A parsed code fragment (spec §3.1 SemanticUnit).
///
/// `id` is the 32-hex prefix of a strong hash of `(project, file_path,
/// qualified_name)` — deterministic so reindexing the same unit reuses the
/// same vector-store id instead of accumulating duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticUnit {
    pub id: String,
    pub project: String,
    pub name: String,
    pub qualified_name: String,
    pub unit_type: UnitType,
    pub signature: String,
    pub content: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub language: String,
    pub docstring: Option<String>,
    pub complexity: Option<u32>,
}

impl SemanticUnit {
    /// `start_line <= end_line` and, if set, `complexity >= 1` (spec invariant).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.start_line <= self.end_line && self.complexity.is_none_or(|c| c >= 1)
    }

    /// Derive the deterministic id for `(project, file_path, qualified_name)`.
    #[must_use]
    pub fn derive_id(project: &str, file_path: &str, qualified_name: &str) -> String {
        let key = format!("{project}\u{0}{file_path}\u{0}{qualified_name}");
        let full = crate::ids::content_hash(key.as_bytes());
        full[..32].to_string()
    }
}

/// Change-detection row per `(project, file_path)` (spec §3.1 IndexedFile).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedFile {
    pub project: String,
    pub file_path: String,
    pub content_hash: String,
    pub mtime: DateTime<Utc>,
    pub language: Option<String>,
    pub unit_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Outcome of indexing a single file (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileIndexOutcome {
    /// Content hash unchanged since the last index; nothing was re-embedded.
    Unchanged,
    /// Units were parsed, embedded and upserted.
    Indexed { unit_count: u32 },
    /// The file could not be parsed; no vectors were written (spec Non-goal).
    Skipped { reason: String },
}

/// One file that failed to index (spec §4.5 `errors[]`, §8): the run
/// continues past it rather than aborting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingError {
    pub path: String,
    pub error_type: IndexingErrorKind,
    pub message: String,
}

/// Aggregate result of indexing a directory tree (spec §4.5 `index_codebase`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub files_scanned: u32,
    pub files_indexed: u32,
    pub files_unchanged: u32,
    pub files_skipped: u32,
    pub units_indexed: u32,
    pub errors: Vec<IndexingError>,
    pub duration_ms: u64,
}
