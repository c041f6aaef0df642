//! Types produced by the git reader/analyzer (spec §3.1, §4.6-§4.7).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable historical record (spec §3.1 Commit). `sha` is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub files_changed: Vec<String>,
    pub insertions: u32,
    pub deletions: u32,
}

impl Commit {
    /// `sha` must be a 40-character hex string (spec invariant).
    #[must_use]
    pub fn has_valid_sha(&self) -> bool {
        self.sha.len() == 40 && self.sha.chars().all(|c| c.is_ascii_hexdigit())
    }
}

/// Per-repo indexing cursor (spec §3.1 GitIndexState).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitIndexState {
    pub repo_path: String,
    pub last_indexed_sha: Option<String>,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub commit_count: u32,
}

impl GitIndexState {
    #[must_use]
    pub fn fresh(repo_path: impl Into<String>) -> Self {
        Self {
            repo_path: repo_path.into(),
            last_indexed_sha: None,
            last_indexed_at: None,
            commit_count: 0,
        }
    }
}

/// A single line attribution from `git blame` (spec §4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlameLine {
    pub line_number: u32,
    pub sha: String,
    pub author: String,
    pub content: String,
}

/// One entry in a file's commit history (spec §4.6 `get_file_history`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHistoryEntry {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-file change-frequency statistic underlying churn ranking (spec §4.7,
/// Open Question resolution in [`crate::config`] docs / DESIGN.md: churn is
/// summed from per-commit file diff stats, not from each commit's total).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChurn {
    pub file_path: String,
    pub commit_count: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Aggregate authorship for a single file (spec §4.7 `get_code_authors`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAuthor {
    pub author: String,
    pub author_email: String,
    pub commit_count: u32,
    pub lines_authored: u32,
}

/// One commit that failed to index (spec §4.7 step 7): a batch-embed
/// fallback or a per-commit embed/upsert failure, without aborting the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitIndexingError {
    pub sha: String,
    pub error_type: crate::error::IndexingErrorKind,
    pub message: String,
}

/// Result of an incremental commit-indexing pass (spec §4.7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitIndexStats {
    pub commits_indexed: u32,
    pub commits_failed: u32,
    pub rewrite_detected: bool,
    pub errors: Vec<CommitIndexingError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_sha_is_forty_hex_chars() {
        let sha = "a".repeat(40);
        let commit = Commit {
            sha,
            message: String::new(),
            author: String::new(),
            author_email: String::new(),
            timestamp: Utc::now(),
            files_changed: vec![],
            insertions: 0,
            deletions: 0,
        };
        assert!(commit.has_valid_sha());
    }

    #[test]
    fn short_sha_is_invalid() {
        let mut commit = Commit {
            sha: "deadbeef".into(),
            message: String::new(),
            author: String::new(),
            author_email: String::new(),
            timestamp: Utc::now(),
            files_changed: vec![],
            insertions: 0,
            deletions: 0,
        };
        assert!(!commit.has_valid_sha());
        commit.sha = "g".repeat(40);
        assert!(!commit.has_valid_sha());
    }

    #[test]
    fn fresh_state_has_no_cursor() {
        let state = GitIndexState::fresh("/repo");
        assert!(state.last_indexed_sha.is_none());
        assert_eq!(state.commit_count, 0);
    }
}
