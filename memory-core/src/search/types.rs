//! Canonical typed search-result records (spec §4.12, §9 "Abstract/base vs
//! concrete"). Every other surface — the RPC layer, the Context Assembler —
//! re-exports these; none may redefine an equivalent record under a
//! different name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MemoryCategory, UnitType};

/// Result of `search_memories` (spec §4.12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySearchResult {
    pub id: String,
    pub content: String,
    pub category: MemoryCategory,
    pub importance: f32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

/// Result of `search_code` (spec §4.12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSearchResult {
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
    pub score: f32,
}

/// Result of `search_experiences` (spec §4.12): one axis-projection of a
/// resolved GHAP entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceSearchResult {
    pub ghap_id: String,
    pub axis: String,
    pub domain: String,
    pub strategy: String,
    pub goal: String,
    pub hypothesis: String,
    pub action: String,
    pub prediction: String,
    pub outcome_status: String,
    pub outcome_result: String,
    pub surprise: Option<String>,
    pub root_cause: Option<serde_json::Value>,
    pub lesson: Option<serde_json::Value>,
    pub confidence_tier: String,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

/// Result of `search_values` (spec §4.12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSearchResult {
    pub id: String,
    pub text: String,
    pub axis: String,
    pub cluster_id: String,
    pub cluster_size: usize,
    pub similarity_to_centroid: f32,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

/// Result of `search_commits` (spec §4.12).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSearchResult {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub files_changed: Vec<String>,
    pub insertions: u32,
    pub deletions: u32,
    pub score: f32,
}
