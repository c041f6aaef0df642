//! MCP tool request parameter types: one struct per RPC surface operation
//! (spec §6.1), deserialized by `rmcp`'s `Parameters<T>` wrapper and
//! schema-described via the re-exported `schemars`.

use rmcp::schemars;
use serde::Deserialize;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StoreMemoryRequest {
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub importance: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RetrieveMemoriesRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_importance: Option<f32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListMemoriesRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteMemoryRequest {
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IndexCodebaseRequest {
    pub root: String,
    pub project: String,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCodeRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FindSimilarCodeRequest {
    pub unit_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub project: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IndexCommitsRequest {
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchCommitsRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFileHistoryRequest {
    pub file_path: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetChurnHotspotsRequest {
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub min_changes: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetCodeAuthorsRequest {
    pub file_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StartGhapRequest {
    pub domain: String,
    pub strategy: String,
    pub goal: String,
    pub hypothesis: String,
    pub action: String,
    pub prediction: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateGhapRequest {
    #[serde(default)]
    pub hypothesis: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveGhapRequest {
    pub status: String,
    pub result: String,
    #[serde(default)]
    pub surprise: Option<String>,
    #[serde(default)]
    pub root_cause_category: Option<String>,
    #[serde(default)]
    pub root_cause_description: Option<String>,
    #[serde(default)]
    pub lesson_takeaway: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetActiveGhapRequest {}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListGhapEntriesRequest {
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetClustersRequest {
    pub axis: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetClusterMembersRequest {
    pub cluster_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ValidateValueRequest {
    pub text: String,
    pub cluster_id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct StoreValueRequest {
    pub text: String,
    pub cluster_id: String,
    pub axis: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListValuesRequest {
    #[serde(default)]
    pub axis: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchExperiencesRequest {
    pub query: String,
    #[serde(default = "default_full_axis")]
    pub axis: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AssembleContextRequest {
    pub query: String,
    #[serde(default)]
    pub context_types: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetPremortemContextRequest {
    pub domain: String,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
}

fn default_true() -> bool {
    true
}

fn default_full_axis() -> String {
    "full".to_string()
}
