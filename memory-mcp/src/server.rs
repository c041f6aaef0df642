//! MCP tool surface (spec §6.1): wires the twenty-five RPC operations onto
//! `learning-memory-core` components via `rmcp`'s tool router.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::Parameters;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};

use learning_memory_core::context::ContextAssembler;
use learning_memory_core::embeddings::EmbeddingRegistry;
use learning_memory_core::error::{Error, ErrorResponse};
use learning_memory_core::ghap::{GhapCollector, GhapPersister};
use learning_memory_core::git::analyzer::GitAnalyzer;
use learning_memory_core::git::reader::GitReader;
use learning_memory_core::learning::clusterer::Clusterer;
use learning_memory_core::learning::ValueStore;
use learning_memory_core::memory::MemoryStore;
use learning_memory_core::search::Searcher;
use learning_memory_core::storage::{MetadataStore, VectorStore};
use learning_memory_core::types::{Lesson, MemoryCategory, RootCause};

use crate::requests::*;

/// Everything a running server needs, wired once at bootstrap and shared
/// behind `Arc` across every tool call.
#[derive(Clone)]
pub struct MemoryServer {
    memory: Arc<MemoryStore>,
    searcher: Arc<Searcher>,
    code: Arc<learning_memory_core::code::indexer::CodeIndexer>,
    git_reader: Arc<GitReader>,
    git_analyzer: Arc<GitAnalyzer>,
    ghap_collector: Arc<GhapCollector>,
    ghap_persister: Arc<GhapPersister>,
    clusterer: Arc<Clusterer>,
    values: Arc<ValueStore>,
    context: Arc<ContextAssembler>,
    tool_router: ToolRouter<Self>,
}

#[allow(clippy::too_many_arguments)]
impl MemoryServer {
    #[must_use]
    pub fn new(
        memory: Arc<MemoryStore>,
        searcher: Arc<Searcher>,
        code: Arc<learning_memory_core::code::indexer::CodeIndexer>,
        git_reader: Arc<GitReader>,
        git_analyzer: Arc<GitAnalyzer>,
        ghap_collector: Arc<GhapCollector>,
        ghap_persister: Arc<GhapPersister>,
        clusterer: Arc<Clusterer>,
        values: Arc<ValueStore>,
        context: Arc<ContextAssembler>,
    ) -> Self {
        Self {
            memory,
            searcher,
            code,
            git_reader,
            git_analyzer,
            ghap_collector,
            ghap_persister,
            clusterer,
            values,
            context,
            tool_router: Self::tool_router(),
        }
    }

    /// Build every storage-backed component from a pair of trait objects
    /// and the shared embedding registry (used by the bootstrap binary).
    #[allow(clippy::similar_names)]
    pub fn build(
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        embeddings: Arc<EmbeddingRegistry>,
        repo_path: String,
        config: &learning_memory_core::config::MemoryConfig,
    ) -> learning_memory_core::error::Result<Self> {
        let memory = Arc::new(MemoryStore::new(vector_store.clone(), embeddings.clone()));
        let searcher = Arc::new(Searcher::new(vector_store.clone(), embeddings.clone()));
        let code = Arc::new(learning_memory_core::code::indexer::CodeIndexer::new(
            vector_store.clone(),
            metadata_store.clone(),
            embeddings.clone(),
        ));
        let git_reader = Arc::new(GitReader::open(&repo_path)?);
        let git_analyzer = Arc::new(GitAnalyzer::new(
            repo_path,
            (*git_reader).clone(),
            vector_store.clone(),
            metadata_store,
            embeddings.clone(),
            config.git.default_index_window_years,
        ));
        let journal = learning_memory_core::ghap::GhapJournal::new(config.ghap.journal_path.clone());
        let ghap_collector = Arc::new(GhapCollector::new(journal));
        let ghap_persister = Arc::new(GhapPersister::new(vector_store.clone(), embeddings.clone()));
        let clusterer = Arc::new(Clusterer::new(vector_store.clone(), config.clustering.clone()));
        let values = Arc::new(ValueStore::new(vector_store, embeddings, config.clustering.clone()));
        let context = Arc::new(ContextAssembler::new(searcher.clone(), values.clone(), config.context.clone()));

        Ok(Self::new(
            memory,
            searcher,
            code,
            git_reader,
            git_analyzer,
            ghap_collector,
            ghap_persister,
            clusterer,
            values,
            context,
        ))
    }

    /// The one eager step at startup: the GHAP axis collections must exist
    /// before `resolve_ghap` can persist into them. Everything else relies
    /// on its own lazy `CollectionGuard`.
    pub async fn ensure_ghap_collections(&self) -> learning_memory_core::error::Result<()> {
        self.ghap_persister.ensure_collections().await
    }
}

fn json_ok<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| error_envelope(&Error::from(e)))
}

/// Spec §6.1's RPC-visible error envelope: `{"error": {"type", "message"}}`.
fn error_envelope(err: &Error) -> String {
    let response = ErrorResponse::from(err);
    serde_json::to_string_pretty(&serde_json::json!({ "error": response }))
        .unwrap_or_else(|_| response.message)
}

fn category_of(s: &str) -> Result<MemoryCategory, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| error_envelope(&Error::validation("category", format!("unknown memory category `{s}`"))))
}

#[tool_router]
impl MemoryServer {
    #[tool(description = "Store a freeform memory (preference, fact, event, workflow, context, error, or decision) for later semantic retrieval.")]
    async fn store_memory(&self, Parameters(req): Parameters<StoreMemoryRequest>) -> Result<String, String> {
        let category = category_of(&req.category)?;
        let memory = self
            .memory
            .store_memory(&req.content, category, req.importance.unwrap_or(0.5), req.tags)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&memory)
    }

    #[tool(description = "Semantically retrieve stored memories matching a natural-language query, optionally filtered by category and minimum importance.")]
    async fn retrieve_memories(&self, Parameters(req): Parameters<RetrieveMemoriesRequest>) -> Result<String, String> {
        let category = req.category.as_deref().map(category_of).transpose()?;
        let memories = self
            .memory
            .retrieve_memories(&req.query, req.limit.unwrap_or(10), category, req.min_importance)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&memories)
    }

    #[tool(description = "List stored memories, newest first, optionally filtered by category.")]
    async fn list_memories(&self, Parameters(req): Parameters<ListMemoriesRequest>) -> Result<String, String> {
        let category = req.category.as_deref().map(category_of).transpose()?;
        let memories = self
            .memory
            .list_memories(category, req.limit.unwrap_or(20))
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&memories)
    }

    #[tool(description = "Delete a stored memory by id.")]
    async fn delete_memory(&self, Parameters(req): Parameters<DeleteMemoryRequest>) -> Result<String, String> {
        self.memory.delete_memory(&req.id).await.map_err(|e| error_envelope(&e))?;
        Ok(format!("deleted memory {}", req.id))
    }

    #[tool(description = "Index a directory of source files into semantic code units for search.")]
    async fn index_codebase(&self, Parameters(req): Parameters<IndexCodebaseRequest>) -> Result<String, String> {
        let stats = self
            .code
            .index_directory(
                std::path::Path::new(&req.root),
                &req.project,
                req.recursive,
                &req.exclude_patterns,
            )
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&stats)
    }

    #[tool(description = "Semantically search indexed code units by meaning, optionally filtered by project and language.")]
    async fn search_code(&self, Parameters(req): Parameters<SearchCodeRequest>) -> Result<String, String> {
        let results = self
            .searcher
            .search_code(&req.query, req.limit.unwrap_or(10), req.project.as_deref(), req.language.as_deref())
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&results)
    }

    #[tool(description = "Find code units semantically similar to an already-indexed unit by id.")]
    async fn find_similar_code(&self, Parameters(req): Parameters<FindSimilarCodeRequest>) -> Result<String, String> {
        let results = self
            .searcher
            .find_similar_code(&req.unit_id, req.limit.unwrap_or(10), req.project.as_deref())
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&results)
    }

    #[tool(description = "Incrementally index git commit history since the last indexed commit (or fully, when forced).")]
    async fn index_commits(&self, Parameters(req): Parameters<IndexCommitsRequest>) -> Result<String, String> {
        let stats = self
            .git_analyzer
            .index_commits(req.since, req.limit, req.force)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&stats)
    }

    #[tool(description = "Semantically search indexed commit messages, optionally filtered by author and a timestamp floor.")]
    async fn search_commits(&self, Parameters(req): Parameters<SearchCommitsRequest>) -> Result<String, String> {
        let results = self
            .searcher
            .search_commits(&req.query, req.limit.unwrap_or(10), req.author.as_deref(), req.since)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&results)
    }

    #[tool(description = "Get the commit history of a single file, newest first.")]
    async fn get_file_history(&self, Parameters(req): Parameters<GetFileHistoryRequest>) -> Result<String, String> {
        let history = self
            .git_reader
            .get_file_history(req.file_path, req.limit.unwrap_or(20))
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&history)
    }

    #[tool(description = "Rank files by recent change frequency (churn) over a trailing window of days.")]
    async fn get_churn_hotspots(&self, Parameters(req): Parameters<GetChurnHotspotsRequest>) -> Result<String, String> {
        let hotspots = self
            .git_analyzer
            .get_churn_hotspots(req.days.unwrap_or(90), req.limit.unwrap_or(20), req.min_changes.unwrap_or(1))
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&hotspots)
    }

    #[tool(description = "Aggregate commit authorship for a single file across its full history.")]
    async fn get_code_authors(&self, Parameters(req): Parameters<GetCodeAuthorsRequest>) -> Result<String, String> {
        let authors = self.git_analyzer.get_file_authors(&req.file_path).await.map_err(|e| error_envelope(&e))?;
        json_ok(&authors)
    }

    #[tool(description = "Start a new GHAP reflection entry (goal, hypothesis, action, prediction). Orphans any previously active entry.")]
    async fn start_ghap(&self, Parameters(req): Parameters<StartGhapRequest>) -> Result<String, String> {
        let entry = self
            .ghap_collector
            .create_ghap(&req.domain, &req.strategy, &req.goal, &req.hypothesis, &req.action, &req.prediction)
            .map_err(|e| error_envelope(&e))?;
        json_ok(&entry)
    }

    #[tool(description = "Update the active GHAP entry's fields and append a history note; bumps its iteration count.")]
    async fn update_ghap(&self, Parameters(req): Parameters<UpdateGhapRequest>) -> Result<String, String> {
        let entry = self
            .ghap_collector
            .update_ghap(
                req.hypothesis.as_deref(),
                req.action.as_deref(),
                req.prediction.as_deref(),
                req.strategy.as_deref(),
                req.note.as_deref(),
            )
            .map_err(|e| error_envelope(&e))?;
        json_ok(&entry)
    }

    #[tool(description = "Resolve the active GHAP entry as confirmed, falsified, or abandoned, then persist it into the four axis collections for later retrieval.")]
    async fn resolve_ghap(&self, Parameters(req): Parameters<ResolveGhapRequest>) -> Result<String, String> {
        let root_cause = match (req.root_cause_category, req.root_cause_description) {
            (Some(category), Some(description)) => Some(RootCause { category, description }),
            _ => None,
        };
        let lesson = req.lesson_takeaway.map(|takeaway| Lesson {
            what_worked: None,
            takeaway: Some(takeaway),
        });

        let entry = self
            .ghap_collector
            .resolve_ghap(&req.status, &req.result, req.surprise.as_deref(), root_cause, lesson)
            .map_err(|e| error_envelope(&e))?;

        self.ghap_persister.persist(&entry).await.map_err(|e| error_envelope(&e))?;
        json_ok(&entry)
    }

    #[tool(description = "Get the currently active GHAP entry, if any.")]
    async fn get_active_ghap(&self, Parameters(_req): Parameters<GetActiveGhapRequest>) -> Result<String, String> {
        let current = self.ghap_collector.get_current().map_err(|e| error_envelope(&e))?;
        json_ok(&current)
    }

    #[tool(description = "List resolved GHAP entries, newest first, optionally filtered by outcome status.")]
    async fn list_ghap_entries(&self, Parameters(req): Parameters<ListGhapEntriesRequest>) -> Result<String, String> {
        let entries = self
            .ghap_persister
            .list_resolved(req.outcome.as_deref(), req.limit.unwrap_or(20))
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&entries)
    }

    #[tool(description = "Run on-demand density-based clustering over one GHAP axis (full, strategy, surprise, or root_cause).")]
    async fn get_clusters(&self, Parameters(req): Parameters<GetClustersRequest>) -> Result<String, String> {
        let result = self.clusterer.cluster_axis(&req.axis).await.map_err(|e| error_envelope(&e))?;
        json_ok(&result)
    }

    #[tool(description = "Get the member entries of a single named cluster (as returned by get_clusters).")]
    async fn get_cluster_members(&self, Parameters(req): Parameters<GetClusterMembersRequest>) -> Result<String, String> {
        let cluster = self
            .clusterer
            .cluster_by_id(&req.cluster_id)
            .await
            .map_err(|e| error_envelope(&e))?
            .ok_or_else(|| error_envelope(&Error::not_found("cluster", req.cluster_id.clone())))?;
        json_ok(&cluster)
    }

    #[tool(description = "Check whether a candidate value/principle statement is admissible against a cluster's centroid, without storing it.")]
    async fn validate_value(&self, Parameters(req): Parameters<ValidateValueRequest>) -> Result<String, String> {
        let validation = self
            .values
            .validate_value_candidate(&req.text, &req.cluster_id)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&validation)
    }

    #[tool(description = "Store a value/principle statement once it has been admitted against a cluster's centroid.")]
    async fn store_value(&self, Parameters(req): Parameters<StoreValueRequest>) -> Result<String, String> {
        let value = self
            .values
            .store_value(&req.text, &req.cluster_id, &req.axis)
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&value)
    }

    #[tool(description = "List admitted values/principles, ranked by their originating cluster size, optionally filtered by axis.")]
    async fn list_values(&self, Parameters(req): Parameters<ListValuesRequest>) -> Result<String, String> {
        let values = self
            .values
            .list_values(req.axis.as_deref(), req.limit.unwrap_or(20))
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&values)
    }

    #[tool(description = "Semantically search resolved GHAP experiences on one axis, optionally filtered by domain, strategy, or outcome.")]
    async fn search_experiences(&self, Parameters(req): Parameters<SearchExperiencesRequest>) -> Result<String, String> {
        let results = self
            .searcher
            .search_experiences(
                &req.query,
                &req.axis,
                req.domain.as_deref(),
                req.strategy.as_deref(),
                req.outcome.as_deref(),
                req.limit.unwrap_or(10),
            )
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&results)
    }

    #[tool(description = "Assemble a budgeted, deduplicated markdown context document from a query across memories, code, experiences, values, and commits.")]
    async fn assemble_context(&self, Parameters(req): Parameters<AssembleContextRequest>) -> Result<String, String> {
        let formatted = self
            .context
            .assemble_context(
                &req.query,
                &req.context_types,
                req.limit.unwrap_or(10),
                req.max_tokens.unwrap_or(4000),
            )
            .await
            .map_err(|e| error_envelope(&e))?;
        json_ok(&formatted)
    }

    #[tool(description = "Assemble a premortem briefing for a domain (and optional strategy): common failures, strategy performance, surprises, root causes, and relevant principles.")]
    async fn get_premortem_context(&self, Parameters(req): Parameters<GetPremortemContextRequest>) -> Result<String, String> {
        let formatted = self
            .context
            .get_premortem_context(
                &req.domain,
                req.strategy.as_deref(),
                req.limit.unwrap_or(10),
                req.max_tokens.unwrap_or(4000),
            )
            .await;
        json_ok(&formatted)
    }
}

#[tool_handler]
impl ServerHandler for MemoryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "learning-memory-server".into(),
                title: Some("Learning Memory Server".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Stores and retrieves memories, indexed code, git history, and GHAP reflection \
                 experiences; clusters and admits values from resolved experiences; assembles \
                 budgeted markdown context for a query or a premortem briefing."
                    .into(),
            ),
        }
    }
}
