//! Thin bootstrap binary: reads configuration from the environment, wires
//! the Turso-backed stores and the local ONNX embedders onto a
//! [`learning_memory_mcp::MemoryServer`], and serves it over MCP stdio.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::ServiceExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use learning_memory_core::config::MemoryConfig;
use learning_memory_core::embeddings::local::LocalTextEmbedder;
use learning_memory_core::embeddings::{EmbeddingRegistry, TextEmbedder};
use learning_memory_core::storage::{MetadataStore, VectorStore};
use learning_memory_mcp::MemoryServer;
use learning_memory_storage_turso::TursoStore;

/// Natural-language dimension of the default semantic model (all-MiniLM-L6-v2).
const DEFAULT_SEMANTIC_DIMENSION: usize = 384;
/// Code-tuned model dimension (jina-embeddings-v2-base-code).
const DEFAULT_CODE_DIMENSION: usize = 768;

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var).map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(default))
}

fn env_dimension(var: &str, default: usize) -> usize {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn load_embedder(name: &str, dimension: usize, model_path: PathBuf, tokenizer_path: PathBuf) -> Result<Arc<dyn TextEmbedder>> {
    let embedder = LocalTextEmbedder::load(name, dimension, &model_path, &tokenizer_path)
        .with_context(|| format!("failed to load {name} embedder from {}", model_path.display()))?;
    Ok(Arc::new(embedder))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting learning memory server");

    let config = MemoryConfig::from_env();
    let repo_path = std::env::var("MEMORY_REPO_PATH").unwrap_or_else(|_| ".".to_string());

    let store = Arc::new(TursoStore::open_local(&config.storage.db_path).await?);
    let vector_store: Arc<dyn VectorStore> = store.clone();
    let metadata_store: Arc<dyn MetadataStore> = store.clone();

    let code_model_path = env_path("MEMORY_CODE_MODEL_PATH", "./models/code-embedder.onnx");
    let code_tokenizer_path = env_path("MEMORY_CODE_TOKENIZER_PATH", "./models/code-tokenizer.json");
    let code_dimension = env_dimension("MEMORY_CODE_EMBEDDING_DIM", DEFAULT_CODE_DIMENSION);

    let semantic_model_path = env_path("MEMORY_SEMANTIC_MODEL_PATH", "./models/semantic-embedder.onnx");
    let semantic_tokenizer_path = env_path("MEMORY_SEMANTIC_TOKENIZER_PATH", "./models/semantic-tokenizer.json");
    let semantic_dimension = env_dimension("MEMORY_SEMANTIC_EMBEDDING_DIM", DEFAULT_SEMANTIC_DIMENSION);

    let embeddings = Arc::new(EmbeddingRegistry::new(
        Box::new(move || load_embedder("code", code_dimension, code_model_path.clone(), code_tokenizer_path.clone())),
        Box::new(move || {
            load_embedder(
                "semantic",
                semantic_dimension,
                semantic_model_path.clone(),
                semantic_tokenizer_path.clone(),
            )
        }),
    ));

    let server = MemoryServer::build(vector_store, metadata_store, embeddings, repo_path, &config)?;
    server.ensure_ghap_collections().await?;
    info!("server initialized, listening on stdio");

    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
