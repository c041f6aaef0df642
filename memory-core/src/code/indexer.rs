//! Code Indexer (spec §4.5, C6): orchestrates the parser (C5), the
//! embedding registry (C1), and the vector/metadata stores (C2-C4) into the
//! file- and directory-level indexing operations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::warn;

use crate::config::MemoryConfig;
use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::{Error, IndexingErrorKind, Result};
use crate::ids::content_hash;
use crate::storage::{CollectionGuard, Filter, MetadataStore, VectorStore};
use crate::types::{IndexStats, IndexedFile, IndexingError, SemanticUnit};

use super::parser::{detect_language, parse_file};

/// Maximum units embedded in a single batch call (spec §4.5 step 7).
pub const EMBEDDING_BATCH_SIZE: usize = 100;

/// Truncation length applied to a unit's content when building its embedding
/// text (spec §4.5 step 6, "≈2000 chars by default").
const EMBED_CONTENT_TRUNCATION: usize = 2_000;

pub const CODE_COLLECTION: &str = "code_units";

/// Orchestrates parsing, embedding and storage for the code-indexing surface
/// (spec §4.5).
pub struct CodeIndexer {
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    embeddings: Arc<EmbeddingRegistry>,
    guard: CollectionGuard,
}

impl CodeIndexer {
    #[must_use]
    pub fn new(
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        embeddings: Arc<EmbeddingRegistry>,
    ) -> Self {
        let guard = CollectionGuard::new(vector_store.clone(), CODE_COLLECTION);
        Self {
            vector_store,
            metadata_store,
            embeddings,
            guard,
        }
    }

    /// Index a single file (spec §4.5 `index_file`). Returns the number of
    /// units written; `0` covers both "unchanged" and "unparseable".
    pub async fn index_file(&self, path: &Path, project: &str) -> Result<u32> {
        let dimension = self.embeddings.dimension(EmbedderKind::Code).await?;
        self.guard.ensure(dimension).await?;

        let file_path = path.to_string_lossy().to_string();

        if !self.needs_reindex(path, project).await? {
            return Ok(0);
        }

        let Some(language) = detect_language(path) else {
            return Ok(0);
        };

        let bytes = std::fs::read(path).map_err(Error::Io)?;
        let units = match parse_file(&bytes, &file_path, project, language) {
            Ok(units) => units,
            Err(err) => {
                warn!(file = %file_path, error = %err, "skipping file: parse error");
                return Ok(0);
            }
        };

        // Orphan-prevention invariant: delete before insert for this
        // (project, file_path), regardless of whether re-parsing produced
        // any units at all (spec §4.5 step 5).
        self.delete_file_units(project, &file_path).await?;

        if units.is_empty() {
            self.metadata_store.delete_indexed_file(project, &file_path).await?;
            return Ok(0);
        }

        self.embed_and_upsert(&units).await?;

        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        self.metadata_store
            .upsert_indexed_file(&IndexedFile {
                project: project.to_string(),
                file_path: file_path.clone(),
                content_hash: content_hash(&bytes),
                mtime,
                language: Some(language.as_str().to_string()),
                unit_count: units.len() as u32,
                indexed_at: Utc::now(),
            })
            .await?;

        Ok(units.len() as u32)
    }

    async fn embed_and_upsert(&self, units: &[SemanticUnit]) -> Result<()> {
        for chunk in units.chunks(EMBEDDING_BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(embedding_text).collect();
            let vectors = self.embeddings.embed_batch(EmbedderKind::Code, &texts).await?;

            for (unit, vector) in chunk.iter().zip(vectors) {
                let payload = serde_json::json!({
                    "project": unit.project,
                    "file_path": unit.file_path,
                    "name": unit.name,
                    "qualified_name": unit.qualified_name,
                    "unit_type": unit.unit_type,
                    "signature": unit.signature,
                    "content": unit.content,
                    "language": unit.language,
                    "start_line": unit.start_line,
                    "end_line": unit.end_line,
                    "line_count": unit.end_line.saturating_sub(unit.start_line) + 1,
                    "complexity": unit.complexity,
                    "docstring": unit.docstring,
                    "has_docstring": unit.docstring.is_some(),
                    "indexed_at": Utc::now().to_rfc3339(),
                });
                self.vector_store
                    .upsert(CODE_COLLECTION, &unit.id, vector, payload)
                    .await?;
            }
        }
        Ok(())
    }

    /// `needs_reindex` (spec §4.5): missing row → true; unchanged mtime →
    /// false (fast path); else compare content hash.
    pub async fn needs_reindex(&self, path: &Path, project: &str) -> Result<bool> {
        let file_path = path.to_string_lossy().to_string();
        let Some(row) = self.metadata_store.get_indexed_file(project, &file_path).await? else {
            return Ok(true);
        };

        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map(chrono::DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        if mtime <= row.mtime {
            return Ok(false);
        }

        let bytes = std::fs::read(path).map_err(Error::Io)?;
        Ok(content_hash(&bytes) != row.content_hash)
    }

    async fn delete_file_units(&self, project: &str, file_path: &str) -> Result<()> {
        let filter = Filter::default()
            .with_equals("project", serde_json::json!(project))
            .with_equals("file_path", serde_json::json!(file_path));
        let stale = self
            .vector_store
            .scroll(CODE_COLLECTION, usize::MAX, Some(&filter), false)
            .await?;
        for record in stale {
            self.vector_store.delete(CODE_COLLECTION, &record.id).await?;
        }
        Ok(())
    }

    /// Walk `root` (spec §4.5 `index_directory`), skipping extensions the
    /// parser doesn't recognize and paths matched by `exclude_patterns`. A
    /// single file's failure is logged and never aborts the walk.
    pub async fn index_directory(
        &self,
        root: &Path,
        project: &str,
        recursive: bool,
        exclude_patterns: &[String],
    ) -> Result<IndexStats> {
        let excludes: Vec<glob::Pattern> = exclude_patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        let walker = if recursive {
            walkdir::WalkDir::new(root)
        } else {
            walkdir::WalkDir::new(root).max_depth(1)
        };

        let started_at = Instant::now();
        let mut stats = IndexStats::default();

        for entry in walker.into_iter().filter_map(std::result::Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if detect_language(path).is_none() {
                continue;
            }
            if excludes.iter().any(|pat| pat.matches_path(path)) {
                continue;
            }

            stats.files_scanned += 1;
            match self.index_file(path, project).await {
                Ok(0) => stats.files_unchanged += 1,
                Ok(n) => {
                    stats.files_indexed += 1;
                    stats.units_indexed += n;
                }
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "failed to index file");
                    stats.files_skipped += 1;
                    stats.errors.push(IndexingError {
                        path: path.display().to_string(),
                        error_type: IndexingErrorKind::classify(&err),
                        message: err.to_string(),
                    });
                }
            }
        }

        stats.duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(stats)
    }

    /// Delete all vectors and the metadata row for `(project, path)`; return
    /// the number of vectors removed.
    pub async fn remove_file(&self, path: &Path, project: &str) -> Result<u64> {
        let file_path = path.to_string_lossy().to_string();
        let filter = Filter::default()
            .with_equals("project", serde_json::json!(project))
            .with_equals("file_path", serde_json::json!(file_path));
        let count = self.vector_store.count(CODE_COLLECTION, Some(&filter)).await?;
        self.delete_file_units(project, &file_path).await?;
        self.metadata_store.delete_indexed_file(project, &file_path).await?;
        Ok(count)
    }

    /// Remove every indexed file belonging to `project`.
    pub async fn remove_project(&self, project: &str) -> Result<u64> {
        let rows = self.metadata_store.list_indexed_files(Some(project)).await?;
        let mut total = 0u64;
        for row in rows {
            total += self.remove_file(Path::new(&row.file_path), project).await?;
        }
        Ok(total)
    }

    /// Roll up per-language row counts for `project` (or all projects).
    pub async fn get_indexing_stats(&self, project: Option<&str>) -> Result<HashMap<String, u32>> {
        let rows = self.metadata_store.list_indexed_files(project).await?;
        let mut histogram = HashMap::new();
        for row in rows {
            let key = row.language.unwrap_or_else(|| "unknown".to_string());
            *histogram.entry(key).or_insert(0) += 1;
        }
        Ok(histogram)
    }
}

/// Build the text passed to the embedder for a unit (spec §4.5 step 6).
fn embedding_text(unit: &SemanticUnit) -> String {
    let docstring = unit.docstring.as_deref().unwrap_or("");
    let truncated: String = unit.content.chars().take(EMBED_CONTENT_TRUNCATION).collect();
    format!("{}\n\n{docstring}\n\n{truncated}", unit.signature)
}
