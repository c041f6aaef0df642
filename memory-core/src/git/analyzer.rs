//! Git Analyzer (spec §4.7, C8): incremental commit indexing, commit
//! search, churn hotspots, file authorship and blame search — layered on
//! top of [`super::reader::GitReader`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use tracing::warn;

use crate::embeddings::{EmbedderKind, EmbeddingRegistry};
use crate::error::{Error, IndexingErrorKind, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::storage::{CollectionGuard, Filter, MetadataStore, VectorStore};
use crate::types::{Commit, CommitIndexStats, CommitIndexingError, FileAuthor, GitIndexState};

use super::reader::GitReader;

pub const COMMITS_COLLECTION: &str = "commits";
const COMMIT_EMBED_BATCH_SIZE: usize = 75;
const HISTORY_WALK_CAP: usize = 10_000;
const FILES_TEXT_TRUNCATION: usize = 500;

/// A file whose churn (change frequency) qualifies it as a hotspot (spec
/// §4.7 `get_churn_hotspots`).
#[derive(Debug, Clone)]
pub struct ChurnHotspot {
    pub file_path: String,
    pub change_count: u32,
    pub insertions: u32,
    pub deletions: u32,
    pub authors: Vec<String>,
    pub last_changed: DateTime<Utc>,
}

/// One hit from [`GitAnalyzer::blame_search`]: a pattern match mapped back
/// to the blame range that produced the matching line.
#[derive(Debug, Clone)]
pub struct BlameSearchResult {
    pub file_path: String,
    pub line_number: u32,
    pub content: String,
    pub sha: String,
    pub author: String,
}

pub struct GitAnalyzer {
    repo_path: String,
    reader: GitReader,
    vector_store: Arc<dyn VectorStore>,
    metadata_store: Arc<dyn MetadataStore>,
    embeddings: Arc<EmbeddingRegistry>,
    guard: CollectionGuard,
    index_window_years: u32,
}

impl GitAnalyzer {
    #[must_use]
    pub fn new(
        repo_path: String,
        reader: GitReader,
        vector_store: Arc<dyn VectorStore>,
        metadata_store: Arc<dyn MetadataStore>,
        embeddings: Arc<EmbeddingRegistry>,
        index_window_years: u32,
    ) -> Self {
        let guard = CollectionGuard::new(vector_store.clone(), COMMITS_COLLECTION);
        Self {
            repo_path,
            reader,
            vector_store,
            metadata_store,
            embeddings,
            guard,
            index_window_years,
        }
    }

    /// `index_commits` (spec §4.7): incrementally indexes new commits since
    /// the last recorded cursor, falling back to a full reindex when forced,
    /// cold, or when history has been rewritten out from under the cursor.
    pub async fn index_commits(
        &self,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
        force: bool,
    ) -> Result<CommitIndexStats> {
        let dimension = self.embeddings.dimension(EmbedderKind::Semantic).await?;
        self.guard.ensure(dimension).await?;

        let state = self
            .metadata_store
            .get_git_index_state(&self.repo_path)
            .await?
            .unwrap_or_else(|| GitIndexState::fresh(self.repo_path.clone()));

        let mut rewrite_detected = false;

        let commits = if force || state.last_indexed_sha.is_none() {
            self.full_window_commits(since, limit).await?
        } else {
            let head = self.reader.get_head_sha().await?;
            if Some(&head) == state.last_indexed_sha.as_ref() {
                return Ok(CommitIndexStats::default());
            }

            let (commits, found) = self
                .reader
                .commits_since_cursor(state.last_indexed_sha.clone(), HISTORY_WALK_CAP)
                .await?;

            if found {
                commits
            } else {
                warn!("last_indexed_sha_not_found; history rewritten; full reindex");
                rewrite_detected = true;
                self.full_window_commits(since, limit).await?
            }
        };

        if commits.is_empty() {
            return Ok(CommitIndexStats {
                rewrite_detected,
                ..CommitIndexStats::default()
            });
        }

        let mut stats = CommitIndexStats {
            rewrite_detected,
            ..CommitIndexStats::default()
        };

        for chunk in commits.chunks(COMMIT_EMBED_BATCH_SIZE) {
            let texts: Vec<String> = chunk.iter().map(commit_embedding_text).collect();

            match self.embeddings.embed_batch(EmbedderKind::Semantic, &texts).await {
                Ok(vectors) => {
                    for (commit, vector) in chunk.iter().zip(vectors) {
                        self.upsert_commit(commit, vector).await?;
                        stats.commits_indexed += 1;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "batch embed failed; degrading to per-commit embedding");
                    for commit in chunk {
                        match self.embeddings.embed(EmbedderKind::Semantic, &commit_embedding_text(commit)).await {
                            Ok(vector) => {
                                if let Err(err) = self.upsert_commit(commit, vector).await {
                                    warn!(sha = %commit.sha, error = %err, "indexing error upserting commit");
                                    stats.commits_failed += 1;
                                    stats.errors.push(CommitIndexingError {
                                        sha: commit.sha.clone(),
                                        error_type: IndexingErrorKind::classify(&err),
                                        message: err.to_string(),
                                    });
                                } else {
                                    stats.commits_indexed += 1;
                                }
                            }
                            Err(err) => {
                                warn!(sha = %commit.sha, error = %err, "indexing error embedding commit");
                                stats.commits_failed += 1;
                                stats.errors.push(CommitIndexingError {
                                    sha: commit.sha.clone(),
                                    error_type: IndexingErrorKind::classify(&err),
                                    message: err.to_string(),
                                });
                            }
                        }
                    }
                }
            }
        }

        if stats.commits_indexed > 0 {
            let head = self.reader.get_head_sha().await?;
            self.metadata_store
                .upsert_git_index_state(&GitIndexState {
                    repo_path: self.repo_path.clone(),
                    last_indexed_sha: Some(head),
                    last_indexed_at: Some(Utc::now()),
                    commit_count: state.commit_count + stats.commits_indexed,
                })
                .await?;
        }

        Ok(stats)
    }

    async fn full_window_commits(&self, since: Option<DateTime<Utc>>, limit: Option<usize>) -> Result<Vec<Commit>> {
        let window_floor = Utc::now() - Duration::days(i64::from(self.index_window_years) * 365);
        let effective_since = since.map_or(window_floor, |s| s.max(window_floor));
        self.reader
            .get_commits(Some(effective_since), None, None, limit.unwrap_or(HISTORY_WALK_CAP))
            .await
    }

    async fn upsert_commit(&self, commit: &Commit, vector: Vec<f32>) -> Result<()> {
        let payload = serde_json::json!({
            "sha": commit.sha,
            "message": commit.message,
            "author": commit.author,
            "author_email": commit.author_email,
            "timestamp": commit.timestamp.to_rfc3339(),
            "files_changed": commit.files_changed,
            "file_count": commit.files_changed.len(),
            "insertions": commit.insertions,
            "deletions": commit.deletions,
            "indexed_at": Utc::now().to_rfc3339(),
            "repo_path": self.repo_path,
        });
        self.vector_store.upsert(COMMITS_COLLECTION, &commit.sha, vector, payload).await
    }

    /// `search_commits` (spec §4.7): semantic search over indexed commits,
    /// optionally narrowed by author and a timestamp floor.
    pub async fn search_commits(
        &self,
        query: &str,
        author: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let vector = self.embeddings.embed(EmbedderKind::Semantic, query).await?;

        let mut filter = Filter::new();
        if let Some(author) = author {
            filter = filter.with_equals("author", serde_json::json!(author));
        }
        if let Some(since) = since {
            filter = filter.with_gte("timestamp", serde_json::json!(since.to_rfc3339()));
        }
        let filter = (!filter.equals.is_empty() || filter.gte.is_some()).then_some(filter);

        let hits = self
            .vector_store
            .search(COMMITS_COLLECTION, &vector, limit, filter.as_ref())
            .await?;

        Ok(hits.into_iter().filter_map(|hit| commit_from_payload(&hit.payload)).collect())
    }

    /// `get_churn_hotspots` (spec §4.7): per-file change-frequency ranking
    /// over the last `days`, using per-commit per-file diff stats.
    pub async fn get_churn_hotspots(&self, days: i64, limit: usize, min_changes: u32) -> Result<Vec<ChurnHotspot>> {
        let since = Utc::now() - Duration::days(days);
        let commits = self.reader.get_commits_with_file_stats(Some(since), HISTORY_WALK_CAP).await?;

        struct Accumulator {
            change_count: u32,
            insertions: u32,
            deletions: u32,
            authors: std::collections::HashSet<String>,
            last_changed: DateTime<Utc>,
        }

        let mut by_file: HashMap<String, Accumulator> = HashMap::new();
        for commit in &commits {
            for (path, insertions, deletions) in &commit.files {
                let entry = by_file.entry(path.clone()).or_insert_with(|| Accumulator {
                    change_count: 0,
                    insertions: 0,
                    deletions: 0,
                    authors: std::collections::HashSet::new(),
                    last_changed: commit.timestamp,
                });
                entry.change_count += 1;
                entry.insertions += insertions;
                entry.deletions += deletions;
                entry.authors.insert(commit.author_email.clone());
                entry.last_changed = entry.last_changed.max(commit.timestamp);
            }
        }

        let mut hotspots: Vec<ChurnHotspot> = by_file
            .into_iter()
            .filter(|(_, acc)| acc.change_count >= min_changes)
            .map(|(file_path, acc)| ChurnHotspot {
                file_path,
                change_count: acc.change_count,
                insertions: acc.insertions,
                deletions: acc.deletions,
                authors: acc.authors.into_iter().collect(),
                last_changed: acc.last_changed,
            })
            .collect();

        hotspots.sort_by(|a, b| b.change_count.cmp(&a.change_count));
        hotspots.truncate(limit);
        Ok(hotspots)
    }

    /// `get_file_authors` (spec §4.7): aggregate authorship over a file's
    /// full commit history.
    pub async fn get_file_authors(&self, file_path: &str) -> Result<Vec<FileAuthor>> {
        let commits = self
            .reader
            .get_commits(None, None, Some(file_path.to_string()), HISTORY_WALK_CAP)
            .await?;

        let mut by_author: HashMap<(String, String), (u32, u32)> = HashMap::new();
        for commit in &commits {
            let entry = by_author.entry((commit.author.clone(), commit.author_email.clone())).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += commit.insertions;
        }

        let mut authors: Vec<FileAuthor> = by_author
            .into_iter()
            .map(|((author, author_email), (commit_count, lines_authored))| FileAuthor {
                author,
                author_email,
                commit_count,
                lines_authored,
            })
            .collect();
        authors.sort_by(|a, b| b.commit_count.cmp(&a.commit_count));
        Ok(authors)
    }

    /// `blame_search` (spec §4.7): grep for `pattern` across tracked files
    /// (optionally narrowed by `file_pattern`), then map each hit back to
    /// the blame range that produced it.
    pub async fn blame_search(
        &self,
        pattern: &str,
        file_pattern: Option<&str>,
        limit: usize,
    ) -> Result<Vec<BlameSearchResult>> {
        let regex = Regex::new(pattern).map_err(|e| Error::validation("pattern", e.to_string()))?;
        let glob_pattern = file_pattern.map(|p| glob::Pattern::new(p)).transpose().ok().flatten();

        let root = self.reader.get_repo_root().await?;
        let mut results = Vec::new();

        for entry in walkdir::WalkDir::new(&root).into_iter().filter_map(std::result::Result::ok) {
            if results.len() >= limit {
                break;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            let relative = path.strip_prefix(&root).unwrap_or(path);
            if let Some(glob_pattern) = &glob_pattern {
                if !glob_pattern.matches_path(relative) {
                    continue;
                }
            }

            let Ok(content) = std::fs::read_to_string(path) else { continue };
            let matching_lines: Vec<(usize, &str)> = content
                .lines()
                .enumerate()
                .filter(|(_, line)| regex.is_match(line))
                .collect();
            if matching_lines.is_empty() {
                continue;
            }

            let rel_str = relative.to_string_lossy().to_string();
            let Ok(blame) = self.reader.get_blame(rel_str.clone()).await else { continue };

            for (idx, line) in matching_lines {
                if results.len() >= limit {
                    break;
                }
                if let Some(blame_line) = blame.get(idx) {
                    results.push(BlameSearchResult {
                        file_path: rel_str.clone(),
                        line_number: idx as u32 + 1,
                        content: line.to_string(),
                        sha: blame_line.sha.clone(),
                        author: blame_line.author.clone(),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Convenience wrapper around [`crate::retry::RetryPolicy`] for callers
    /// that want index_commits retried with the spec's default backoff.
    #[must_use]
    pub fn default_retry_policy() -> RetryPolicy {
        RetryPolicy::with_config(RetryConfig::default())
    }
}

fn commit_embedding_text(commit: &Commit) -> String {
    let files_joined = commit.files_changed.join(", ");
    let files_truncated: String = files_joined.chars().take(FILES_TEXT_TRUNCATION).collect();
    format!("{}\n\nFiles: {files_truncated}\n\nAuthor: {}", commit.message, commit.author)
}

fn commit_from_payload(payload: &serde_json::Value) -> Option<Commit> {
    Some(Commit {
        sha: payload.get("sha")?.as_str()?.to_string(),
        message: payload.get("message")?.as_str()?.to_string(),
        author: payload.get("author")?.as_str()?.to_string(),
        author_email: payload.get("author_email")?.as_str().unwrap_or_default().to_string(),
        timestamp: payload
            .get("timestamp")?
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))?,
        files_changed: payload
            .get("files_changed")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|f| f.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        insertions: payload.get("insertions").and_then(serde_json::Value::as_u64).unwrap_or(0) as u32,
        deletions: payload.get("deletions").and_then(serde_json::Value::as_u64).unwrap_or(0) as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::mock::MockTextEmbedder;
    use crate::storage::InMemoryVectorStore;
    use async_trait::async_trait;
    use std::process::Command;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryMetadataStore {
        git_state: Mutex<HashMap<String, GitIndexState>>,
    }

    #[async_trait]
    impl MetadataStore for InMemoryMetadataStore {
        async fn get_indexed_file(&self, _project: &str, _file_path: &str) -> Result<Option<crate::types::IndexedFile>> {
            Ok(None)
        }
        async fn upsert_indexed_file(&self, _row: &crate::types::IndexedFile) -> Result<()> {
            Ok(())
        }
        async fn delete_indexed_file(&self, _project: &str, _file_path: &str) -> Result<()> {
            Ok(())
        }
        async fn list_indexed_files(&self, _project: Option<&str>) -> Result<Vec<crate::types::IndexedFile>> {
            Ok(Vec::new())
        }
        async fn get_git_index_state(&self, repo_path: &str) -> Result<Option<GitIndexState>> {
            Ok(self.git_state.lock().unwrap().get(repo_path).cloned())
        }
        async fn upsert_git_index_state(&self, state: &GitIndexState) -> Result<()> {
            self.git_state.lock().unwrap().insert(state.repo_path.clone(), state.clone());
            Ok(())
        }
        async fn get_setting(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn set_setting(&self, _key: &str, _value: &str) -> Result<()> {
            Ok(())
        }
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let run = |args: &[&str]| {
            Command::new("git").args(args).current_dir(dir.path()).output().unwrap();
        };
        run(&["init", "-q"]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("a.txt"), "hello\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "initial commit"]);
        dir
    }

    fn make_analyzer(repo_path: &std::path::Path) -> GitAnalyzer {
        let reader = GitReader::open(repo_path).unwrap();
        let vector_store: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new());
        let metadata_store: Arc<dyn MetadataStore> = Arc::new(InMemoryMetadataStore::default());
        let embeddings = Arc::new(EmbeddingRegistry::uniform(Box::new(|| {
            Ok(Arc::new(MockTextEmbedder::new("semantic-mock", 8)) as Arc<dyn crate::embeddings::TextEmbedder>)
        })));
        GitAnalyzer::new(
            repo_path.to_string_lossy().to_string(),
            reader,
            vector_store,
            metadata_store,
            embeddings,
            5,
        )
    }

    #[tokio::test]
    async fn index_commits_indexes_from_cold_start() {
        let dir = init_repo();
        let analyzer = make_analyzer(dir.path());
        let stats = analyzer.index_commits(None, None, false).await.unwrap();
        assert_eq!(stats.commits_indexed, 1);
        assert_eq!(stats.commits_failed, 0);
        assert!(!stats.rewrite_detected);
    }

    #[tokio::test]
    async fn index_commits_is_noop_when_already_at_head() {
        let dir = init_repo();
        let analyzer = make_analyzer(dir.path());
        analyzer.index_commits(None, None, false).await.unwrap();
        let second = analyzer.index_commits(None, None, false).await.unwrap();
        assert_eq!(second.commits_indexed, 0);
    }

    #[tokio::test]
    async fn search_commits_finds_indexed_commit() {
        let dir = init_repo();
        let analyzer = make_analyzer(dir.path());
        analyzer.index_commits(None, None, false).await.unwrap();

        let results = analyzer.search_commits("initial commit", None, None, 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "initial commit");
    }

    #[tokio::test]
    async fn get_churn_hotspots_counts_file_changes() {
        let dir = init_repo();
        let analyzer = make_analyzer(dir.path());
        let hotspots = analyzer.get_churn_hotspots(90, 10, 1).await.unwrap();
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].file_path, "a.txt");
        assert_eq!(hotspots[0].change_count, 1);
    }

    #[tokio::test]
    async fn get_file_authors_aggregates_commit_counts() {
        let dir = init_repo();
        let analyzer = make_analyzer(dir.path());
        let authors = analyzer.get_file_authors("a.txt").await.unwrap();
        assert_eq!(authors.len(), 1);
        assert_eq!(authors[0].commit_count, 1);
    }
}
