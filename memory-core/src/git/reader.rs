//! Git Reader (spec §4.6, C7): read-only access to commit history, blame,
//! and repository metadata. `git2` is synchronous, so every public method
//! hands the actual repository access to `spawn_blocking` — the same
//! "hide a sync library behind an async wrapper" shape the teacher uses for
//! its own blocking I/O boundaries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::{Delta, DiffOptions, Repository, Sort};
use tracing::warn;

use crate::error::{Error, Result};
use crate::types::{BlameLine, Commit, FileHistoryEntry};

/// Read-only handle onto a git repository (spec §4.6).
#[derive(Clone)]
pub struct GitReader {
    repo_path: PathBuf,
}

/// One commit's per-file change stats, used by [`crate::git::analyzer`]'s
/// churn and authorship rollups (spec §4.7 "taken from per-file stats, not
/// commit totals"). Not part of the persisted data model.
#[derive(Debug, Clone)]
pub struct CommitFileStats {
    pub sha: String,
    pub author: String,
    pub author_email: String,
    pub timestamp: DateTime<Utc>,
    pub files: Vec<(String, u32, u32)>,
}

impl GitReader {
    /// Open `path` as a git repository. Fails with `Error::NotFound` if it
    /// is not one (spec "`RepositoryNotFoundError` on construction").
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let repo_path = path.into();
        Repository::discover(&repo_path)
            .map_err(|_| Error::not_found("repository", repo_path.display().to_string()))?;
        Ok(Self { repo_path })
    }

    fn open_repo(&self) -> Result<Repository> {
        Repository::discover(&self.repo_path).map_err(Error::from)
    }

    /// `get_commits` (spec §4.6): newest first, optionally bounded by
    /// `since`/`until`/`path`, capped at `limit`.
    pub async fn get_commits(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
        path: Option<String>,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&repo_path)?;
            walk_commits(&repo, since, until, path.as_deref(), limit)
        })
        .await
        .map_err(|e| Error::Internal(format!("git reader task panicked: {e}")))?
    }

    /// `get_blame` (spec §4.6): line-range-grouped attribution for
    /// `file_path`, relative to the repo root.
    pub async fn get_blame(&self, file_path: String) -> Result<Vec<BlameLine>> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&repo_path)?;
            blame_file(&repo, &file_path)
        })
        .await
        .map_err(|e| Error::Internal(format!("git reader task panicked: {e}")))?
    }

    /// `get_file_history` (spec §4.6): commits touching `file_path`, newest
    /// first, capped at `limit`.
    pub async fn get_file_history(&self, file_path: String, limit: usize) -> Result<Vec<FileHistoryEntry>> {
        let commits = self
            .get_commits(None, None, Some(file_path), limit)
            .await?;
        Ok(commits
            .into_iter()
            .map(|c| FileHistoryEntry {
                sha: c.sha,
                message: c.message,
                author: c.author,
                timestamp: c.timestamp,
            })
            .collect())
    }

    /// Walk commits newest-first up to `cap`, stopping as soon as
    /// `cursor_sha` is encountered (exclusive of the cursor commit itself).
    /// The returned bool is `true` iff the cursor was found within the cap —
    /// `false` signals a rewritten history to the caller (spec §4.7 step 4).
    pub async fn commits_since_cursor(&self, cursor_sha: Option<String>, cap: usize) -> Result<(Vec<Commit>, bool)> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&repo_path)?;
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
            if revwalk.push_head().is_err() && !repo.is_shallow() {
                return Ok((Vec::new(), true));
            }

            let mut commits = Vec::new();
            let mut found = cursor_sha.is_none();
            for oid in revwalk {
                if commits.len() >= cap {
                    break;
                }
                let oid = oid?;
                if let Some(cursor) = &cursor_sha {
                    if oid.to_string() == *cursor {
                        found = true;
                        break;
                    }
                }
                let commit = repo.find_commit(oid)?;
                let (files_changed, insertions, deletions) = diff_stats(&repo, &commit)?;
                commits.push(Commit {
                    sha: oid.to_string(),
                    message: commit.message().unwrap_or_default().trim().to_string(),
                    author: commit.author().name().unwrap_or_default().to_string(),
                    author_email: commit.author().email().unwrap_or_default().to_string(),
                    timestamp: git_time_to_utc(commit.time()),
                    files_changed,
                    insertions,
                    deletions,
                });
            }

            Ok((commits, found))
        })
        .await
        .map_err(|e| Error::Internal(format!("git reader task panicked: {e}")))?
    }

    /// Commits newer than `since`, up to `cap`, with per-file insertion/
    /// deletion stats (spec §4.7 churn/authorship rollups).
    pub async fn get_commits_with_file_stats(
        &self,
        since: Option<DateTime<Utc>>,
        cap: usize,
    ) -> Result<Vec<CommitFileStats>> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&repo_path)?;
            let mut revwalk = repo.revwalk()?;
            revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
            let _ = revwalk.push_head();

            let mut out = Vec::new();
            for oid in revwalk {
                if out.len() >= cap {
                    break;
                }
                let oid = oid?;
                let commit = repo.find_commit(oid)?;
                let timestamp = git_time_to_utc(commit.time());
                if let Some(since) = since {
                    if timestamp < since {
                        break;
                    }
                }

                let files = per_file_diff_stats(&repo, &commit)?;
                out.push(CommitFileStats {
                    sha: oid.to_string(),
                    author: commit.author().name().unwrap_or_default().to_string(),
                    author_email: commit.author().email().unwrap_or_default().to_string(),
                    timestamp,
                    files,
                });
            }
            Ok(out)
        })
        .await
        .map_err(|e| Error::Internal(format!("git reader task panicked: {e}")))?
    }

    /// Absolute repository root (the directory containing `.git`).
    pub async fn get_repo_root(&self) -> Result<PathBuf> {
        let repo = self.open_repo()?;
        repo.workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::InvalidState("repository has no working directory (bare repo)".into()))
    }

    /// The current HEAD commit sha, tolerant of a detached HEAD.
    pub async fn get_head_sha(&self) -> Result<String> {
        let repo_path = self.repo_path.clone();
        tokio::task::spawn_blocking(move || {
            let repo = Repository::discover(&repo_path)?;
            let head = repo.head()?;
            let oid = head.target().ok_or_else(|| Error::InvalidState("HEAD has no target".into()))?;
            Ok(oid.to_string())
        })
        .await
        .map_err(|e| Error::Internal(format!("git reader task panicked: {e}")))?
    }
}

fn walk_commits(
    repo: &Repository,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    path_filter: Option<&str>,
    limit: usize,
) -> Result<Vec<Commit>> {
    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    match revwalk.push_head() {
        Ok(()) => {}
        Err(err) if repo.is_shallow() => {
            warn!(error = %err, "shallow clone: returning available history only");
        }
        Err(err) => return Err(Error::from(err)),
    }

    let mut commits = Vec::new();
    for oid in revwalk {
        if commits.len() >= limit {
            break;
        }
        let oid = oid?;
        let commit = repo.find_commit(oid)?;

        let timestamp = git_time_to_utc(commit.time());
        if let Some(since) = since {
            if timestamp < since {
                break;
            }
        }
        if let Some(until) = until {
            if timestamp > until {
                continue;
            }
        }

        let (files_changed, insertions, deletions) = diff_stats(repo, &commit)?;

        if let Some(pattern) = path_filter {
            if !files_changed.iter().any(|f| f == pattern || f.starts_with(pattern)) {
                continue;
            }
        }

        commits.push(Commit {
            sha: oid.to_string(),
            message: commit.message().unwrap_or_default().trim().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            author_email: commit.author().email().unwrap_or_default().to_string(),
            timestamp,
            files_changed,
            insertions,
            deletions,
        });
    }

    Ok(commits)
}

/// Diff a commit against its first parent (spec §4.6 "merge commits
/// computed against their first parent, standard convention").
fn diff_stats(repo: &Repository, commit: &git2::Commit) -> Result<(Vec<String>, u32, u32)> {
    let tree = commit.tree()?;
    let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

    let mut opts = DiffOptions::new();
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

    let mut files = Vec::new();
    diff.foreach(
        &mut |delta, _| {
            if !matches!(delta.status(), Delta::Unmodified) {
                if let Some(path) = delta.new_file().path() {
                    files.push(path.to_string_lossy().to_string());
                }
            }
            true
        },
        None,
        None,
        None,
    )?;

    let stats = diff.stats()?;
    Ok((files, stats.insertions() as u32, stats.deletions() as u32))
}

/// Per-file insertion/deletion counts for a commit against its first parent
/// (spec §4.7: churn is summed from per-commit file diff stats).
fn per_file_diff_stats(repo: &Repository, commit: &git2::Commit) -> Result<Vec<(String, u32, u32)>> {
    let tree = commit.tree()?;
    let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

    let mut opts = DiffOptions::new();
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

    let mut stats = Vec::new();
    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else { continue };
        let Some(path) = delta.new_file().path() else { continue };
        let (_, insertions, deletions) = git2::Patch::from_diff(&diff, idx)?
            .map(|p| p.line_stats())
            .transpose()?
            .unwrap_or((0, 0, 0));
        stats.push((path.to_string_lossy().to_string(), insertions as u32, deletions as u32));
    }
    Ok(stats)
}

fn blame_file(repo: &Repository, file_path: &str) -> Result<Vec<BlameLine>> {
    let relative = Path::new(file_path);
    let blob = repo
        .head()
        .and_then(|h| h.peel_to_tree())
        .and_then(|tree| tree.get_path(relative).and_then(|entry| entry.to_object(repo)))
        .map_err(|_| Error::not_found("file", file_path.to_string()))?;

    let blob = blob
        .as_blob()
        .ok_or_else(|| Error::InvalidState(format!("{file_path} is not a regular file")))?;

    if blob.is_binary() {
        return Err(Error::InvalidState(format!("{file_path} is a binary file; blame unsupported")));
    }

    let content = std::str::from_utf8(blob.content())
        .map_err(|e| Error::Parse {
            kind: crate::error::ParseErrorKind::Encoding,
            path: file_path.into(),
            message: e.to_string(),
        })?;

    let blame = repo.blame_file(relative, None)?;
    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_number = idx as u32 + 1;
        if let Some(hunk) = blame.get_line(idx + 1) {
            let sha = hunk.final_commit_id().to_string();
            let author = hunk
                .final_signature()
                .name()
                .unwrap_or_default()
                .to_string();
            lines.push(BlameLine {
                line_number,
                sha,
                author,
                content: line.to_string(),
            });
        }
    }
    Ok(lines)
}

fn git_time_to_utc(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn init_repo() -> TempDir {
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

    #[tokio::test]
    async fn open_fails_on_non_repo_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitReader::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn get_commits_returns_newest_first() {
        let dir = init_repo();
        let reader = GitReader::open(dir.path()).unwrap();
        let commits = reader.get_commits(None, None, None, 10).await.unwrap();
        assert_eq!(commits.len(), 1);
        assert!(commits[0].has_valid_sha());
        assert_eq!(commits[0].message, "initial commit");
    }

    #[tokio::test]
    async fn get_head_sha_matches_latest_commit() {
        let dir = init_repo();
        let reader = GitReader::open(dir.path()).unwrap();
        let head = reader.get_head_sha().await.unwrap();
        let commits = reader.get_commits(None, None, None, 1).await.unwrap();
        assert_eq!(head, commits[0].sha);
    }

    #[tokio::test]
    async fn get_file_history_reports_touching_commits() {
        let dir = init_repo();
        let reader = GitReader::open(dir.path()).unwrap();
        let history = reader.get_file_history("a.txt".to_string(), 10).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
