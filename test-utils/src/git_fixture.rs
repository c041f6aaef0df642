//! A throwaway git repository for [`learning_memory_core::git`] tests,
//! grounded on the CLI-driven fixture already used by `memory-core`'s own
//! `git::reader` unit tests: shell out to `git` rather than hand-build
//! objects through `git2`.

use std::process::Command;

use tempfile::TempDir;

/// A `git init`-ed temp directory with a configured test identity.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Initialize a fresh repository with no commits.
    #[must_use]
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let repo = Self { dir };
        repo.run(&["init", "-q"]);
        repo.run(&["config", "user.email", "test@example.com"]);
        repo.run(&["config", "user.name", "Test User"]);
        repo
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("failed to run git");
        assert!(output.status.success(), "git {args:?} failed: {}", String::from_utf8_lossy(&output.stderr));
    }

    /// Write `content` to `relative_path` (created if absent) and commit it.
    pub fn commit_file(&self, relative_path: &str, content: &str, message: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write fixture file");
        self.run(&["add", "."]);
        self.run(&["commit", "-q", "-m", message]);
    }
}
