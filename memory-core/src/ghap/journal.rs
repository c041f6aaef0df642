//! GHAP journal (spec §4.8, C9): local durability for the single active
//! entry plus an append-only session log. All writes to `current_ghap.json`
//! go through a temp-file-then-rename so a crash mid-write never leaves a
//! half-written file behind.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::types::GhapEntry;

/// Local-disk persistence for the GHAP single-active state machine.
pub struct GhapJournal {
    active_path: PathBuf,
    session_log_path: PathBuf,
}

impl GhapJournal {
    /// `active_path` is the `current_ghap.json` file; the session log is
    /// written alongside it with a `.jsonl` extension.
    #[must_use]
    pub fn new(active_path: impl Into<PathBuf>) -> Self {
        let active_path = active_path.into();
        let session_log_path = active_path.with_extension("jsonl");
        Self {
            active_path,
            session_log_path,
        }
    }

    /// The current active entry, or `None` if the journal is empty/absent.
    pub fn read_active(&self) -> Result<Option<GhapEntry>> {
        if !self.active_path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.active_path).map_err(Error::Io)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Overwrite the active-entry file with `entry` (or clear it when
    /// `None`), atomically.
    pub fn write_active(&self, entry: Option<&GhapEntry>) -> Result<()> {
        let contents = match entry {
            Some(entry) => serde_json::to_string_pretty(entry)?,
            None => String::new(),
        };
        atomic_write(&self.active_path, &contents)
    }

    /// Append one event line to the session log (one JSON object per line).
    pub fn append_session_event(&self, event: &serde_json::Value) -> Result<()> {
        use std::io::Write;

        let mut record = event.clone();
        if let Some(obj) = record.as_object_mut() {
            obj.entry("at").or_insert_with(|| serde_json::json!(Utc::now().to_rfc3339()));
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.session_log_path)
            .map_err(Error::Io)?;
        writeln!(file, "{record}").map_err(Error::Io)?;
        Ok(())
    }
}

/// Write `contents` to `path` via a sibling temp file + rename, so a reader
/// never observes a partially-written file.
fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(Error::Io)?;

    let tmp_name = format!(".{}.tmp-{}", path.file_name().and_then(|n| n.to_str()).unwrap_or("journal"), crate::ids::new_id());
    let tmp_path = parent.join(tmp_name);

    std::fs::write(&tmp_path, contents).map_err(Error::Io)?;
    std::fs::rename(&tmp_path, path).map_err(Error::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> GhapEntry {
        GhapEntry {
            id: crate::ids::new_id().to_string(),
            domain: "debugging".into(),
            strategy: "systematic-elimination".into(),
            goal: "fix the flaky test".into(),
            hypothesis: "race condition in setup".into(),
            action: "add a barrier".into(),
            prediction: "test passes reliably".into(),
            iteration_count: 0,
            created_at: Utc::now(),
            history: Vec::new(),
            resolution: None,
        }
    }

    #[test]
    fn read_active_is_none_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
        assert!(journal.read_active().unwrap().is_none());
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
        let entry = sample_entry();
        journal.write_active(Some(&entry)).unwrap();

        let read_back = journal.read_active().unwrap().unwrap();
        assert_eq!(read_back.id, entry.id);
    }

    #[test]
    fn write_none_clears_active_entry() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
        journal.write_active(Some(&sample_entry())).unwrap();
        journal.write_active(None).unwrap();
        assert!(journal.read_active().unwrap().is_none());
    }

    #[test]
    fn append_session_event_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
        journal.append_session_event(&serde_json::json!({"event": "created"})).unwrap();
        journal.append_session_event(&serde_json::json!({"event": "resolved"})).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("current_ghap.jsonl")).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.contains("\"event\":\"resolved\""));
    }
}
