//! GHAP Collector (spec §4.8, C9): the single-active reflection-entry state
//! machine, backed by [`super::journal::GhapJournal`].

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{Error, Result};
use crate::ids::new_id;
use crate::types::{ConfidenceTier, GhapEntry, GhapUpdate, Lesson, Resolution, RootCause};

use super::journal::GhapJournal;

/// Owns the single-active-entry discipline over a [`GhapJournal`]. Callers
/// never see more than one entry "in flight" at a time; the `Mutex` here
/// only guards the in-process race between concurrent tool calls, not
/// cross-process access to the journal file.
pub struct GhapCollector {
    journal: GhapJournal,
    lock: Mutex<()>,
}

impl GhapCollector {
    #[must_use]
    pub fn new(journal: GhapJournal) -> Self {
        Self {
            journal,
            lock: Mutex::new(()),
        }
    }

    /// `create_ghap` (spec §4.8). If an entry is already active, it is
    /// considered orphaned: a warning is logged and a new entry replaces it.
    pub fn create_ghap(
        &self,
        domain: &str,
        strategy: &str,
        goal: &str,
        hypothesis: &str,
        action: &str,
        prediction: &str,
    ) -> Result<GhapEntry> {
        let _guard = self.lock.lock();

        GhapEntry::validate_body(domain, strategy, goal, hypothesis, action, prediction)?;

        if let Some(orphaned) = self.journal.read_active()? {
            warn!(
                orphaned_id = %orphaned.id,
                "creating a new GHAP entry while one was already active; previous entry is orphaned"
            );
        }

        let entry = GhapEntry {
            id: new_id().to_string(),
            domain: domain.to_string(),
            strategy: strategy.to_string(),
            goal: goal.to_string(),
            hypothesis: hypothesis.to_string(),
            action: action.to_string(),
            prediction: prediction.to_string(),
            iteration_count: 0,
            created_at: chrono::Utc::now(),
            history: Vec::new(),
            resolution: None,
        };

        self.journal.write_active(Some(&entry))?;
        self.journal
            .append_session_event(&serde_json::json!({"event": "created", "ghap_id": entry.id}))?;

        Ok(entry)
    }

    /// `update_ghap` (spec §4.8): requires an active entry; bumps
    /// `iteration_count` and appends a history note.
    pub fn update_ghap(
        &self,
        hypothesis: Option<&str>,
        action: Option<&str>,
        prediction: Option<&str>,
        strategy: Option<&str>,
        note: Option<&str>,
    ) -> Result<GhapEntry> {
        let _guard = self.lock.lock();

        let mut entry = self
            .journal
            .read_active()?
            .ok_or_else(|| Error::InvalidState("no active GHAP entry to update".into()))?;

        if let Some(strategy) = strategy {
            if !crate::constants::is_member(crate::constants::STRATEGIES, strategy) {
                return Err(Error::validation("strategy", format!("unknown strategy `{strategy}`")));
            }
            entry.strategy = strategy.to_string();
        }
        if let Some(hypothesis) = hypothesis {
            entry.hypothesis = hypothesis.to_string();
        }
        if let Some(action) = action {
            entry.action = action.to_string();
        }
        if let Some(prediction) = prediction {
            entry.prediction = prediction.to_string();
        }

        entry.iteration_count += 1;
        entry.history.push(GhapUpdate {
            at: chrono::Utc::now(),
            note: note.map(str::to_string),
        });

        self.journal.write_active(Some(&entry))?;
        self.journal
            .append_session_event(&serde_json::json!({"event": "updated", "ghap_id": entry.id}))?;

        Ok(entry)
    }

    /// `resolve_ghap` (spec §4.8): requires an active entry; writes the
    /// resolution into the journal (local durability), then clears "active".
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_ghap(
        &self,
        status: &str,
        result: &str,
        surprise: Option<&str>,
        root_cause: Option<RootCause>,
        lesson: Option<Lesson>,
    ) -> Result<GhapEntry> {
        let _guard = self.lock.lock();

        let mut entry = self
            .journal
            .read_active()?
            .ok_or_else(|| Error::InvalidState("no active GHAP entry to resolve".into()))?;

        let parsed_status = GhapEntry::validate_resolution(status, result, surprise, root_cause.as_ref())?;
        let confidence_tier = ConfidenceTier::derive(parsed_status, entry.iteration_count, lesson.as_ref());

        entry.resolution = Some(Resolution {
            status: parsed_status,
            result: result.to_string(),
            surprise: surprise.map(str::to_string),
            root_cause,
            lesson,
            resolved_at: chrono::Utc::now(),
            confidence_tier,
        });

        // Local durability first: the resolved entry is written to the
        // journal before the active slot is cleared, so a crash here never
        // loses the resolution.
        self.journal.write_active(Some(&entry))?;
        self.journal
            .append_session_event(&serde_json::json!({"event": "resolved", "ghap_id": entry.id, "status": status}))?;
        self.journal.write_active(None)?;

        Ok(entry)
    }

    /// `get_current` (spec §4.8): the active entry, or `None`.
    pub fn get_current(&self) -> Result<Option<GhapEntry>> {
        self.journal.read_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> GhapCollector {
        let dir = tempfile::tempdir().unwrap();
        let journal = GhapJournal::new(dir.path().join("current_ghap.json"));
        std::mem::forget(dir);
        GhapCollector::new(journal)
    }

    #[test]
    fn create_ghap_rejects_unknown_domain() {
        let collector = collector();
        let err = collector
            .create_ghap("not-a-domain", "research-first", "g", "h", "a", "p")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[test]
    fn create_then_get_current_round_trips() {
        let collector = collector();
        let entry = collector
            .create_ghap("debugging", "research-first", "goal", "hyp", "act", "pred")
            .unwrap();
        let current = collector.get_current().unwrap().unwrap();
        assert_eq!(current.id, entry.id);
        assert!(current.is_active());
    }

    #[test]
    fn update_ghap_requires_active_entry() {
        let collector = collector();
        let err = collector.update_ghap(None, None, None, None, Some("note")).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn update_ghap_increments_iteration_and_appends_history() {
        let collector = collector();
        collector
            .create_ghap("debugging", "research-first", "goal", "hyp", "act", "pred")
            .unwrap();
        let updated = collector.update_ghap(Some("new hyp"), None, None, None, Some("tried X")).unwrap();
        assert_eq!(updated.iteration_count, 1);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.hypothesis, "new hyp");
    }

    #[test]
    fn resolve_ghap_clears_active_and_computes_tier() {
        let collector = collector();
        collector
            .create_ghap("debugging", "research-first", "goal", "hyp", "act", "pred")
            .unwrap();
        let resolved = collector.resolve_ghap("confirmed", "it worked", None, None, None).unwrap();
        assert_eq!(resolved.resolution.as_ref().unwrap().confidence_tier, ConfidenceTier::Gold);
        assert!(collector.get_current().unwrap().is_none());
    }

    #[test]
    fn resolve_falsified_without_surprise_is_rejected_and_stays_active() {
        let collector = collector();
        collector
            .create_ghap("debugging", "research-first", "goal", "hyp", "act", "pred")
            .unwrap();
        let err = collector.resolve_ghap("falsified", "it broke", None, None, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
        assert!(collector.get_current().unwrap().is_some());
    }

    #[test]
    fn create_while_active_orphans_previous_entry() {
        let collector = collector();
        let first = collector
            .create_ghap("debugging", "research-first", "goal1", "hyp1", "act1", "pred1")
            .unwrap();
        let second = collector
            .create_ghap("refactoring", "divide-and-conquer", "goal2", "hyp2", "act2", "pred2")
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(collector.get_current().unwrap().unwrap().id, second.id);
    }
}
