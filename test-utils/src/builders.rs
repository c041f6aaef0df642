//! Entity builders for the Learning Memory Server's data model. Each
//! `create_test_*` function returns a minimal, valid instance; override
//! individual fields on the returned struct for anything more specific.

use chrono::Utc;

use learning_memory_core::types::{
    Commit, ConfidenceTier, GhapEntry, Lesson, Memory, MemoryCategory, OutcomeStatus, Resolution,
    RootCause, SemanticUnit, UnitType, Value,
};

/// A valid `preference` memory with importance 0.5 and no tags.
#[must_use]
pub fn create_test_memory(content: &str) -> Memory {
    Memory {
        id: uuid::Uuid::new_v4().to_string(),
        content: content.to_string(),
        category: MemoryCategory::Preference,
        importance: 0.5,
        tags: vec![],
        created_at: Utc::now(),
    }
}

/// A memory filed under `category` with the given `importance`.
#[must_use]
pub fn create_test_memory_with(content: &str, category: MemoryCategory, importance: f32) -> Memory {
    Memory {
        category,
        importance,
        ..create_test_memory(content)
    }
}

/// A well-formed Python function unit in project `proj`.
#[must_use]
pub fn create_test_semantic_unit(project: &str, file_path: &str, qualified_name: &str) -> SemanticUnit {
    SemanticUnit {
        id: SemanticUnit::derive_id(project, file_path, qualified_name),
        project: project.to_string(),
        name: qualified_name.rsplit('.').next().unwrap_or(qualified_name).to_string(),
        qualified_name: qualified_name.to_string(),
        unit_type: UnitType::Function,
        signature: format!("def {qualified_name}():"),
        content: format!("def {qualified_name}():\n    pass"),
        file_path: file_path.to_string(),
        start_line: 1,
        end_line: 2,
        language: "python".to_string(),
        docstring: None,
        complexity: Some(1),
    }
}

/// A commit with a deterministic 40-hex sha derived from `seed`.
#[must_use]
pub fn create_test_commit(seed: &str, message: &str) -> Commit {
    let full = learning_memory_core::ids::content_hash(seed.as_bytes());
    Commit {
        sha: full[..40].to_string(),
        message: message.to_string(),
        author: "Test Author".to_string(),
        author_email: "test@example.com".to_string(),
        timestamp: Utc::now(),
        files_changed: vec!["src/lib.rs".to_string()],
        insertions: 3,
        deletions: 1,
    }
}

/// An active (unresolved) GHAP entry with a valid domain/strategy pair.
#[must_use]
pub fn create_test_ghap_entry(domain: &str, strategy: &str) -> GhapEntry {
    GhapEntry {
        id: uuid::Uuid::new_v4().to_string(),
        domain: domain.to_string(),
        strategy: strategy.to_string(),
        goal: "make the failing test pass".to_string(),
        hypothesis: "the off-by-one is in the range bound".to_string(),
        action: "widen the upper bound by one".to_string(),
        prediction: "the test passes and no other test regresses".to_string(),
        iteration_count: 0,
        created_at: Utc::now(),
        history: vec![],
        resolution: None,
    }
}

/// The same entry, resolved as `confirmed` on the first iteration (Gold tier).
#[must_use]
pub fn create_resolved_ghap_entry(domain: &str, strategy: &str) -> GhapEntry {
    let mut entry = create_test_ghap_entry(domain, strategy);
    entry.resolution = Some(Resolution {
        status: OutcomeStatus::Confirmed,
        result: "test passed on the first try".to_string(),
        surprise: None,
        root_cause: None,
        lesson: Some(Lesson {
            what_worked: Some("checking the loop bound first".to_string()),
            takeaway: None,
        }),
        resolved_at: Utc::now(),
        confidence_tier: ConfidenceTier::Gold,
    });
    entry
}

/// A falsified entry with both `surprise` and `root_cause` set, as required
/// by `GhapEntry::validate_resolution`.
#[must_use]
pub fn create_falsified_ghap_entry(domain: &str, strategy: &str) -> GhapEntry {
    let mut entry = create_test_ghap_entry(domain, strategy);
    entry.iteration_count = 3;
    entry.resolution = Some(Resolution {
        status: OutcomeStatus::Falsified,
        result: "the fix did not resolve the test failure".to_string(),
        surprise: Some("the bound was already correct; the fixture data was stale".to_string()),
        root_cause: Some(RootCause {
            category: "wrong-assumption".to_string(),
            description: "assumed the bound was off by one without re-reading the fixture".to_string(),
        }),
        lesson: Some(Lesson {
            what_worked: None,
            takeaway: Some("re-read fixtures before touching bounds".to_string()),
        }),
        resolved_at: Utc::now(),
        confidence_tier: ConfidenceTier::Silver,
    });
    entry
}

/// An admitted value statement for `axis` against `cluster_id`.
#[must_use]
pub fn create_test_value(text: &str, axis: &str, cluster_id: &str) -> Value {
    Value {
        id: uuid::Uuid::new_v4().to_string(),
        text: text.to_string(),
        axis: axis.to_string(),
        cluster_id: cluster_id.to_string(),
        cluster_size: 5,
        similarity_to_centroid: 0.9,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_builder_produces_valid_memory() {
        let memory = create_test_memory("remember this");
        assert!(memory.validate().is_ok());
    }

    #[test]
    fn semantic_unit_builder_is_well_formed() {
        let unit = create_test_semantic_unit("proj", "src/lib.rs", "lib.foo");
        assert!(unit.is_well_formed());
    }

    #[test]
    fn commit_builder_has_valid_sha() {
        let commit = create_test_commit("seed", "a commit");
        assert!(commit.has_valid_sha());
    }

    #[test]
    fn ghap_builder_passes_body_validation() {
        let entry = create_test_ghap_entry("debugging", "systematic-elimination");
        assert!(GhapEntry::validate_body(
            &entry.domain,
            &entry.strategy,
            &entry.goal,
            &entry.hypothesis,
            &entry.action,
            &entry.prediction,
        )
        .is_ok());
        assert!(entry.is_active());
    }

    #[test]
    fn falsified_builder_satisfies_resolution_invariant() {
        let entry = create_falsified_ghap_entry("debugging", "root-cause-analysis");
        let resolution = entry.resolution.expect("falsified entry carries a resolution");
        assert!(resolution.surprise.is_some());
        assert!(resolution.root_cause.is_some());
    }
}
