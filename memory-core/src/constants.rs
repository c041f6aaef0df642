//! Canonical enumerations (spec §6.3).
//!
//! These are the single source of truth for validation *and* for any
//! RPC-facing schema generation built on top of this crate — a schema that
//! lists a different set of values than what [`validate_*`](crate::error)
//! accepts is a bug, not a feature.

/// Domains a GHAP entry can be filed under.
pub const DOMAINS: &[&str] = &[
    "debugging",
    "refactoring",
    "feature",
    "testing",
    "configuration",
    "documentation",
    "performance",
    "security",
    "integration",
];

/// Strategies a GHAP entry can record.
pub const STRATEGIES: &[&str] = &[
    "systematic-elimination",
    "trial-and-error",
    "research-first",
    "divide-and-conquer",
    "root-cause-analysis",
    "copy-from-similar",
    "check-assumptions",
    "read-the-error",
    "ask-user",
];

/// Root-cause categories usable on a falsified resolution.
pub const ROOT_CAUSE_CATEGORIES: &[&str] = &[
    "wrong-assumption",
    "missing-knowledge",
    "oversight",
    "environment-issue",
    "misleading-symptom",
    "incomplete-fix",
    "wrong-scope",
    "test-isolation",
    "timing-issue",
];

/// Resolution outcomes for a GHAP entry.
pub const OUTCOME_STATUS_VALUES: &[&str] = &["confirmed", "falsified", "abandoned"];

/// Projections of a resolved GHAP entry used for retrieval and clustering.
pub const VALID_AXES: &[&str] = &["full", "strategy", "surprise", "root_cause"];

/// Returns `true` if `value` is a member of `set`.
#[must_use]
pub fn is_member(set: &[&str], value: &str) -> bool {
    set.contains(&value)
}
