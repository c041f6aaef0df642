//! The GHAP reflection state machine's entities (spec §3.1, §4.8-§4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{is_member, DOMAINS, OUTCOME_STATUS_VALUES, STRATEGIES};
use crate::error::{Error, Result};

pub const MAX_GHAP_BODY_LEN: usize = 1_000;
pub const MAX_RESOLUTION_BODY_LEN: usize = 2_000;

/// Resolution outcome (spec §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Confirmed,
    Falsified,
    Abandoned,
}

impl OutcomeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Falsified => "falsified",
            Self::Abandoned => "abandoned",
        }
    }
}

/// Confidence tier assigned to a resolved entry (spec §3.1 derivation rule).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Gold,
    Silver,
    Bronze,
    Abandoned,
}

impl ConfidenceTier {
    /// Derive the tier for a resolution (spec §3.1): `abandoned` always maps
    /// to `abandoned`; `confirmed` scales with iteration count; `falsified`
    /// depends on whether a `what_worked` lesson was recorded.
    #[must_use]
    pub fn derive(status: OutcomeStatus, iteration_count: u32, lesson: Option<&Lesson>) -> Self {
        match status {
            OutcomeStatus::Abandoned => Self::Abandoned,
            OutcomeStatus::Confirmed => match iteration_count {
                0 | 1 => Self::Gold,
                2..=3 => Self::Silver,
                _ => Self::Bronze,
            },
            OutcomeStatus::Falsified => {
                if lesson.is_some_and(|l| l.what_worked.is_some()) {
                    Self::Silver
                } else {
                    Self::Bronze
                }
            }
        }
    }
}

/// Root-cause attribution recorded on a falsified resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCause {
    pub category: String,
    pub description: String,
}

/// What was learned from resolving the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub what_worked: Option<String>,
    pub takeaway: Option<String>,
}

/// One recorded update to an active entry (spec §3.1 `history[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhapUpdate {
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// The resolution payload carried once an entry leaves the active state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub status: OutcomeStatus,
    pub result: String,
    pub surprise: Option<String>,
    pub root_cause: Option<RootCause>,
    pub lesson: Option<Lesson>,
    pub resolved_at: DateTime<Utc>,
    pub confidence_tier: ConfidenceTier,
}

/// A reflection record (spec §3.1 GHAPEntry). `resolution` is `None` while
/// the entry is the journal's single active entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GhapEntry {
    pub id: String,
    pub domain: String,
    pub strategy: String,
    pub goal: String,
    pub hypothesis: String,
    pub action: String,
    pub prediction: String,
    pub iteration_count: u32,
    pub created_at: DateTime<Utc>,
    pub history: Vec<GhapUpdate>,
    pub resolution: Option<Resolution>,
}

impl GhapEntry {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.resolution.is_none()
    }

    /// Validate the GHAP body fields (spec §4.8 `create_ghap` rejection rules).
    pub fn validate_body(
        domain: &str,
        strategy: &str,
        goal: &str,
        hypothesis: &str,
        action: &str,
        prediction: &str,
    ) -> Result<()> {
        if !is_member(DOMAINS, domain) {
            return Err(Error::validation("domain", format!("unknown domain `{domain}`")));
        }
        if !is_member(STRATEGIES, strategy) {
            return Err(Error::validation(
                "strategy",
                format!("unknown strategy `{strategy}`"),
            ));
        }
        for (field, value) in [
            ("goal", goal),
            ("hypothesis", hypothesis),
            ("action", action),
            ("prediction", prediction),
        ] {
            validate_body_field(field, value, MAX_GHAP_BODY_LEN)?;
        }
        Ok(())
    }

    /// Validate a resolution before it is written (spec §4.8 `resolve_ghap`).
    pub fn validate_resolution(
        status: &str,
        result: &str,
        surprise: Option<&str>,
        root_cause: Option<&RootCause>,
    ) -> Result<OutcomeStatus> {
        if !is_member(OUTCOME_STATUS_VALUES, status) {
            return Err(Error::validation("status", format!("unknown status `{status}`")));
        }
        validate_body_field("result", result, MAX_RESOLUTION_BODY_LEN)?;
        if let Some(s) = surprise {
            validate_body_field("surprise", s, MAX_RESOLUTION_BODY_LEN)?;
        }
        if let Some(rc) = root_cause {
            validate_body_field("root_cause.description", &rc.description, MAX_RESOLUTION_BODY_LEN)?;
        }

        let parsed = match status {
            "confirmed" => OutcomeStatus::Confirmed,
            "falsified" => OutcomeStatus::Falsified,
            "abandoned" => OutcomeStatus::Abandoned,
            other => unreachable!("validated against OUTCOME_STATUS_VALUES: {other}"),
        };

        if parsed == OutcomeStatus::Falsified && (surprise.is_none() || root_cause.is_none()) {
            return Err(Error::validation(
                "surprise/root_cause",
                "falsified resolutions require both surprise and root_cause",
            ));
        }

        Ok(parsed)
    }
}

fn validate_body_field(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    if value.chars().count() > max_len {
        return Err(Error::validation(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

/// The four axis-text projections of a resolved [`GhapEntry`] (spec §4.9).
/// `full` is always present; the others are `None` when their source text
/// would be empty.
#[derive(Debug, Clone, Default)]
pub struct AxisTexts {
    pub full: String,
    pub strategy: Option<String>,
    pub surprise: Option<String>,
    pub root_cause: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_first_iteration_is_gold() {
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 1, None),
            ConfidenceTier::Gold
        );
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 0, None),
            ConfidenceTier::Gold
        );
    }

    #[test]
    fn confirmed_mid_iterations_is_silver() {
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 2, None),
            ConfidenceTier::Silver
        );
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 3, None),
            ConfidenceTier::Silver
        );
    }

    #[test]
    fn confirmed_many_iterations_is_bronze() {
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 4, None),
            ConfidenceTier::Bronze
        );
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Confirmed, 9, None),
            ConfidenceTier::Bronze
        );
    }

    #[test]
    fn falsified_with_what_worked_lesson_is_silver() {
        let lesson = Lesson {
            what_worked: Some("isolating the flaky test".into()),
            takeaway: None,
        };
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Falsified, 1, Some(&lesson)),
            ConfidenceTier::Silver
        );
    }

    #[test]
    fn falsified_without_lesson_is_bronze() {
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Falsified, 1, None),
            ConfidenceTier::Bronze
        );
    }

    #[test]
    fn abandoned_is_always_abandoned() {
        assert_eq!(
            ConfidenceTier::derive(OutcomeStatus::Abandoned, 99, None),
            ConfidenceTier::Abandoned
        );
    }

    #[test]
    fn validate_body_rejects_unknown_domain() {
        let err =
            GhapEntry::validate_body("not-a-domain", "research-first", "g", "h", "a", "p").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[test]
    fn validate_body_rejects_empty_field() {
        let err = GhapEntry::validate_body("debugging", "research-first", "", "h", "a", "p")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[test]
    fn validate_body_rejects_oversized_field() {
        let long = "x".repeat(MAX_GHAP_BODY_LEN + 1);
        let err =
            GhapEntry::validate_body("debugging", "research-first", &long, "h", "a", "p").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[test]
    fn validate_body_accepts_known_values() {
        assert!(GhapEntry::validate_body("debugging", "research-first", "g", "h", "a", "p").is_ok());
    }

    #[test]
    fn falsified_resolution_requires_surprise_and_root_cause() {
        let err = GhapEntry::validate_resolution("falsified", "it broke", None, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);

        let err = GhapEntry::validate_resolution(
            "falsified",
            "it broke",
            Some("did not expect this"),
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ValidationError);
    }

    #[test]
    fn falsified_resolution_with_both_fields_succeeds() {
        let rc = RootCause {
            category: "wrong-assumption".into(),
            description: "assumed the cache was warm".into(),
        };
        let status = GhapEntry::validate_resolution(
            "falsified",
            "it broke",
            Some("did not expect this"),
            Some(&rc),
        )
        .unwrap();
        assert_eq!(status, OutcomeStatus::Falsified);
    }

    #[test]
    fn confirmed_resolution_does_not_require_surprise() {
        let status = GhapEntry::validate_resolution("confirmed", "worked", None, None).unwrap();
        assert_eq!(status, OutcomeStatus::Confirmed);
    }
}
