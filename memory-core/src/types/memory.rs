//! The freeform [`Memory`] entity (spec §3.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_MEMORY_CONTENT_LEN: usize = 10_000;
pub const MAX_MEMORY_TAGS: usize = 20;
pub const MAX_MEMORY_TAG_LEN: usize = 50;

/// Categories a [`Memory`] can be filed under (spec §6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    Preference,
    Fact,
    Event,
    Workflow,
    Context,
    Error,
    Decision,
}

impl MemoryCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Fact => "fact",
            Self::Event => "event",
            Self::Workflow => "workflow",
            Self::Context => "context",
            Self::Error => "error",
            Self::Decision => "decision",
        }
    }
}

/// A freeform note (spec §3.1 Memory). Mutable only via delete+store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    pub category: MemoryCategory,
    pub importance: f32,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Memory {
    /// Validate against spec §3.1 invariants for a [`Memory`] about to be stored.
    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() {
            return Err(Error::validation("content", "must not be empty"));
        }
        if self.content.chars().count() > MAX_MEMORY_CONTENT_LEN {
            return Err(Error::validation(
                "content",
                format!("must be at most {MAX_MEMORY_CONTENT_LEN} characters"),
            ));
        }
        if !(0.0..=1.0).contains(&self.importance) {
            return Err(Error::validation("importance", "must be in [0, 1]"));
        }
        if self.tags.len() > MAX_MEMORY_TAGS {
            return Err(Error::validation(
                "tags",
                format!("at most {MAX_MEMORY_TAGS} tags allowed"),
            ));
        }
        if let Some(bad) = self.tags.iter().find(|t| t.chars().count() > MAX_MEMORY_TAG_LEN) {
            return Err(Error::validation(
                "tags",
                format!("tag `{bad}` exceeds {MAX_MEMORY_TAG_LEN} characters"),
            ));
        }
        Ok(())
    }
}
