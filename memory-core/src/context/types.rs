//! Output types for the Context Assembler (C14, spec §4.13).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The five sources `assemble_context` can draw from.
pub const VALID_CONTEXT_TYPES: &[&str] = &["memories", "code", "experiences", "values", "commits"];

/// One item folded into the assembled context, after dedup, truncation, and
/// selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextItem {
    pub source: String,
    pub dedup_key: String,
    pub relevance: f32,
    pub rendered: String,
    pub tokens: usize,
    pub truncated: bool,
}

/// The assembled, rendered context (spec §4.13 return shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormattedContext {
    pub markdown: String,
    pub items: Vec<ContextItem>,
    pub token_count: usize,
    pub sources_used: HashMap<String, usize>,
    pub budget_exceeded: bool,
    pub truncated_items: Vec<String>,
}

/// An item not yet selected into a budget: its source, dedup key, relevance,
/// and fully-rendered text (pre-truncation). [`crate::context::budget`] and
/// [`crate::context::dedup`] operate on these before final selection.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub source: String,
    pub dedup_key: String,
    pub relevance: f32,
    pub rendered: String,
    /// Appended to `rendered` (with a leading space) if this item is
    /// truncated during selection; empty for sources with no fixed note.
    pub truncation_note: String,
}
