//! Unified typed search surface (C13) over memories, code, experiences,
//! values, and commits (spec §4.12).

pub mod searcher;
pub mod types;

pub use searcher::Searcher;
pub use types::{CodeSearchResult, CommitSearchResult, ExperienceSearchResult, MemorySearchResult, ValueSearchResult};
