//! Git history reading (C7) and incremental indexing/search (C8) (spec
//! §4.6-§4.7).

pub mod analyzer;
pub mod reader;

pub use analyzer::{BlameSearchResult, ChurnHotspot, GitAnalyzer, COMMITS_COLLECTION};
pub use reader::{CommitFileStats, GitReader};
