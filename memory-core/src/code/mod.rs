//! Code parsing (C5) and indexing (C6) pipeline (spec §4.4-§4.5).

pub mod indexer;
pub mod parser;

pub use indexer::{CodeIndexer, CODE_COLLECTION, EMBEDDING_BATCH_SIZE};
pub use parser::{detect_language, parse_file, Language};
