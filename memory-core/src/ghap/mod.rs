//! GHAP reflection pipeline: single-active collection (C9), local journal,
//! and four-axis persistence (C10) (spec §4.8-§4.9).

pub mod collector;
pub mod journal;
pub mod persister;

pub use collector::GhapCollector;
pub use journal::GhapJournal;
pub use persister::GhapPersister;
