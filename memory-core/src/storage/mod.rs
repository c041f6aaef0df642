//! Storage abstractions: vector collections (C2), the Collection Guard
//! mixin (C4), and relational metadata (C3).

pub mod guard;
pub mod metadata;
pub mod vector;
pub mod vector_mock;

pub use guard::CollectionGuard;
pub use metadata::MetadataStore;
pub use vector::{Distance, Filter, SearchHit, VectorRecord, VectorStore};
pub use vector_mock::InMemoryVectorStore;
