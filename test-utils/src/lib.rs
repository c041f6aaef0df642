//! # Test Utilities
//!
//! Shared fixtures and builders for `memory-core` and storage-backend tests:
//! entity builders, a mock embedding registry, an in-memory metadata store,
//! and a throwaway git repository fixture.

pub mod builders;
pub mod git_fixture;
pub mod mock_stores;

pub use builders::*;
pub use git_fixture::TestRepo;
pub use mock_stores::{mock_embeddings, InMemoryMetadataStore};
