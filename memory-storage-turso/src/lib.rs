#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

//! # Memory Storage — Turso
//!
//! libsql/Turso-backed [`learning_memory_core::storage::VectorStore`] and
//! [`learning_memory_core::storage::MetadataStore`] implementations for the
//! Learning Memory Server (spec §4.2, §4.5, §4.7, §6.2, C2/C3).
//!
//! One [`TursoStore`] connection pool backs both traits: vector collections
//! each get their own `vec_<name>` table with an `F32_BLOB` embedding
//! column, ranked by libsql's native `vector_distance_cos`; the relational
//! side (`indexed_files`, `git_index_state`, `settings`) lives in plain
//! tables over the same connection.
//!
//! ## Example
//!
//! ```no_run
//! use learning_memory_storage_turso::TursoStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = TursoStore::open_local("memory.db").await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use learning_memory_core::error::{Error, Result};
use libsql::{Builder, Database};
use tracing::info;

pub mod metadata;
pub mod pool;
mod schema;
pub mod vector;

pub use pool::{ConnectionPool, PoolConfig, PoolStatistics, PooledConnection};

/// Shared libsql connection pool backing both [`learning_memory_core::storage::VectorStore`]
/// and [`learning_memory_core::storage::MetadataStore`].
pub struct TursoStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    pool: ConnectionPool,
}

impl TursoStore {
    /// Open (or create) a local file-backed database and ensure the
    /// registry/metadata tables exist.
    pub async fn open_local(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| Error::Internal(format!("failed to open local database: {e}")))?;
        Self::from_database(db).await
    }

    /// Connect to a remote Turso database over `libsql://`.
    pub async fn open_remote(url: &str, token: &str) -> Result<Self> {
        let db = Builder::new_remote(url.to_string(), token.to_string())
            .build()
            .await
            .map_err(|e| Error::Internal(format!("failed to connect to Turso: {e}")))?;
        Self::from_database(db).await
    }

    /// Wrap an already-built [`Database`] (used by tests and in-memory
    /// `:memory:` setups).
    pub async fn from_database(db: Database) -> Result<Self> {
        let db = Arc::new(db);
        let pool = ConnectionPool::new(Arc::clone(&db), PoolConfig::default()).await?;
        let store = Self { db, pool };
        store.ensure_registry().await?;
        Ok(store)
    }

    async fn connection(&self) -> Result<PooledConnection> {
        self.pool.get().await
    }

    async fn ensure_registry(&self) -> Result<()> {
        info!("ensuring learning memory server schema");
        let conn = self.connection().await?;
        let conn = conn.connection();
        for ddl in [
            schema::CREATE_VECTOR_COLLECTIONS_TABLE,
            schema::CREATE_INDEXED_FILES_TABLE,
            schema::CREATE_GIT_INDEX_STATE_TABLE,
            schema::CREATE_SETTINGS_TABLE,
        ] {
            conn.execute(ddl, ()).await.map_err(|e| Error::Internal(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Release pooled resources, waiting briefly for outstanding checkouts.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}
