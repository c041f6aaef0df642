//! Connection pool for libsql database connections.
//!
//! libsql's `Database` is already a connection factory; this pool adds a
//! concurrency limit via semaphore, a connection health check, and basic
//! checkout statistics for observability.

use std::sync::Arc;
use std::time::{Duration, Instant};

use learning_memory_core::error::{Error, Result};
use libsql::{Connection, Database};
use parking_lot::RwLock;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub connection_timeout: Duration,
    pub enable_health_check: bool,
    pub health_check_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connection_timeout: Duration::from_secs(5),
            enable_health_check: true,
            health_check_timeout: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolStatistics {
    pub total_created: usize,
    pub total_health_checks_passed: usize,
    pub total_health_checks_failed: usize,
    pub active_connections: usize,
    pub total_wait_time_ms: u64,
    pub total_checkouts: usize,
    pub avg_wait_time_ms: u64,
}

impl PoolStatistics {
    fn update_averages(&mut self) {
        if self.total_checkouts > 0 {
            self.avg_wait_time_ms = self.total_wait_time_ms / self.total_checkouts as u64;
        }
    }
}

/// A guard that releases its semaphore permit when dropped.
#[derive(Debug)]
pub struct PooledConnection {
    connection: Connection,
    _permit: OwnedSemaphorePermit,
    stats: Arc<RwLock<PoolStatistics>>,
}

impl PooledConnection {
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let mut stats = self.stats.write();
        if stats.active_connections > 0 {
            stats.active_connections -= 1;
        }
    }
}

/// Connection pool: concurrency limit, health checks, checkout statistics.
pub struct ConnectionPool {
    db: Arc<Database>,
    config: PoolConfig,
    semaphore: Arc<Semaphore>,
    stats: Arc<RwLock<PoolStatistics>>,
}

impl ConnectionPool {
    pub async fn new(db: Arc<Database>, config: PoolConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "creating connection pool");

        let semaphore = Arc::new(Semaphore::new(config.max_connections));
        let stats = Arc::new(RwLock::new(PoolStatistics::default()));

        let pool = Self { db, config, semaphore, stats };
        pool.validate_database().await?;
        Ok(pool)
    }

    async fn validate_database(&self) -> Result<()> {
        let conn = self
            .db
            .connect()
            .map_err(|e| Error::Internal(format!("failed to connect to database: {e}")))?;
        conn.query("SELECT 1", ())
            .await
            .map_err(|e| Error::Internal(format!("database validation failed: {e}")))?;
        Ok(())
    }

    fn create_connection(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| Error::Internal(format!("failed to create connection: {e}")))?;
        self.stats.write().total_created += 1;
        Ok(conn)
    }

    /// Acquire a connection, respecting `max_connections` and running the
    /// configured health check.
    pub async fn get(&self) -> Result<PooledConnection> {
        let start = Instant::now();

        let permit_fut = self.semaphore.clone().acquire_owned();
        let permit = tokio::time::timeout(self.config.connection_timeout, permit_fut)
            .await
            .map_err(|_| {
                Error::Internal(format!(
                    "connection pool timeout after {:?}: max {} connections in use",
                    self.config.connection_timeout, self.config.max_connections
                ))
            })?
            .map_err(|e| Error::Internal(format!("failed to acquire connection permit: {e}")))?;

        let wait_time = start.elapsed();
        let conn = self.create_connection()?;

        if self.config.enable_health_check {
            if let Err(e) = self.validate_connection_health(&conn).await {
                self.stats.write().total_health_checks_failed += 1;
                return Err(e);
            }
            self.stats.write().total_health_checks_passed += 1;
        }

        {
            let mut stats = self.stats.write();
            stats.total_checkouts += 1;
            stats.total_wait_time_ms += wait_time.as_millis() as u64;
            stats.active_connections += 1;
            stats.update_averages();
        }

        debug!(wait_ms = wait_time.as_millis() as u64, "connection acquired");

        Ok(PooledConnection { connection: conn, _permit: permit, stats: Arc::clone(&self.stats) })
    }

    async fn validate_connection_health(&self, conn: &Connection) -> Result<()> {
        tokio::time::timeout(self.config.health_check_timeout, conn.query("SELECT 1", ()))
            .await
            .map_err(|_| Error::Internal("connection health check timeout".into()))?
            .map_err(|e| Error::Internal(format!("connection health check failed: {e}")))?;
        Ok(())
    }

    pub fn statistics(&self) -> PoolStatistics {
        self.stats.read().clone()
    }

    /// Wait (up to 30s) for active connections to drain.
    pub async fn shutdown(&self) {
        info!("shutting down connection pool");
        let deadline = Duration::from_secs(30);
        let start = Instant::now();
        while start.elapsed() < deadline {
            if self.stats.read().active_connections == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let remaining = self.stats.read().active_connections;
        if remaining > 0 {
            warn!(remaining, "shutdown completed with active connections still checked out");
        }
    }
}
