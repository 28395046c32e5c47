//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::store::SqlStore;

/// PostgreSQL connection pool
pub struct Database {
    pool: PgPool,
    tx_timeout: Option<Duration>,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
            .connect(&config.url)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "PostgreSQL connection pool established"
        );
        Ok(Self {
            pool,
            tx_timeout: config.tx_timeout_ms.map(Duration::from_millis),
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Store sharing this pool, with the configured unit-of-work deadline
    pub fn store(&self) -> SqlStore {
        let store = SqlStore::new(self.pool.clone());
        match self.tx_timeout {
            Some(timeout) => store.with_tx_timeout(timeout),
            None => store,
        }
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
