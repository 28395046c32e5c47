//! Transactional executor
//!
//! Runs a unit of work against a [`Querier`] bound to one PostgreSQL
//! transaction and guarantees all-or-nothing:
//!
//! ```text
//! BEGIN ──▶ work(&mut TxQueries) ──Ok──▶ COMMIT
//!                     │
//!                    Err / deadline ──▶ ROLLBACK
//! ```
//!
//! No retries happen here. Serialization failures and deadlocks are
//! surfaced like any other statement error (see [`StoreError::is_retryable`]).

use std::time::Duration;

use futures::future::BoxFuture;
use sqlx::PgPool;
use tracing::{debug, warn};

use super::error::StoreError;
use super::queries::{PoolQueries, Querier, TxQueries};

/// PostgreSQL-backed store. Cloning shares the same pool.
#[derive(Clone)]
pub struct SqlStore {
    pool: PgPool,
    tx_timeout: Option<Duration>,
}

impl SqlStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            tx_timeout: None,
        }
    }

    /// Bound the time a unit of work may run before it is rolled back
    pub fn with_tx_timeout(mut self, timeout: Duration) -> Self {
        self.tx_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Pool-bound accessor for reads outside any transaction
    pub fn queries(&self) -> PoolQueries {
        PoolQueries::new(self.pool.clone())
    }

    /// Execute `work` exactly once inside a new transaction.
    ///
    /// - begin fails: [`StoreError::Connection`], `work` never runs
    /// - `work` fails: rollback, then the original error; if the rollback
    ///   also fails, [`StoreError::Rollback`] carrying both
    /// - deadline elapses: `work` is dropped, rollback,
    ///   [`StoreError::Cancelled`]; commit is never attempted
    /// - `work` succeeds: commit, [`StoreError::Commit`] on failure
    ///
    /// Dropping the returned future before it completes also rolls back,
    /// through the `sqlx::Transaction` drop guard.
    pub async fn exec_tx<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'q> FnOnce(&'q mut dyn Querier) -> BoxFuture<'q, Result<T, StoreError>> + Send,
    {
        let mut tx = self.pool.begin().await.map_err(StoreError::Connection)?;
        debug!("Transaction started");

        let outcome = {
            let mut queries = TxQueries::new(&mut *tx);
            let fut = work(&mut queries);
            match self.tx_timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(StoreError::Cancelled(limit)),
                },
                None => fut.await,
            }
        };

        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(StoreError::Commit)?;
                debug!("Transaction committed");
                Ok(value)
            }
            Err(err) => match tx.rollback().await {
                Ok(()) => {
                    debug!(error = %err, "Transaction rolled back");
                    Err(err)
                }
                Err(rb_err) => {
                    warn!(error = %err, rollback_error = %rb_err, "Rollback failed");
                    Err(StoreError::Rollback {
                        source: Box::new(err),
                        rollback: rb_err,
                    })
                }
            },
        }
    }
}
