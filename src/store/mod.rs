//! Ledger store
//!
//! PostgreSQL persistence for accounts, entries and transfers.
//!
//! # Layers
//!
//! - [`queries`] - single-row statements, pool-bound or transaction-bound
//! - [`tx`] - transactional executor (`SqlStore::exec_tx`)
//! - [`transfer`] - money transfer unit of work (`SqlStore::transfer_tx`)
//!
//! # Invariant
//!
//! A committed transfer of `A` from `X` to `Y` has exactly one entry
//! `(X, -A)`, one entry `(Y, +A)`, and both balances adjusted by the same
//! amounts. Nothing of a failed transfer is visible.

pub mod error;
pub mod models;
pub mod queries;
pub mod transfer;
pub mod tx;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

pub use error::{StoreError, ValidationError};
pub use models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer, TransferTxParams, TransferTxResult,
};
pub use queries::{PoolQueries, Querier, TxQueries};
pub use tx::SqlStore;

/// Operations offered to the request-handling layer
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomic transfer between two accounts
    async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError>;

    async fn create_account(&self, arg: CreateAccountParams) -> Result<Account, StoreError>;

    async fn get_account(&self, id: i64) -> Result<Account, StoreError>;

    async fn list_accounts(&self, arg: ListAccountsParams) -> Result<Vec<Account>, StoreError>;
}

#[async_trait]
impl Store for SqlStore {
    async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        SqlStore::transfer_tx(self, arg).await
    }

    async fn create_account(&self, arg: CreateAccountParams) -> Result<Account, StoreError> {
        Ok(queries::create_account(self.pool(), &arg).await?)
    }

    async fn get_account(&self, id: i64) -> Result<Account, StoreError> {
        Ok(queries::get_account(self.pool(), id).await?)
    }

    async fn list_accounts(&self, arg: ListAccountsParams) -> Result<Vec<Account>, StoreError> {
        Ok(queries::list_accounts(self.pool(), arg).await?)
    }
}
