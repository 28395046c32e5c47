//! simple_bank - transactional money transfers over a PostgreSQL ledger
//!
//! # Modules
//!
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - connection pool bootstrap
//! - [`store`] - query accessor, transactional executor, transfer operation

pub mod config;
pub mod db;
pub mod logging;
pub mod store;

// Convenient re-exports at crate root
pub use db::Database;
pub use store::{
    Account, Entry, Querier, SqlStore, Store, StoreError, Transfer, TransferTxParams,
    TransferTxResult, ValidationError,
};
