//! Query accessor
//!
//! One function per single-row statement, generic over the sqlx executor so
//! the same SQL runs against the pool or inside an open transaction:
//!
//! - `create_account(&pool, ..)` - takes a connection from the pool
//! - `create_account(&mut *tx, ..)` - participates in the transaction
//!
//! [`Querier`] is the capability handed to a unit of work. [`PoolQueries`]
//! and [`TxQueries`] are its pool-bound and transaction-bound forms.

use async_trait::async_trait;
use sqlx::{Executor, PgConnection, PgPool, Postgres};

use super::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer,
};

// ============================================================================
// Accounts
// ============================================================================

pub async fn create_account<'e, E>(
    executor: E,
    arg: &CreateAccountParams,
) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(
        r#"INSERT INTO accounts (owner, balance, currency)
           VALUES ($1, $2, $3)
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(&arg.owner)
    .bind(arg.balance)
    .bind(&arg.currency)
    .fetch_one(executor)
    .await
}

pub async fn get_account<'e, E>(executor: E, id: i64) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Row-locks the account until the surrounding transaction ends.
///
/// `NO KEY UPDATE` leaves foreign-key checks from concurrent entry and
/// transfer inserts unblocked.
pub async fn get_account_for_update<'e, E>(executor: E, id: i64) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts WHERE id = $1 LIMIT 1
           FOR NO KEY UPDATE"#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn list_accounts<'e, E>(
    executor: E,
    arg: ListAccountsParams,
) -> Result<Vec<Account>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(
        r#"SELECT id, owner, balance, currency, created_at
           FROM accounts ORDER BY id LIMIT $1 OFFSET $2"#,
    )
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await
}

/// Adjusts the balance by a signed delta. A missing account yields `RowNotFound`.
pub async fn add_account_balance<'e, E>(
    executor: E,
    arg: AddAccountBalanceParams,
) -> Result<Account, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Account>(
        r#"UPDATE accounts SET balance = balance + $2
           WHERE id = $1
           RETURNING id, owner, balance, currency, created_at"#,
    )
    .bind(arg.id)
    .bind(arg.amount)
    .fetch_one(executor)
    .await
}

// ============================================================================
// Entries
// ============================================================================

pub async fn create_entry<'e, E>(executor: E, arg: CreateEntryParams) -> Result<Entry, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Entry>(
        r#"INSERT INTO entries (account_id, amount)
           VALUES ($1, $2)
           RETURNING id, account_id, amount, created_at"#,
    )
    .bind(arg.account_id)
    .bind(arg.amount)
    .fetch_one(executor)
    .await
}

pub async fn get_entry<'e, E>(executor: E, id: i64) -> Result<Entry, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Entry>(
        r#"SELECT id, account_id, amount, created_at
           FROM entries WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn list_entries<'e, E>(
    executor: E,
    arg: ListEntriesParams,
) -> Result<Vec<Entry>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Entry>(
        r#"SELECT id, account_id, amount, created_at
           FROM entries WHERE account_id = $1
           ORDER BY id LIMIT $2 OFFSET $3"#,
    )
    .bind(arg.account_id)
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await
}

// ============================================================================
// Transfers
// ============================================================================

pub async fn create_transfer<'e, E>(
    executor: E,
    arg: CreateTransferParams,
) -> Result<Transfer, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Transfer>(
        r#"INSERT INTO transfers (from_account_id, to_account_id, amount)
           VALUES ($1, $2, $3)
           RETURNING id, from_account_id, to_account_id, amount, created_at"#,
    )
    .bind(arg.from_account_id)
    .bind(arg.to_account_id)
    .bind(arg.amount)
    .fetch_one(executor)
    .await
}

pub async fn get_transfer<'e, E>(executor: E, id: i64) -> Result<Transfer, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers WHERE id = $1 LIMIT 1"#,
    )
    .bind(id)
    .fetch_one(executor)
    .await
}

pub async fn list_transfers<'e, E>(
    executor: E,
    arg: ListTransfersParams,
) -> Result<Vec<Transfer>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as::<_, Transfer>(
        r#"SELECT id, from_account_id, to_account_id, amount, created_at
           FROM transfers
           WHERE from_account_id = $1 OR to_account_id = $2
           ORDER BY id LIMIT $3 OFFSET $4"#,
    )
    .bind(arg.from_account_id)
    .bind(arg.to_account_id)
    .bind(arg.limit)
    .bind(arg.offset)
    .fetch_all(executor)
    .await
}

// ============================================================================
// Querier capability
// ============================================================================

/// Statements available to a unit of work
#[async_trait]
pub trait Querier: Send {
    async fn create_account(&mut self, arg: CreateAccountParams) -> Result<Account, sqlx::Error>;

    async fn get_account(&mut self, id: i64) -> Result<Account, sqlx::Error>;

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, sqlx::Error>;

    async fn list_accounts(&mut self, arg: ListAccountsParams)
    -> Result<Vec<Account>, sqlx::Error>;

    async fn add_account_balance(
        &mut self,
        arg: AddAccountBalanceParams,
    ) -> Result<Account, sqlx::Error>;

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, sqlx::Error>;

    async fn get_entry(&mut self, id: i64) -> Result<Entry, sqlx::Error>;

    async fn list_entries(&mut self, arg: ListEntriesParams) -> Result<Vec<Entry>, sqlx::Error>;

    async fn create_transfer(&mut self, arg: CreateTransferParams)
    -> Result<Transfer, sqlx::Error>;

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, sqlx::Error>;

    async fn list_transfers(
        &mut self,
        arg: ListTransfersParams,
    ) -> Result<Vec<Transfer>, sqlx::Error>;
}

/// Each statement takes its own connection from the pool
#[derive(Clone)]
pub struct PoolQueries {
    pool: PgPool,
}

impl PoolQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Querier for PoolQueries {
    async fn create_account(&mut self, arg: CreateAccountParams) -> Result<Account, sqlx::Error> {
        create_account(&self.pool, &arg).await
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        get_account(&self.pool, id).await
    }

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        // Outside a transaction the lock is released as soon as the statement ends.
        get_account_for_update(&self.pool, id).await
    }

    async fn list_accounts(
        &mut self,
        arg: ListAccountsParams,
    ) -> Result<Vec<Account>, sqlx::Error> {
        list_accounts(&self.pool, arg).await
    }

    async fn add_account_balance(
        &mut self,
        arg: AddAccountBalanceParams,
    ) -> Result<Account, sqlx::Error> {
        add_account_balance(&self.pool, arg).await
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, sqlx::Error> {
        create_entry(&self.pool, arg).await
    }

    async fn get_entry(&mut self, id: i64) -> Result<Entry, sqlx::Error> {
        get_entry(&self.pool, id).await
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> Result<Vec<Entry>, sqlx::Error> {
        list_entries(&self.pool, arg).await
    }

    async fn create_transfer(
        &mut self,
        arg: CreateTransferParams,
    ) -> Result<Transfer, sqlx::Error> {
        create_transfer(&self.pool, arg).await
    }

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, sqlx::Error> {
        get_transfer(&self.pool, id).await
    }

    async fn list_transfers(
        &mut self,
        arg: ListTransfersParams,
    ) -> Result<Vec<Transfer>, sqlx::Error> {
        list_transfers(&self.pool, arg).await
    }
}

/// Every statement runs on the connection of one open transaction.
///
/// Borrows the transaction, so it cannot outlive it.
pub struct TxQueries<'t> {
    conn: &'t mut PgConnection,
}

impl<'t> TxQueries<'t> {
    pub fn new(conn: &'t mut PgConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<'t> Querier for TxQueries<'t> {
    async fn create_account(&mut self, arg: CreateAccountParams) -> Result<Account, sqlx::Error> {
        create_account(&mut *self.conn, &arg).await
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        get_account(&mut *self.conn, id).await
    }

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        get_account_for_update(&mut *self.conn, id).await
    }

    async fn list_accounts(
        &mut self,
        arg: ListAccountsParams,
    ) -> Result<Vec<Account>, sqlx::Error> {
        list_accounts(&mut *self.conn, arg).await
    }

    async fn add_account_balance(
        &mut self,
        arg: AddAccountBalanceParams,
    ) -> Result<Account, sqlx::Error> {
        add_account_balance(&mut *self.conn, arg).await
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, sqlx::Error> {
        create_entry(&mut *self.conn, arg).await
    }

    async fn get_entry(&mut self, id: i64) -> Result<Entry, sqlx::Error> {
        get_entry(&mut *self.conn, id).await
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> Result<Vec<Entry>, sqlx::Error> {
        list_entries(&mut *self.conn, arg).await
    }

    async fn create_transfer(
        &mut self,
        arg: CreateTransferParams,
    ) -> Result<Transfer, sqlx::Error> {
        create_transfer(&mut *self.conn, arg).await
    }

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, sqlx::Error> {
        get_transfer(&mut *self.conn, id).await
    }

    async fn list_transfers(
        &mut self,
        arg: ListTransfersParams,
    ) -> Result<Vec<Transfer>, sqlx::Error> {
        list_transfers(&mut *self.conn, arg).await
    }
}
