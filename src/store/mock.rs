//! In-memory [`Querier`] for exercising units of work without PostgreSQL.
//!
//! Records the order of balance adjustments and can inject a failure at a
//! chosen statement.

use std::borrow::Cow;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;

use super::models::{
    Account, AddAccountBalanceParams, CreateAccountParams, CreateEntryParams,
    CreateTransferParams, Entry, ListAccountsParams, ListEntriesParams, ListTransfersParams,
    Transfer,
};
use super::queries::Querier;

/// PostgreSQL's report for an insert referencing a missing account
#[derive(Debug, thiserror::Error)]
#[error("insert or update on table \"{table}\" violates foreign key constraint")]
pub struct ForeignKeyViolation {
    table: &'static str,
}

impl sqlx::error::DatabaseError for ForeignKeyViolation {
    fn message(&self) -> &str {
        "violates foreign key constraint"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed("23503"))
    }

    fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
        self
    }

    fn kind(&self) -> sqlx::error::ErrorKind {
        sqlx::error::ErrorKind::ForeignKeyViolation
    }
}

/// Statement at which the mock fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateTransfer,
    CreateEntry { account_id: i64 },
    AddAccountBalance { account_id: i64 },
}

#[derive(Default)]
pub struct MockQuerier {
    accounts: BTreeMap<i64, Account>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
    balance_updates: Vec<i64>,
    fail_at: Option<FailPoint>,
    next_id: i64,
}

impl MockQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account with a fixed id
    pub fn with_account(mut self, id: i64, balance: i64) -> Self {
        self.accounts.insert(
            id,
            Account {
                id,
                owner: format!("owner-{id}"),
                balance,
                currency: "USD".to_string(),
                created_at: Utc::now(),
            },
        );
        self
    }

    pub fn fail_at(mut self, point: FailPoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    /// Account ids in the order their balances were adjusted
    pub fn balance_updates(&self) -> &[i64] {
        &self.balance_updates
    }

    pub fn balance(&self, id: i64) -> Option<i64> {
        self.accounts.get(&id).map(|a| a.balance)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, point: FailPoint) -> Result<(), sqlx::Error> {
        if self.fail_at == Some(point) {
            return Err(sqlx::Error::Protocol(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn require_account(&self, id: i64) -> Result<&Account, sqlx::Error> {
        self.accounts.get(&id).ok_or(sqlx::Error::RowNotFound)
    }

    /// Foreign-key check of an insert into `table`
    fn reference_account(&self, table: &'static str, id: i64) -> Result<(), sqlx::Error> {
        if self.accounts.contains_key(&id) {
            Ok(())
        } else {
            Err(sqlx::Error::Database(Box::new(ForeignKeyViolation { table })))
        }
    }
}

#[async_trait]
impl Querier for MockQuerier {
    async fn create_account(&mut self, arg: CreateAccountParams) -> Result<Account, sqlx::Error> {
        let id = self.next_id() + 1000;
        let account = Account {
            id,
            owner: arg.owner,
            balance: arg.balance,
            currency: arg.currency,
            created_at: Utc::now(),
        };
        self.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn get_account(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        self.require_account(id).cloned()
    }

    async fn get_account_for_update(&mut self, id: i64) -> Result<Account, sqlx::Error> {
        self.require_account(id).cloned()
    }

    async fn list_accounts(
        &mut self,
        arg: ListAccountsParams,
    ) -> Result<Vec<Account>, sqlx::Error> {
        Ok(self
            .accounts
            .values()
            .skip(arg.offset as usize)
            .take(arg.limit as usize)
            .cloned()
            .collect())
    }

    async fn add_account_balance(
        &mut self,
        arg: AddAccountBalanceParams,
    ) -> Result<Account, sqlx::Error> {
        self.check(FailPoint::AddAccountBalance { account_id: arg.id })?;
        let account = self
            .accounts
            .get_mut(&arg.id)
            .ok_or(sqlx::Error::RowNotFound)?;
        account.balance += arg.amount;
        let updated = account.clone();
        self.balance_updates.push(arg.id);
        Ok(updated)
    }

    async fn create_entry(&mut self, arg: CreateEntryParams) -> Result<Entry, sqlx::Error> {
        self.check(FailPoint::CreateEntry {
            account_id: arg.account_id,
        })?;
        self.reference_account("entries", arg.account_id)?;
        let entry = Entry {
            id: self.next_id(),
            account_id: arg.account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_entry(&mut self, id: i64) -> Result<Entry, sqlx::Error> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn list_entries(&mut self, arg: ListEntriesParams) -> Result<Vec<Entry>, sqlx::Error> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.account_id == arg.account_id)
            .skip(arg.offset as usize)
            .take(arg.limit as usize)
            .cloned()
            .collect())
    }

    async fn create_transfer(
        &mut self,
        arg: CreateTransferParams,
    ) -> Result<Transfer, sqlx::Error> {
        self.check(FailPoint::CreateTransfer)?;
        self.reference_account("transfers", arg.from_account_id)?;
        self.reference_account("transfers", arg.to_account_id)?;
        let transfer = Transfer {
            id: self.next_id(),
            from_account_id: arg.from_account_id,
            to_account_id: arg.to_account_id,
            amount: arg.amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn get_transfer(&mut self, id: i64) -> Result<Transfer, sqlx::Error> {
        self.transfers
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(sqlx::Error::RowNotFound)
    }

    async fn list_transfers(
        &mut self,
        arg: ListTransfersParams,
    ) -> Result<Vec<Transfer>, sqlx::Error> {
        Ok(self
            .transfers
            .iter()
            .filter(|t| {
                t.from_account_id == arg.from_account_id || t.to_account_id == arg.to_account_id
            })
            .skip(arg.offset as usize)
            .take(arg.limit as usize)
            .cloned()
            .collect())
    }
}
