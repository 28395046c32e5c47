//! Money transfer
//!
//! One transfer is a single unit of work:
//!
//! 1. create the transfer record
//! 2. create the debit entry for the source account
//! 3. create the credit entry for the destination account
//! 4. adjust both balances, lower account id first
//!
//! The first failing step aborts the unit of work and the executor rolls
//! back everything before it.
//!
//! # Lock ordering
//!
//! Each balance update row-locks its account until commit. Two concurrent
//! transfers between the same pair in opposite directions would lock the
//! rows in opposite order and deadlock. Updating in ascending account id
//! order, whichever side is the source, gives every transaction the same
//! lock order.

use tracing::debug;

use super::error::{StoreError, ValidationError};
use super::models::{
    Account, AddAccountBalanceParams, CreateEntryParams, CreateTransferParams, TransferTxParams,
    TransferTxResult,
};
use super::queries::Querier;
use super::tx::SqlStore;

impl SqlStore {
    /// Move `amount` from one account to another atomically.
    ///
    /// Not idempotent: every successful call records a new transfer.
    pub async fn transfer_tx(&self, arg: TransferTxParams) -> Result<TransferTxResult, StoreError> {
        validate_transfer(&arg)?;

        let result = self
            .exec_tx(move |q| Box::pin(run_transfer(q, arg)))
            .await?;

        debug!(
            transfer_id = result.transfer.id,
            from_account_id = arg.from_account_id,
            to_account_id = arg.to_account_id,
            amount = arg.amount,
            "Transfer committed"
        );
        Ok(result)
    }
}

/// Reject transfers that would not move money between two accounts
pub fn validate_transfer(arg: &TransferTxParams) -> Result<(), ValidationError> {
    if arg.from_account_id == arg.to_account_id {
        return Err(ValidationError::SameAccount);
    }
    if arg.amount <= 0 {
        return Err(ValidationError::InvalidAmount);
    }
    Ok(())
}

/// The transfer unit of work. Expects a validated `arg`.
pub async fn run_transfer(
    q: &mut dyn Querier,
    arg: TransferTxParams,
) -> Result<TransferTxResult, StoreError> {
    let transfer = q
        .create_transfer(CreateTransferParams {
            from_account_id: arg.from_account_id,
            to_account_id: arg.to_account_id,
            amount: arg.amount,
        })
        .await?;

    let from_entry = q
        .create_entry(CreateEntryParams {
            account_id: arg.from_account_id,
            amount: -arg.amount,
        })
        .await?;

    let to_entry = q
        .create_entry(CreateEntryParams {
            account_id: arg.to_account_id,
            amount: arg.amount,
        })
        .await?;

    let (from_account, to_account) = if arg.from_account_id < arg.to_account_id {
        add_money(
            q,
            (arg.from_account_id, -arg.amount),
            (arg.to_account_id, arg.amount),
        )
        .await?
    } else {
        let (to_account, from_account) = add_money(
            q,
            (arg.to_account_id, arg.amount),
            (arg.from_account_id, -arg.amount),
        )
        .await?;
        (from_account, to_account)
    };

    Ok(TransferTxResult {
        transfer,
        from_account,
        to_account,
        from_entry,
        to_entry,
    })
}

/// Apply two `(account_id, delta)` adjustments in the given order
async fn add_money(
    q: &mut dyn Querier,
    first: (i64, i64),
    second: (i64, i64),
) -> Result<(Account, Account), sqlx::Error> {
    let account1 = q
        .add_account_balance(AddAccountBalanceParams {
            id: first.0,
            amount: first.1,
        })
        .await?;

    let account2 = q
        .add_account_balance(AddAccountBalanceParams {
            id: second.0,
            amount: second.1,
        })
        .await?;

    Ok((account1, account2))
}
