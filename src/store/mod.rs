use std::time::Duration;

use rusqlite::ErrorCode;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::{
    account::{Account, AccountId, AccountKind},
    customer::{Customer, CustomerId},
    error::LedgerError,
};

pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountId),
    #[error("Customer {0} does not exist")]
    CustomerNotFound(CustomerId),
    #[error("Column `{column}` holds `{value}`, which is not a decimal")]
    CorruptDecimal { column: &'static str, value: String },
    #[error("Database connection lock is poisoned")]
    Poisoned,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Conflicts with a concurrent writer, worth retrying in a fresh transaction.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(error, _)) => matches!(
                error.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a connection waits for another writer's lock before giving up.
    pub busy_timeout: Duration,
    /// Extra attempts for a transaction that hit a transient conflict.
    pub max_retries: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

/// A unit of work against the store. Reads observe the transaction's own
/// writes, and nothing becomes visible to others until [`commit`] succeeds.
///
/// Dropping a transaction without committing rolls it back.
///
/// [`commit`]: LedgerTransaction::commit
pub trait LedgerTransaction {
    fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn get_account_balance(&mut self, id: AccountId) -> Result<Decimal, StoreError> {
        self.get_account(id)?
            .map(|account| account.get_balance())
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn update_account_balance(
        &mut self,
        id: AccountId,
        new_balance: Decimal,
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;

    fn rollback(self) -> Result<(), StoreError>;
}

/// Persistence for customers and accounts.
///
/// Single-record writes (`insert_*`) commit on their own; balance changes go
/// through [`LedgerStore::begin_transaction`].
pub trait LedgerStore: Send + Sync {
    type Transaction<'s>: LedgerTransaction
    where
        Self: 's;

    /// Starts a transaction that already holds the write lock, so balances
    /// read inside it cannot be changed by anyone else until it finishes.
    fn begin_transaction(&self) -> Result<Self::Transaction<'_>, StoreError>;

    fn insert_customer(&self, name: &str, email: &str) -> Result<CustomerId, StoreError>;

    fn insert_account(
        &self,
        customer_id: CustomerId,
        balance: Decimal,
        kind: &AccountKind,
    ) -> Result<AccountId, StoreError>;

    fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// How many times a transaction is retried after a transient conflict.
    fn retry_limit(&self) -> u32 {
        0
    }
}

/// Runs `operation` inside a store transaction, committing on `Ok` and rolling
/// back on `Err`. Transient conflicts restart the whole operation in a new
/// transaction, up to [`LedgerStore::retry_limit`] times.
pub fn run_in_transaction<'s, S, T, F>(store: &'s S, mut operation: F) -> Result<T, LedgerError>
where
    S: LedgerStore,
    F: FnMut(&mut S::Transaction<'s>) -> Result<T, LedgerError>,
{
    let retry_limit = store.retry_limit();
    let mut attempt = 0;
    loop {
        match attempt_transaction(store, &mut operation) {
            Err(err) if err.is_transient() && attempt < retry_limit => {
                attempt += 1;
                warn!(attempt, retry_limit, "Retrying transaction after conflict: {err}");
            }
            result => return result,
        }
    }
}

fn attempt_transaction<'s, S, T, F>(store: &'s S, operation: &mut F) -> Result<T, LedgerError>
where
    S: LedgerStore,
    F: FnMut(&mut S::Transaction<'s>) -> Result<T, LedgerError>,
{
    let mut tx = store.begin_transaction()?;
    match operation(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!("Failed to roll back after `{err}`: {rollback_err}");
            }
            Err(err)
        }
    }
}
