//! SQLite backed ledger store.
use std::{
    ops::Deref,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{
    account::{Account, AccountId, AccountKind},
    customer::{Customer, CustomerId},
};

use super::{LedgerStore, LedgerTransaction, StoreConfig, StoreError};

/// Extended result code of a failed FOREIGN KEY constraint.
const FOREIGN_KEY_CONSTRAINT: i32 = 787;

enum ConnectionSource {
    /// A fresh connection is opened for every operation.
    File(PathBuf),
    /// An in-memory database only lives as long as its one connection.
    Memory(Mutex<Connection>),
}

/// A connection held for the duration of one store operation.
enum Session<'s> {
    Owned(Connection),
    Shared(MutexGuard<'s, Connection>),
}

impl Deref for Session<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Session::Owned(connection) => connection,
            Session::Shared(guard) => &**guard,
        }
    }
}

pub struct SqliteLedgerStore {
    source: ConnectionSource,
    config: StoreConfig,
}

impl SqliteLedgerStore {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self, StoreError> {
        let store = Self {
            source: ConnectionSource::File(path.as_ref().to_path_buf()),
            config,
        };
        {
            let session = store.session()?;
            // readers keep going while a transfer holds the write lock
            session.query_row("PRAGMA journal_mode = WAL", [], |row| {
                row.get::<_, String>(0)
            })?;
            create_tables(&session)?;
        }
        Ok(store)
    }

    pub fn open_in_memory(config: StoreConfig) -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()?;
        configure(&connection, &config)?;
        create_tables(&connection)?;
        Ok(Self {
            source: ConnectionSource::Memory(Mutex::new(connection)),
            config,
        })
    }

    fn session(&self) -> Result<Session<'_>, StoreError> {
        match &self.source {
            ConnectionSource::File(path) => {
                let connection = Connection::open(path)?;
                configure(&connection, &self.config)?;
                Ok(Session::Owned(connection))
            }
            ConnectionSource::Memory(connection) => connection
                .lock()
                .map(Session::Shared)
                .map_err(|_| StoreError::Poisoned),
        }
    }
}

fn configure(connection: &Connection, config: &StoreConfig) -> Result<(), StoreError> {
    connection.busy_timeout(config.busy_timeout)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

fn create_tables(connection: &Connection) -> Result<(), StoreError> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customers(id),
            balance TEXT NOT NULL,
            interest_rate TEXT
        );",
    )?;
    Ok(())
}

type AccountRow = (AccountId, CustomerId, String, Option<String>);

fn map_account_row(row: &Row) -> Result<AccountRow, rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn parse_decimal(column: &'static str, value: String) -> Result<Decimal, StoreError> {
    Decimal::from_str(&value).map_err(|_| StoreError::CorruptDecimal { column, value })
}

fn into_account((id, owner, balance, interest_rate): AccountRow) -> Result<Account, StoreError> {
    let balance = parse_decimal("balance", balance)?;
    let kind = match interest_rate {
        None => AccountKind::Standard,
        Some(rate) => AccountKind::Savings {
            interest_rate: parse_decimal("interest_rate", rate)?,
        },
    };
    Ok(Account::new(id, owner, balance, kind))
}

fn select_account(connection: &Connection, id: AccountId) -> Result<Option<Account>, StoreError> {
    connection
        .query_row(
            "SELECT id, customer_id, balance, interest_rate FROM accounts WHERE id = ?1",
            [id],
            map_account_row,
        )
        .optional()?
        .map(into_account)
        .transpose()
}

impl LedgerStore for SqliteLedgerStore {
    type Transaction<'s>
        = SqliteTransaction<'s>
    where
        Self: 's;

    fn begin_transaction(&self) -> Result<SqliteTransaction<'_>, StoreError> {
        let session = self.session()?;
        // IMMEDIATE takes the write lock now rather than at the first UPDATE,
        // so the balance read inside the transaction cannot go stale.
        session.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteTransaction {
            session,
            finished: false,
        })
    }

    fn insert_customer(&self, name: &str, email: &str) -> Result<CustomerId, StoreError> {
        let session = self.session()?;
        session.execute(
            "INSERT INTO customers (name, email) VALUES (?1, ?2)",
            (name, email),
        )?;
        Ok(session.last_insert_rowid())
    }

    fn insert_account(
        &self,
        customer_id: CustomerId,
        balance: Decimal,
        kind: &AccountKind,
    ) -> Result<AccountId, StoreError> {
        let interest_rate = match kind {
            AccountKind::Standard => None,
            AccountKind::Savings { interest_rate } => Some(interest_rate.to_string()),
        };
        let session = self.session()?;
        session
            .execute(
                "INSERT INTO accounts (customer_id, balance, interest_rate) VALUES (?1, ?2, ?3)",
                (customer_id, balance.to_string(), interest_rate),
            )
            .map_err(|error| match error {
                rusqlite::Error::SqliteFailure(failure, _)
                    if failure.extended_code == FOREIGN_KEY_CONSTRAINT =>
                {
                    StoreError::CustomerNotFound(customer_id)
                }
                error => StoreError::Sqlite(error),
            })?;
        Ok(session.last_insert_rowid())
    }

    fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let session = self.session()?;
        let customer = session
            .query_row(
                "SELECT id, name, email FROM customers WHERE id = ?1",
                [id],
                |row| Ok(Customer::new(row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(customer)
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let session = self.session()?;
        select_account(&session, id)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let session = self.session()?;
        let mut statement = session
            .prepare("SELECT id, customer_id, balance, interest_rate FROM accounts ORDER BY id")?;
        let rows = statement
            .query_map([], map_account_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(into_account).collect()
    }

    fn retry_limit(&self) -> u32 {
        self.config.max_retries
    }
}

pub struct SqliteTransaction<'s> {
    session: Session<'s>,
    finished: bool,
}

impl LedgerTransaction for SqliteTransaction<'_> {
    fn get_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        select_account(&self.session, id)
    }

    fn update_account_balance(
        &mut self,
        id: AccountId,
        new_balance: Decimal,
    ) -> Result<(), StoreError> {
        let updated = self.session.execute(
            "UPDATE accounts SET balance = ?1 WHERE id = ?2",
            (new_balance.to_string(), id),
        )?;
        if updated == 0 {
            return Err(StoreError::AccountNotFound(id));
        }
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        // on failure the transaction is still open and Drop rolls it back
        self.session.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        self.session.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        match self.session.execute_batch("ROLLBACK") {
            Ok(()) => debug!("Rolled back unfinished transaction"),
            Err(err) => warn!("Failed to roll back unfinished transaction: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn get_test_store() -> SqliteLedgerStore {
        SqliteLedgerStore::open_in_memory(StoreConfig::default()).unwrap()
    }

    #[test]
    fn insert_and_read_back_records() {
        let store = get_test_store();
        let customer_id = store
            .insert_customer("John Doe", "john.doe@example.com")
            .unwrap();
        let customer = store.get_customer(customer_id).unwrap().unwrap();
        assert_eq!(customer.name(), "John Doe");
        assert_eq!(customer.email(), "john.doe@example.com");

        let standard = store
            .insert_account(customer_id, dec!(1000.00), &AccountKind::Standard)
            .unwrap();
        let savings = store
            .insert_account(
                customer_id,
                dec!(250.50),
                &AccountKind::Savings {
                    interest_rate: dec!(0.05),
                },
            )
            .unwrap();
        assert_ne!(standard, savings);

        let account = store.get_account(standard).unwrap().unwrap();
        assert_eq!(account.owner(), customer_id);
        assert_eq!(account.get_balance(), dec!(1000.00));
        assert_eq!(account.kind(), AccountKind::Standard);

        let accounts = store.list_accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[1].id(), savings);
        assert_eq!(accounts[1].interest_rate(), Some(dec!(0.05)));
    }

    #[test]
    fn missing_records_read_as_none() {
        let store = get_test_store();
        assert!(store.get_customer(42).unwrap().is_none());
        assert!(store.get_account(42).unwrap().is_none());
    }

    #[test]
    fn account_for_unknown_customer_is_rejected() {
        let store = get_test_store();
        let err = store
            .insert_account(7, dec!(10), &AccountKind::Standard)
            .unwrap_err();
        assert!(matches!(err, StoreError::CustomerNotFound(7)));
    }

    #[test]
    fn balances_keep_exact_decimal_digits() {
        let store = get_test_store();
        let customer_id = store.insert_customer("Jane Doe", "jane@example.com").unwrap();
        let id = store
            .insert_account(customer_id, dec!(0.1), &AccountKind::Standard)
            .unwrap();

        let mut tx = store.begin_transaction().unwrap();
        let balance = tx.get_account_balance(id).unwrap();
        tx.update_account_balance(id, balance + dec!(0.2)).unwrap();
        tx.commit().unwrap();

        let account = store.get_account(id).unwrap().unwrap();
        assert_eq!(account.get_balance(), dec!(0.3));
    }

    #[test]
    fn transaction_reports_missing_account() {
        let store = get_test_store();
        let mut tx = store.begin_transaction().unwrap();
        assert!(matches!(
            tx.get_account_balance(3).unwrap_err(),
            StoreError::AccountNotFound(3)
        ));
        assert!(matches!(
            tx.update_account_balance(3, dec!(1)).unwrap_err(),
            StoreError::AccountNotFound(3)
        ));
        tx.rollback().unwrap();
    }

    #[test]
    fn rollback_and_drop_discard_changes() {
        let store = get_test_store();
        let customer_id = store.insert_customer("Jane Doe", "jane@example.com").unwrap();
        let id = store
            .insert_account(customer_id, dec!(100), &AccountKind::Standard)
            .unwrap();

        let mut tx = store.begin_transaction().unwrap();
        tx.update_account_balance(id, dec!(1)).unwrap();
        // the transaction sees its own write
        assert_eq!(tx.get_account_balance(id).unwrap(), dec!(1));
        tx.rollback().unwrap();
        assert_eq!(store.get_account(id).unwrap().unwrap().get_balance(), dec!(100));

        {
            let mut tx = store.begin_transaction().unwrap();
            tx.update_account_balance(id, dec!(2)).unwrap();
        }
        assert_eq!(store.get_account(id).unwrap().unwrap().get_balance(), dec!(100));
    }

    #[test]
    fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");

        let id = {
            let store = SqliteLedgerStore::open(&path, StoreConfig::default()).unwrap();
            let customer_id = store.insert_customer("John Doe", "john@example.com").unwrap();
            store
                .insert_account(customer_id, dec!(12.34), &AccountKind::Standard)
                .unwrap()
        };

        let store = SqliteLedgerStore::open(&path, StoreConfig::default()).unwrap();
        assert_eq!(store.get_account(id).unwrap().unwrap().get_balance(), dec!(12.34));
    }

    #[test]
    fn busy_errors_are_transient() {
        let busy = StoreError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(busy.is_transient());
        assert!(!StoreError::AccountNotFound(1).is_transient());
    }
}
