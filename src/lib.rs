/// Account read views and balance mutation rules.
/// Commands are validated into events, which are then applied to the view
/// and persisted through a store transaction.
pub mod account;

/// Account commands, plus the ledger operations a script is made of.
pub mod command;

/// Bank customers, the owners of accounts.
pub mod customer;

/// Crate-level error returned by the bank and transfer operations.
pub mod error;

/// Persistence interface, plus the SQLite implementation.
///
/// Everything above this module only talks to the [`store::LedgerStore`]
/// trait, the store instance is passed in by whoever builds the [`bank::Bank`].
pub mod store;

/// Atomic transfers between two accounts.
pub mod transfer;

/// Customer and account management facade.
pub mod bank;

/// Bootstraps the library for the binary: runs a CSV script of ledger
/// operations and prints the resulting accounts. Lives here so the
/// integration tests can drive it too.
pub mod bin_utils;

pub use bank::Bank;
pub use error::LedgerError;
