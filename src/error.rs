use thiserror::Error;

use crate::{
    account::{AccountError, AccountId},
    customer::CustomerId,
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("Account {0} does not exist")]
    AccountNotFound(AccountId),
    #[error("Customer {0} does not exist")]
    CustomerNotFound(CustomerId),
    #[error("Cannot transfer from account {0} to itself")]
    SameAccount(AccountId),
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(err) if err.is_transient())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => Self::AccountNotFound(id),
            StoreError::CustomerNotFound(id) => Self::CustomerNotFound(id),
            err => Self::Store(err),
        }
    }
}
