use rust_decimal::{Decimal, prelude::Zero};
use tracing::info;

use crate::{
    account::{Account, AccountError, AccountId, AccountKind},
    customer::{Customer, CustomerId},
    error::LedgerError,
    store::LedgerStore,
    transfer::{TransferEngine, TransferReceipt},
};

/// Entry point for customer and account management over an injected store.
pub struct Bank<S> {
    store: S,
}

impl<S: LedgerStore> Bank<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transfer_engine(&self) -> TransferEngine<'_, S> {
        TransferEngine::new(&self.store)
    }

    pub fn create_customer(&self, name: &str, email: &str) -> Result<Customer, LedgerError> {
        let id = self.store.insert_customer(name, email)?;
        info!(customer = id, name, "Created customer");
        Ok(Customer::new(id, name.to_owned(), email.to_owned()))
    }

    pub fn create_account(
        &self,
        customer_id: CustomerId,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        self.open_account(customer_id, initial_balance, AccountKind::Standard)
    }

    pub fn create_savings_account(
        &self,
        customer_id: CustomerId,
        initial_balance: Decimal,
        interest_rate: Decimal,
    ) -> Result<Account, LedgerError> {
        let kind = AccountKind::savings(interest_rate)?;
        self.open_account(customer_id, initial_balance, kind)
    }

    fn open_account(
        &self,
        customer_id: CustomerId,
        initial_balance: Decimal,
        kind: AccountKind,
    ) -> Result<Account, LedgerError> {
        // an account may start empty, but never in debt
        if initial_balance < Decimal::zero() {
            return Err(AccountError::InvalidAmount {
                amount: initial_balance,
            }
            .into());
        }
        let id = self
            .store
            .insert_account(customer_id, initial_balance, &kind)?;
        info!(account = id, customer = customer_id, balance = %initial_balance, "Opened account");
        Ok(Account::new(id, customer_id, initial_balance, kind))
    }

    pub fn get_customer(&self, id: CustomerId) -> Result<Customer, LedgerError> {
        self.store
            .get_customer(id)?
            .ok_or(LedgerError::CustomerNotFound(id))
    }

    pub fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get_account(id)?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        Ok(self.store.list_accounts()?)
    }

    pub fn deposit(&self, id: AccountId, amount: Decimal) -> Result<Account, LedgerError> {
        let mut account = self.get_account(id)?;
        account.deposit(&self.store, amount)?;
        Ok(account)
    }

    pub fn withdraw(&self, id: AccountId, amount: Decimal) -> Result<Account, LedgerError> {
        let mut account = self.get_account(id)?;
        account.withdraw(&self.store, amount)?;
        Ok(account)
    }

    pub fn apply_interest(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut account = self.get_account(id)?;
        account.apply_interest(&self.store)?;
        Ok(account)
    }

    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        self.transfer_engine().transfer(from, to, amount)
    }
}
