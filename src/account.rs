use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;
use tracing::debug;

use crate::{
    command::{AccountCommand, Amount},
    customer::CustomerId,
    error::LedgerError,
    store::{LedgerStore, LedgerTransaction, run_in_transaction},
};

pub type AccountId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Standard,
    Savings { interest_rate: Decimal },
}

impl AccountKind {
    /// Interest rates live in `[0, 1)`.
    pub fn savings(interest_rate: Decimal) -> Result<Self, AccountError> {
        if interest_rate >= Decimal::zero() && interest_rate < Decimal::ONE {
            Ok(Self::Savings { interest_rate })
        } else {
            Err(AccountError::InvalidInterestRate { interest_rate })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountEventKind {
    Deposited,
    Withdrawn,
    InterestApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountEvent {
    account_id: AccountId,
    amount: Decimal,
    kind: AccountEventKind,
}

impl AccountEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> AccountEventKind {
        self.kind
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Amount must be positive, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Interest can only be applied to savings accounts")]
    NotSavingsAccount,
    #[error("Interest rate must be in [0, 1), got {interest_rate}")]
    InvalidInterestRate { interest_rate: Decimal },
    #[error("Balance would overflow")]
    BalanceOverflow,
}

/// Read view of one account as of the last store read or committed mutation.
///
/// The store owns the balance. Every mutation re-reads the row inside a store
/// transaction, validates against that fresh balance and only updates this
/// view once the transaction has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    owner: CustomerId,
    balance: Decimal,
    kind: AccountKind,
}

impl Account {
    pub(crate) fn new(id: AccountId, owner: CustomerId, balance: Decimal, kind: AccountKind) -> Self {
        Self {
            id,
            owner,
            balance,
            kind,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner(&self) -> CustomerId {
        self.owner
    }

    pub fn kind(&self) -> AccountKind {
        self.kind
    }

    pub fn interest_rate(&self) -> Option<Decimal> {
        match self.kind {
            AccountKind::Standard => None,
            AccountKind::Savings { interest_rate } => Some(interest_rate),
        }
    }

    /// Balance of this view; does not consult the store.
    pub fn get_balance(&self) -> Decimal {
        self.balance
    }

    pub fn deposit<S: LedgerStore>(&mut self, store: &S, amount: Decimal) -> Result<(), LedgerError> {
        let command = AccountCommand::Deposit(Amount::new(amount)?);
        self.execute(store, command).map(|_| ())
    }

    pub fn withdraw<S: LedgerStore>(&mut self, store: &S, amount: Decimal) -> Result<(), LedgerError> {
        let command = AccountCommand::Withdraw(Amount::new(amount)?);
        self.execute(store, command).map(|_| ())
    }

    /// Returns the interest credited.
    pub fn apply_interest<S: LedgerStore>(&mut self, store: &S) -> Result<Decimal, LedgerError> {
        let event = self.execute(store, AccountCommand::ApplyInterest)?;
        Ok(event.amount)
    }

    /// Re-reads this view from the store.
    pub fn refresh<S: LedgerStore>(&mut self, store: &S) -> Result<(), LedgerError> {
        *self = store
            .get_account(self.id)?
            .ok_or(LedgerError::AccountNotFound(self.id))?;
        Ok(())
    }

    fn execute<S: LedgerStore>(
        &mut self,
        store: &S,
        command: AccountCommand,
    ) -> Result<AccountEvent, LedgerError> {
        let id = self.id;
        let (committed, event) = run_in_transaction(store, |tx| {
            let mut current = tx
                .get_account(id)?
                .ok_or(LedgerError::AccountNotFound(id))?;
            let event = current.handle(command)?;
            current.apply(&event);
            tx.update_account_balance(id, current.balance)?;
            Ok((current, event))
        })?;
        debug!(
            account = id,
            kind = ?event.kind,
            amount = %event.amount,
            balance = %committed.balance,
            "Committed account mutation"
        );
        *self = committed;
        Ok(event)
    }

    /// Validates `command` against the current balance. Does not modify the
    /// account; the resulting event has to be [`apply`](Self::apply)'d.
    pub fn handle(&self, command: AccountCommand) -> Result<AccountEvent, AccountError> {
        match command {
            AccountCommand::Deposit(amount) => {
                self.balance
                    .checked_add(amount.value())
                    .ok_or(AccountError::BalanceOverflow)?;
                Ok(self.event(amount.value(), AccountEventKind::Deposited))
            }
            AccountCommand::Withdraw(amount) => {
                if self.balance >= amount.value() {
                    Ok(self.event(amount.value(), AccountEventKind::Withdrawn))
                } else {
                    Err(AccountError::InsufficientFunds)
                }
            }
            AccountCommand::ApplyInterest => {
                let AccountKind::Savings { interest_rate } = self.kind else {
                    return Err(AccountError::NotSavingsAccount);
                };
                let interest = self
                    .balance
                    .checked_mul(interest_rate)
                    .ok_or(AccountError::BalanceOverflow)?;
                self.balance
                    .checked_add(interest)
                    .ok_or(AccountError::BalanceOverflow)?;
                Ok(self.event(interest, AccountEventKind::InterestApplied))
            }
        }
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        debug_assert_eq!(event.account_id, self.id);
        match event.kind {
            AccountEventKind::Deposited | AccountEventKind::InterestApplied => {
                self.balance += event.amount;
            }
            AccountEventKind::Withdrawn => {
                self.balance -= event.amount;
            }
        }
    }

    fn event(&self, amount: Decimal, kind: AccountEventKind) -> AccountEvent {
        AccountEvent {
            account_id: self.id,
            amount,
            kind,
        }
    }
}
