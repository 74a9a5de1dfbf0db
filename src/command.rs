use rust_decimal::{Decimal, prelude::Zero};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    account::{AccountError, AccountId},
    bank::Bank,
    customer::CustomerId,
    error::LedgerError,
    store::LedgerStore,
};

/// A strictly positive amount of money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(amount: Decimal) -> Result<Self, AccountError> {
        if amount > Decimal::zero() {
            Ok(Self(amount))
        } else {
            Err(AccountError::InvalidAmount { amount })
        }
    }

    pub fn value(self) -> Decimal {
        self.0
    }
}

/// Balance mutations a single account can be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCommand {
    Deposit(Amount),
    Withdraw(Amount),
    ApplyInterest,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Customer,
    Account,
    Savings,
    Deposit,
    Withdrawal,
    Transfer,
    Interest,
}

/// One row of a ledger script. Which fields are required depends on `kind`.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRecord {
    #[serde(rename = "type")]
    pub kind: OperationKind,
    pub customer: Option<CustomerId>,
    pub account: Option<AccountId>,
    pub to: Option<AccountId>,
    // parsed from the raw text so digits and scale are kept
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub rate: Option<Decimal>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Field `{field}` is required for {kind:?}")]
    MissingField {
        field: &'static str,
        kind: OperationKind,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    CreateCustomer {
        name: String,
        email: String,
    },
    OpenAccount {
        customer: CustomerId,
        balance: Decimal,
    },
    OpenSavings {
        customer: CustomerId,
        balance: Decimal,
        rate: Decimal,
    },
    Deposit {
        account: AccountId,
        amount: Decimal,
    },
    Withdraw {
        account: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
    ApplyInterest {
        account: AccountId,
    },
}

fn required<T>(value: Option<T>, field: &'static str, kind: OperationKind) -> Result<T, CommandError> {
    value.ok_or(CommandError::MissingField { field, kind })
}

impl LedgerOperation {
    pub fn parse(record: OperationRecord) -> Result<Self, CommandError> {
        let kind = record.kind;
        match kind {
            OperationKind::Customer => Ok(Self::CreateCustomer {
                name: required(record.name, "name", kind)?,
                email: required(record.email, "email", kind)?,
            }),
            OperationKind::Account => Ok(Self::OpenAccount {
                customer: required(record.customer, "customer", kind)?,
                balance: required(record.amount, "amount", kind)?,
            }),
            OperationKind::Savings => Ok(Self::OpenSavings {
                customer: required(record.customer, "customer", kind)?,
                balance: required(record.amount, "amount", kind)?,
                rate: required(record.rate, "rate", kind)?,
            }),
            OperationKind::Deposit => Ok(Self::Deposit {
                account: required(record.account, "account", kind)?,
                amount: required(record.amount, "amount", kind)?,
            }),
            OperationKind::Withdrawal => Ok(Self::Withdraw {
                account: required(record.account, "account", kind)?,
                amount: required(record.amount, "amount", kind)?,
            }),
            OperationKind::Transfer => Ok(Self::Transfer {
                from: required(record.account, "account", kind)?,
                to: required(record.to, "to", kind)?,
                amount: required(record.amount, "amount", kind)?,
            }),
            OperationKind::Interest => Ok(Self::ApplyInterest {
                account: required(record.account, "account", kind)?,
            }),
        }
    }

    pub fn execute<S: LedgerStore>(self, bank: &Bank<S>) -> Result<(), LedgerError> {
        debug!(operation = ?self, "Executing ledger operation");
        match self {
            Self::CreateCustomer { name, email } => {
                bank.create_customer(&name, &email)?;
            }
            Self::OpenAccount { customer, balance } => {
                bank.create_account(customer, balance)?;
            }
            Self::OpenSavings {
                customer,
                balance,
                rate,
            } => {
                bank.create_savings_account(customer, balance, rate)?;
            }
            Self::Deposit { account, amount } => {
                bank.deposit(account, amount)?;
            }
            Self::Withdraw { account, amount } => {
                bank.withdraw(account, amount)?;
            }
            Self::Transfer { from, to, amount } => {
                bank.transfer(from, to, amount)?;
            }
            Self::ApplyInterest { account } => {
                bank.apply_interest(account)?;
            }
        }
        Ok(())
    }
}
