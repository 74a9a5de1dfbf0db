use rust_decimal::Decimal;
use tracing::info;

use crate::{
    account::AccountId,
    command::{AccountCommand, Amount},
    error::LedgerError,
    store::{LedgerStore, LedgerTransaction, run_in_transaction},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub amount: Decimal,
    pub from: AccountId,
    pub to: AccountId,
}

/// Moves money between two accounts as a single store transaction.
pub struct TransferEngine<'s, S> {
    store: &'s S,
}

impl<'s, S: LedgerStore> TransferEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Withdraws `amount` from `from` and deposits it into `to`.
    ///
    /// Both balances are read, checked and written inside one transaction that
    /// holds the store's write lock, so concurrent transfers out of the same
    /// account are checked against each other's results. On any error the
    /// transaction is rolled back and neither balance changes.
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccount(from));
        }
        let amount = Amount::new(amount)?;

        let receipt = run_in_transaction(self.store, |tx| {
            let mut source = tx
                .get_account(from)?
                .ok_or(LedgerError::AccountNotFound(from))?;
            let mut target = tx
                .get_account(to)?
                .ok_or(LedgerError::AccountNotFound(to))?;

            let withdrawn = source.handle(AccountCommand::Withdraw(amount))?;
            let deposited = target.handle(AccountCommand::Deposit(amount))?;
            source.apply(&withdrawn);
            target.apply(&deposited);

            tx.update_account_balance(from, source.get_balance())?;
            tx.update_account_balance(to, target.get_balance())?;
            Ok(TransferReceipt {
                amount: amount.value(),
                from,
                to,
            })
        })?;

        info!(from, to, amount = %receipt.amount, "Transfer committed");
        Ok(receipt)
    }
}
