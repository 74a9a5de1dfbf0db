use std::io::Write;

use rust_decimal::Decimal;

use crate::{bank::Bank, store::LedgerStore};

use super::csv_printer::{Account, print_accounts};

/// Walks through opening accounts for two customers, moving money around,
/// and prints what happened followed by the final accounts table.
pub fn run_demo<S, W>(bank: &Bank<S>, output: &mut W) -> anyhow::Result<()>
where
    S: LedgerStore,
    W: Write,
{
    let john = bank.create_customer("John Doe", "john.doe@example.com")?;
    let mut account = bank.create_account(john.id(), Decimal::new(1000_00, 2))?;
    account.deposit(bank.store(), Decimal::new(500_00, 2))?;
    account.withdraw(bank.store(), Decimal::new(200_00, 2))?;

    let fetched = bank.get_customer(john.id())?;
    writeln!(output, "Customer: {}, Email: {}", fetched.name(), fetched.email())?;

    let jane = bank.create_customer("Jane Doe", "jane.doe@example.com")?;
    let account2 = bank.create_account(jane.id(), Decimal::new(500_00, 2))?;
    let receipt = bank.transfer(account.id(), account2.id(), Decimal::new(300_00, 2))?;
    writeln!(
        output,
        "Transferred {} from account {} to {}",
        receipt.amount, receipt.from, receipt.to
    )?;

    let accounts = bank.list_accounts()?;
    print_accounts(output, accounts.iter().map(Account::from))
}
