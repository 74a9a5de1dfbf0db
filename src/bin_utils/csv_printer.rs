use std::io::Write;

use crate::account::{self, AccountId, AccountKind};
use crate::customer::CustomerId;
use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Account {
    pub account: AccountId,
    pub customer: CustomerId,
    pub kind: &'static str,
    pub balance: Decimal,
    pub interest_rate: Option<Decimal>,
}

impl From<&account::Account> for Account {
    fn from(acc: &account::Account) -> Self {
        Self {
            account: acc.id(),
            customer: acc.owner(),
            kind: match acc.kind() {
                AccountKind::Standard => "standard",
                AccountKind::Savings { .. } => "savings",
            },
            balance: acc.get_balance(),
            interest_rate: acc.interest_rate(),
        }
    }
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = Account>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        let id = acc.account;
        writer
            .serialize(acc)
            .with_context(|| format!("Failed to write account {id} as CSV"))?;
    }
    writer.flush().context("Failed to flush accounts CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn prints_header_and_rows() {
        let accounts = [
            account::Account::new(1, 1, dec!(1000.00), AccountKind::Standard),
            account::Account::new(
                2,
                1,
                dec!(52.5),
                AccountKind::Savings {
                    interest_rate: dec!(0.05),
                },
            ),
        ];
        let mut output = Vec::new();
        print_accounts(&mut output, accounts.iter().map(Account::from)).unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,customer,kind,balance,interest_rate\n\
             1,1,standard,1000.00,\n\
             2,1,savings,52.5,0.05\n"
        );
    }
}
