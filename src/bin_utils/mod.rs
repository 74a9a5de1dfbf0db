//! This module could be a separate crate on its own, to bootstrap [`cute_bank`](crate) within
//! binary but for simplicity purposes, it is included directly in the library.

use std::io::{Read, Write};

use crate::{
    bank::Bank,
    command::{CommandError, LedgerOperation},
    error::LedgerError,
    store::LedgerStore,
};
use anyhow::Result;
use csv_parser::CsvOperationParser;
use csv_printer::{Account, print_accounts};
use thiserror::Error;
pub mod csv_parser;
pub mod csv_printer;
pub mod demo;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Malformed row: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct Service<'a, R, W: 'a, S> {
    pub input: R,
    pub output: &'a mut W,
    pub bank: &'a Bank<S>,
    pub error_printer: Box<dyn FnMut(u64, ScriptError)>,
}

impl<'a, R, W, S> Service<'a, R, W, S>
where
    R: Read,
    W: Write + 'a,
    S: LedgerStore,
{
    /// Executes every row in order. A failing row is reported and skipped,
    /// the rest of the script still runs.
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        for (line, row) in parser {
            let result = row
                .map_err(ScriptError::from)
                .and_then(|record| Ok(LedgerOperation::parse(record)?))
                .and_then(|operation| Ok(operation.execute(self.bank)?));
            if let Err(err) = result {
                (self.error_printer)(line, err);
            }
        }

        let accounts = self.bank.list_accounts()?;
        print_accounts(self.output, accounts.iter().map(Account::from))
    }
}
