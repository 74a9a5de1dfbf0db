use std::io::Read;

use crate::command::OperationRecord;
use csv::{DeserializeRecordsIntoIter, Trim};

/// Parses a ledger script in CSV format.
///
/// Yields the line each record started on, so errors can point at it.
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, OperationRecord>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<OperationRecord, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
