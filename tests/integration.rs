use std::{
    str::from_utf8,
    sync::{Arc, Mutex},
};

use cute_bank::{
    Bank,
    bin_utils::{ScriptError, Service, demo::run_demo},
    command::CommandError,
    store::{StoreConfig, sqlite::SqliteLedgerStore},
};

const TEST_FILE: &str = include_str!("operations.csv");

fn get_test_bank() -> Bank<SqliteLedgerStore> {
    Bank::new(SqliteLedgerStore::open_in_memory(StoreConfig::default()).unwrap())
}

#[test]
fn process_operations() {
    let bank = get_test_bank();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let mut output = Vec::new();
    let service = Service {
        input: TEST_FILE.as_bytes(),
        output: &mut output,
        bank: &bank,
        error_printer: Box::new({
            let errors = errors.clone();
            move |line: u64, err: ScriptError| errors.lock().unwrap().push((line, err))
        }),
    };
    service.run().unwrap();

    // accounts are listed in id order
    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(
        lines,
        [
            "account,customer,kind,balance,interest_rate",
            "1,1,standard,1000.00,",
            "2,2,standard,800.00,",
            "3,2,savings,210.0000,0.05",
        ]
    );

    let errors = errors.lock().unwrap();
    let failed_lines: Vec<u64> = errors.iter().map(|(line, _)| *line).collect();
    assert_eq!(failed_lines, [11, 12, 13, 14, 15, 16, 17]);
    for (line, err) in errors.iter() {
        match line {
            16 => assert!(matches!(
                err,
                ScriptError::Command(CommandError::MissingField {
                    field: "amount",
                    ..
                })
            )),
            _ => assert!(matches!(err, ScriptError::Ledger(_)), "line {line}: {err}"),
        }
    }
    assert_eq!(errors[0].1.to_string(), "Insufficient funds");
    assert_eq!(errors[4].1.to_string(), "Customer 9 does not exist");
    assert_eq!(errors[6].1.to_string(), "Account 7 does not exist");
}

#[test]
fn script_amounts_are_exact() {
    let bank = get_test_bank();
    let input = "type,customer,account,to,amount,rate,name,email
customer,,,,,,John Doe,john.doe@example.com
account,1,,,12345678901234567.89,,,
deposit,,1,,0.10,,,";
    let mut output = Vec::new();
    let service = Service {
        input: input.as_bytes(),
        output: &mut output,
        bank: &bank,
        error_printer: Box::new(|line: u64, err: ScriptError| {
            panic!("line {line} failed: {err}")
        }),
    };
    service.run().unwrap();

    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(
        lines,
        [
            "account,customer,kind,balance,interest_rate",
            "1,1,standard,12345678901234567.99,",
        ]
    );
}

#[test]
fn demo_scenario() {
    let bank = get_test_bank();
    let mut output = Vec::new();
    run_demo(&bank, &mut output).unwrap();

    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(
        lines,
        [
            "Customer: John Doe, Email: john.doe@example.com",
            "Transferred 300.00 from account 1 to 2",
            "account,customer,kind,balance,interest_rate",
            "1,1,standard,1000.00,",
            "2,2,standard,800.00,",
        ]
    );
}
