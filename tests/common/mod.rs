#![allow(dead_code)]

use serde_json::Value;
use std::io::{Error, Write};
use tempfile::NamedTempFile;

pub const MERCHANT_HEADER: &str = "ref, name, description, email, status";
pub const TRANSACTION_HEADER: &str =
    "ref, parent, merchant, type, amount, customer_email, customer_phone";

/// Writes a CSV file with the given header and rows.
pub fn csv_file(header: &str, rows: &[&str]) -> Result<NamedTempFile, Error> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{header}")?;
    for row in rows {
        writeln!(file, "{row}")?;
    }
    file.flush()?;
    Ok(file)
}

pub fn merchants_file(rows: &[&str]) -> Result<NamedTempFile, Error> {
    csv_file(MERCHANT_HEADER, rows)
}

pub fn transactions_file(rows: &[&str]) -> Result<NamedTempFile, Error> {
    csv_file(TRANSACTION_HEADER, rows)
}

/// Finds the entry labelled `reference` in one section of the JSON report.
pub fn entry<'a>(report: &'a Value, section: &str, reference: &str) -> &'a Value {
    report[section]
        .as_array()
        .and_then(|entries| entries.iter().find(|e| e["ref"] == reference))
        .unwrap_or_else(|| panic!("no {section} entry labelled {reference}"))
}
