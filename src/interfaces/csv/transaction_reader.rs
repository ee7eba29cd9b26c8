use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One row of a transaction batch, before labels are resolved to identifiers.
///
/// `reference` names the row within the batch; `parent` and `merchant` point at labels
/// defined earlier in the batch or carry literal UUIDs. `type` stays textual so an
/// unknown value surfaces as `InvalidTransactionType` rather than a decode error.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    #[serde(rename = "ref")]
    pub reference: String,
    pub parent: Option<String>,
    pub merchant: String,
    pub r#type: String,
    pub amount: i64,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

/// Reads transaction candidates from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<TransactionRecord>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        Self {
            reader: super::reader_builder().from_reader(source),
        }
    }

    /// Returns an iterator that lazily reads and deserializes records.
    pub fn transactions(self) -> impl Iterator<Item = Result<TransactionRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
