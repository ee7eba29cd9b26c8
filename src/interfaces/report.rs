use crate::domain::merchant::MerchantSummary;
use crate::domain::transaction::Transaction;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// An entity tagged with the batch label it was submitted under.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Labeled<T> {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(flatten)]
    pub entity: T,
}

/// A row the batch skipped, with the reason.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Rejection {
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    pub error: String,
}

/// Final state of everything a batch touched.
#[derive(Debug, Serialize, Default, PartialEq, Clone)]
pub struct Report {
    pub merchants: Vec<Labeled<MerchantSummary>>,
    pub transactions: Vec<Labeled<Transaction>>,
    pub rejected: Vec<Rejection>,
}

/// Writes a [`Report`] as pretty-printed JSON.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_report(&mut self, report: &Report) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report).map_err(std::io::Error::from)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
