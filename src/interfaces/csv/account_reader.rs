use crate::domain::admin::NewAdmin;
use crate::domain::merchant::{MerchantStatus, NewMerchant};
use crate::error::{PaymentError, Result};
use serde::Deserialize;
use std::io::Read;

/// One merchant row. `status` may be left blank to take the default.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct MerchantRecord {
    #[serde(rename = "ref")]
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub email: String,
    pub status: Option<String>,
}

impl MerchantRecord {
    pub fn into_candidate(self) -> Result<NewMerchant> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<MerchantStatus>)
            .transpose()?;
        Ok(NewMerchant {
            name: self.name,
            description: self.description,
            email: self.email,
            status,
        })
    }
}

/// Reads admin (`name, description, email`) or merchant rows from a CSV source.
pub struct AccountReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> AccountReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: super::reader_builder().from_reader(source),
        }
    }

    pub fn admins(self) -> impl Iterator<Item = Result<NewAdmin>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }

    pub fn merchants(self) -> impl Iterator<Item = Result<MerchantRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(PaymentError::from))
    }
}
