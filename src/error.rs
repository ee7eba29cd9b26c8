use crate::domain::transaction::{TransactionStatus, TransactionType};
use thiserror::Error;
use uuid::Uuid;

/// Every failure the lifecycle engine, the merchant directory or a store can report.
///
/// Each variant is a distinct kind so callers can map it to a precise message.
/// Validation and referential errors mean nothing was persisted.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("missing identifier: {0}")]
    MissingIdentifier(&'static str),
    #[error("transaction status must not be set by the caller")]
    IllegalPresetState,
    #[error("merchant {0} not found")]
    MerchantNotFound(Uuid),
    #[error("merchant {0} is not active")]
    MerchantInactive(Uuid),
    #[error("parent transaction {0} not found")]
    ParentNotFound(Uuid),
    #[error("parent transaction {parent} is not owned by merchant {merchant}")]
    ForeignParent { parent: Uuid, merchant: Uuid },
    #[error("invalid parent transaction type: expected {expected}, found {found}")]
    InvalidParentType {
        expected: TransactionType,
        found: TransactionType,
    },
    #[error("invalid parent transaction status: {0}")]
    InvalidParentStatus(TransactionStatus),
    #[error("amount {requested} exceeds authorized amount {authorized}")]
    AmountExceedsAuthorized { requested: i64, authorized: i64 },
    #[error("amount {requested} differs from charged amount {charged}")]
    AmountMismatch { requested: i64, charged: i64 },
    #[error("invalid transaction type: {0}")]
    InvalidTransactionType(String),
    #[error("merchant {merchant} still owns {count} transaction(s)")]
    OwnedRecordsExist { merchant: Uuid, count: usize },
    #[error("email {0} is already taken")]
    EmailTaken(String),
    #[error("storage failure: {0}")]
    StorageFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PaymentError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::StorageFailure(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for PaymentError {
    fn from(err: rocksdb::Error) -> Self {
        Self::storage(err)
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
