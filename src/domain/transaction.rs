use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Authorize,
    Charge,
    Refund,
    Reversal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::Charge => "charge",
            Self::Refund => "refund",
            Self::Reversal => "reversal",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "authorize" => Ok(Self::Authorize),
            "charge" => Ok(Self::Charge),
            "refund" => Ok(Self::Refund),
            "reversal" => Ok(Self::Reversal),
            other => Err(PaymentError::InvalidTransactionType(other.to_string())),
        }
    }
}

/// Outcome recorded on a transaction.
///
/// `Error`, `Refunded` and `Reversed` are terminal: nothing moves a record out of them.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Approved,
    Reversed,
    Refunded,
    Error,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reversed => "reversed",
            Self::Refunded => "refunded",
            Self::Error => "error",
        }
    }

    /// Whether a child may still be decided against a parent in this state. Anything
    /// else turns the child into an `error` record.
    pub fn is_usable_parent(self) -> bool {
        matches!(self, Self::Approved | Self::Refunded)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "approved" => Ok(Self::Approved),
            "reversed" => Ok(Self::Reversed),
            "refunded" => Ok(Self::Refunded),
            "error" => Ok(Self::Error),
            other => Err(PaymentError::invalid_field(
                "status",
                format!("unknown transaction status `{other}`"),
            )),
        }
    }
}

/// A transaction as submitted by a merchant, before the engine has decided its outcome.
#[derive(Debug, PartialEq, Clone)]
pub struct NewTransaction {
    pub parent_id: Option<Uuid>,
    pub merchant_id: Option<Uuid>,
    pub r#type: TransactionType,
    /// Smallest currency unit.
    pub amount: i64,
    /// Must stay `None`; the engine owns the outcome.
    pub status: Option<TransactionStatus>,
    pub customer_email: String,
    pub customer_phone: Option<String>,
}

/// A persisted transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub merchant_id: Uuid,
    pub r#type: TransactionType,
    pub amount: i64,
    pub status: TransactionStatus,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Finalizes a validated candidate with a fresh identifier and the decided status.
    pub fn from_candidate(
        candidate: NewTransaction,
        merchant_id: Uuid,
        status: TransactionStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: candidate.parent_id,
            merchant_id,
            r#type: candidate.r#type,
            amount: candidate.amount,
            status,
            customer_email: candidate.customer_email,
            customer_phone: candidate.customer_phone,
            created_at: Utc::now(),
        }
    }

    pub fn is_approved_charge(&self) -> bool {
        self.r#type == TransactionType::Charge && self.status == TransactionStatus::Approved
    }
}

/// Precondition on a child's parent, checked under the store's write guard in the same
/// atomic unit as the child's insert.
///
/// Every charge, refund and reversal carries one, so two children racing for the same
/// parent are settled in some serial order.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ParentGuard {
    pub id: Uuid,
    /// Status the parent had when the child was decided.
    pub expected: TransactionStatus,
    /// New parent status, for refunds and reversals.
    pub advance: Option<TransactionStatus>,
}

impl ParentGuard {
    /// Applies the guard to the stored `parent` and the pending `child`.
    ///
    /// If the parent still has the expected status it is advanced. If it has since left
    /// the usable states the child becomes an `error` record and the parent is untouched.
    /// Otherwise the unit fails with `InvalidParentStatus`. Returns whether `parent` changed.
    pub fn settle(
        &self,
        parent: &mut Transaction,
        child: &mut Transaction,
    ) -> Result<bool, PaymentError> {
        if parent.status == self.expected {
            return Ok(match self.advance {
                Some(status) => {
                    parent.status = status;
                    true
                }
                None => false,
            });
        }
        if parent.status.is_usable_parent() {
            return Err(PaymentError::InvalidParentStatus(parent.status));
        }
        child.status = TransactionStatus::Error;
        Ok(false)
    }
}

/// Listing filter. The only supported predicate is an age cutoff.
#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct TransactionQuery {
    /// Keep only rows created strictly before this instant.
    pub older_than: Option<DateTime<Utc>>,
}

impl TransactionQuery {
    pub fn older_than(cutoff: DateTime<Utc>) -> Self {
        Self {
            older_than: Some(cutoff),
        }
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.older_than.is_none_or(|cutoff| tx.created_at < cutoff)
    }
}
