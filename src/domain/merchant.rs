use crate::error::PaymentError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum MerchantStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for MerchantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

impl FromStr for MerchantStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(PaymentError::invalid_field(
                "status",
                format!("merchant status must be `active` or `inactive`, got `{other}`"),
            )),
        }
    }
}

/// A merchant account as held by the store.
///
/// The approved-charge total is deliberately absent; see [`MerchantSummary`].
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Merchant {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub email: String,
    pub status: MerchantStatus,
    pub created_at: DateTime<Utc>,
    /// Tombstone. Deleted merchants are invisible to lookups but keep their id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Merchant {
    pub fn is_active(&self) -> bool {
        self.status == MerchantStatus::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Overwrites only the columns the update carries.
    pub fn apply(&mut self, update: &MerchantUpdate) {
        if let Some(name) = &update.name {
            self.name.clone_from(name);
        }
        if let Some(description) = &update.description {
            self.description.clone_from(description);
        }
        if let Some(email) = &update.email {
            self.email.clone_from(email);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Candidate merchant submitted by an administrator.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct NewMerchant {
    pub name: String,
    pub description: String,
    pub email: String,
    /// Defaults to active.
    pub status: Option<MerchantStatus>,
}

impl NewMerchant {
    pub fn into_merchant(self) -> Merchant {
        Merchant {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            email: self.email,
            status: self.status.unwrap_or_default(),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }
}

/// Partial update. `None` (or an empty string) leaves the column unchanged.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct MerchantUpdate {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub status: Option<MerchantStatus>,
}

impl MerchantUpdate {
    /// Folds empty strings into "no change", so an empty field never clears a column.
    pub fn normalized(self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            id: self.id,
            name: non_empty(self.name),
            description: non_empty(self.description),
            email: non_empty(self.email),
            status: self.status,
        }
    }
}

/// Read model returned by the merchant directory: the stored merchant plus the sum of its
/// approved charges, recomputed from the transaction ledger on every read.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct MerchantSummary {
    #[serde(flatten)]
    pub merchant: Merchant,
    pub approved_charge_total: i64,
}
