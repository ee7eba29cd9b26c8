//! Syntactic checks run before any mutation.
//!
//! Every function here is a pure predicate over a candidate value. Validating an
//! already-valid value again always succeeds.

use super::admin::NewAdmin;
use super::merchant::{MerchantUpdate, NewMerchant};
use super::transaction::{NewTransaction, TransactionType};
use crate::error::{PaymentError, Result};
use uuid::Uuid;

const MAX_LOCAL_PART: usize = 64;
const MAX_DOMAIN: usize = 253;
const MAX_LABEL: usize = 63;

pub fn validate_admin_create(admin: &NewAdmin) -> Result<()> {
    require_name(&admin.name)?;
    validate_email("email", &admin.email)
}

pub fn validate_merchant_create(merchant: &NewMerchant) -> Result<()> {
    require_name(&merchant.name)?;
    validate_email("email", &merchant.email)
}

/// Expects a [`MerchantUpdate::normalized`] value, where empty strings already mean
/// "no change".
pub fn validate_merchant_update(update: &MerchantUpdate) -> Result<()> {
    if update.id.is_none() {
        return Err(PaymentError::MissingIdentifier("merchant_id"));
    }
    if let Some(email) = &update.email {
        validate_email("email", email)?;
    }
    Ok(())
}

pub fn validate_merchant_delete(id: Option<Uuid>) -> Result<Uuid> {
    id.ok_or(PaymentError::MissingIdentifier("merchant_id"))
}

pub fn validate_transaction_create(tx: &NewTransaction) -> Result<()> {
    if tx.merchant_id.is_none() {
        return Err(PaymentError::MissingIdentifier("merchant_id"));
    }
    validate_email("customer_email", &tx.customer_email)?;
    if tx.status.is_some() {
        return Err(PaymentError::IllegalPresetState);
    }

    match tx.r#type {
        TransactionType::Authorize => {
            if tx.parent_id.is_some() {
                return Err(PaymentError::invalid_field(
                    "parent_id",
                    "authorize cannot reference a parent transaction",
                ));
            }
            require_positive_amount(tx.amount)
        }
        TransactionType::Charge | TransactionType::Refund => {
            require_parent(tx)?;
            require_positive_amount(tx.amount)
        }
        TransactionType::Reversal => {
            require_parent(tx)?;
            if tx.amount != 0 {
                return Err(PaymentError::invalid_field(
                    "amount",
                    "reversal must carry a zero amount",
                ));
            }
            Ok(())
        }
    }
}

fn require_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PaymentError::invalid_field("name", "name cannot be empty"));
    }
    Ok(())
}

fn require_parent(tx: &NewTransaction) -> Result<()> {
    if tx.parent_id.is_none() {
        return Err(PaymentError::MissingIdentifier("parent_id"));
    }
    Ok(())
}

fn require_positive_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(PaymentError::invalid_field(
            "amount",
            "amount must be positive",
        ));
    }
    Ok(())
}

/// Checks an RFC 5322 `addr-spec`: `local@domain`, where the local part is a dot-atom or
/// a quoted string such as `"john doe"`.
pub fn validate_email(field: &'static str, address: &str) -> Result<()> {
    let invalid = |reason: &str| Err(PaymentError::invalid_field(field, reason));

    if address.is_empty() {
        return invalid("email cannot be empty");
    }
    if address.trim() != address {
        return invalid("email has surrounding whitespace");
    }
    let Some((local, domain)) = address.rsplit_once('@') else {
        return invalid("email is missing `@`");
    };
    if local.is_empty() || local.len() > MAX_LOCAL_PART {
        return invalid("email local part has an invalid length");
    }
    if !is_dot_atom(local, is_atext) && !is_quoted_string(local) {
        return invalid("email local part is malformed");
    }
    if domain.is_empty() || domain.len() > MAX_DOMAIN {
        return invalid("email domain has an invalid length");
    }
    if !domain.split('.').all(is_domain_label) {
        return invalid("email domain is malformed");
    }
    Ok(())
}

fn is_dot_atom(s: &str, allowed: fn(char) -> bool) -> bool {
    s.split('.')
        .all(|atom| !atom.is_empty() && atom.chars().all(allowed))
}

/// `"…"` holding printable ASCII, spaces and backslash escapes. Must not be empty.
fn is_quoted_string(s: &str) -> bool {
    let Some(inner) = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };
    if inner.is_empty() {
        return false;
    }
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        let ok = match c {
            '\\' => chars.next().is_some_and(is_quotable),
            '"' => false,
            c => is_quotable(c),
        };
        if !ok {
            return false;
        }
    }
    true
}

fn is_quotable(c: char) -> bool {
    c == ' ' || c == '\t' || c.is_ascii_graphic()
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn is_domain_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
