use super::admin::Admin;
use super::merchant::{Merchant, MerchantUpdate};
use super::transaction::{ParentGuard, Transaction, TransactionQuery};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Admins and merchants. Emails are unique across both.
#[async_trait]
pub trait MerchantStore: Send + Sync {
    async fn create_admin(&self, admin: Admin) -> Result<Admin>;
    async fn create_merchant(&self, merchant: Merchant) -> Result<Merchant>;
    /// Tombstoned merchants are reported as absent.
    async fn get_merchant(&self, id: Uuid) -> Result<Option<Merchant>>;
    /// Column-level update. Fails with `MerchantNotFound` for unknown or tombstoned ids.
    async fn update_merchant(&self, id: Uuid, update: MerchantUpdate) -> Result<Merchant>;
    /// Soft delete. Fails with `OwnedRecordsExist` while the merchant owns transactions.
    async fn delete_merchant(&self, id: Uuid) -> Result<()>;
    async fn all_merchants(&self) -> Result<Vec<Merchant>>;
}

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>>;
    /// Settles `parent` against the stored parent and inserts `tx` as one atomic unit:
    /// both writes are visible or neither. Returns the child as stored, which is an
    /// `error` record when the parent left the usable states in the meantime.
    async fn create_atomic(
        &self,
        tx: Transaction,
        parent: Option<ParentGuard>,
    ) -> Result<Transaction>;
    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>>;
    /// Deletes rows created strictly before `older_than`. `None` deletes nothing.
    async fn purge(&self, older_than: Option<DateTime<Utc>>) -> Result<usize>;
}

pub type MerchantStoreRef = Arc<dyn MerchantStore>;
pub type TransactionStoreRef = Arc<dyn TransactionStore>;
