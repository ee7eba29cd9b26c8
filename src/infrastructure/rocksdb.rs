use crate::domain::admin::Admin;
use crate::domain::merchant::{Merchant, MerchantUpdate};
use crate::domain::ports::{MerchantStore, TransactionStore};
use crate::domain::transaction::{ParentGuard, Transaction, TransactionQuery};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Column Family for storing admins.
pub const CF_ADMINS: &str = "admins";
/// Column Family for storing merchants, tombstoned ones included.
pub const CF_MERCHANTS: &str = "merchants";
/// Column Family for storing transaction history.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family mapping lowercased emails to the id of their owner.
pub const CF_EMAILS: &str = "emails";

/// A persistent gateway implementation using RocksDB.
///
/// Entities live in separate Column Families as JSON values keyed by their UUID bytes.
/// Writes spanning several keys go through a single `WriteBatch`, which RocksDB applies
/// atomically. Sequences that read before they write (parent status checks, the
/// owned-transaction check on delete, email reservation, purge) are serialised by
/// `write_lock`, which makes them mutually exclusive with each other.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ADMINS, CF_MERCHANTS, CF_TRANSACTIONS, CF_EMAILS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            PaymentError::storage(std::io::Error::other(format!(
                "{name} column family not found"
            )))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &'static str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &'static str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .iterator_cf(cf, IteratorMode::Start)
            .map(|item| {
                let (_key, value) = item?;
                decode(&value)
            })
            .collect()
    }

    /// Adds the email reservation to `batch`, failing if another owner holds it.
    fn reserve_email(&self, batch: &mut WriteBatch, email: &str, owner: Uuid) -> Result<()> {
        let key = email.to_lowercase();
        let cf = self.cf(CF_EMAILS)?;
        if self.db.get_pinned_cf(cf, key.as_bytes())?.is_some() {
            return Err(PaymentError::EmailTaken(email.to_string()));
        }
        batch.put_cf(cf, key.as_bytes(), owner.as_bytes());
        Ok(())
    }

    fn live_merchant(&self, id: Uuid) -> Result<Merchant> {
        self.read::<Merchant>(CF_MERCHANTS, id.as_bytes())?
            .filter(|m| !m.is_deleted())
            .ok_or(PaymentError::MerchantNotFound(id))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(PaymentError::storage)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(PaymentError::storage)
}

#[async_trait]
impl MerchantStore for RocksDBStore {
    async fn create_admin(&self, admin: Admin) -> Result<Admin> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        self.reserve_email(&mut batch, &admin.email, admin.id)?;
        batch.put_cf(self.cf(CF_ADMINS)?, admin.id.as_bytes(), encode(&admin)?);
        self.db.write(batch)?;
        Ok(admin)
    }

    async fn create_merchant(&self, merchant: Merchant) -> Result<Merchant> {
        let _guard = self.write_lock.lock().await;
        let mut batch = WriteBatch::default();
        self.reserve_email(&mut batch, &merchant.email, merchant.id)?;
        batch.put_cf(
            self.cf(CF_MERCHANTS)?,
            merchant.id.as_bytes(),
            encode(&merchant)?,
        );
        self.db.write(batch)?;
        Ok(merchant)
    }

    async fn get_merchant(&self, id: Uuid) -> Result<Option<Merchant>> {
        Ok(self
            .read::<Merchant>(CF_MERCHANTS, id.as_bytes())?
            .filter(|m| !m.is_deleted()))
    }

    async fn update_merchant(&self, id: Uuid, update: MerchantUpdate) -> Result<Merchant> {
        let _guard = self.write_lock.lock().await;
        let mut merchant = self.live_merchant(id)?;
        let mut batch = WriteBatch::default();

        if let Some(email) = &update.email
            && !email.eq_ignore_ascii_case(&merchant.email)
        {
            self.reserve_email(&mut batch, email, id)?;
            batch.delete_cf(self.cf(CF_EMAILS)?, merchant.email.to_lowercase().as_bytes());
        }

        merchant.apply(&update);
        batch.put_cf(self.cf(CF_MERCHANTS)?, id.as_bytes(), encode(&merchant)?);
        self.db.write(batch)?;
        Ok(merchant)
    }

    async fn delete_merchant(&self, id: Uuid) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut merchant = self.live_merchant(id)?;

        let count = self
            .scan::<Transaction>(CF_TRANSACTIONS)?
            .iter()
            .filter(|tx| tx.merchant_id == id)
            .count();
        if count > 0 {
            return Err(PaymentError::OwnedRecordsExist {
                merchant: id,
                count,
            });
        }

        merchant.deleted_at = Some(Utc::now());
        self.db
            .put_cf(self.cf(CF_MERCHANTS)?, id.as_bytes(), encode(&merchant)?)?;
        Ok(())
    }

    async fn all_merchants(&self) -> Result<Vec<Merchant>> {
        Ok(self
            .scan::<Merchant>(CF_MERCHANTS)?
            .into_iter()
            .filter(|m| !m.is_deleted())
            .collect())
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>> {
        self.read(CF_TRANSACTIONS, tx_id.as_bytes())
    }

    async fn create_atomic(
        &self,
        mut tx: Transaction,
        parent: Option<ParentGuard>,
    ) -> Result<Transaction> {
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut batch = WriteBatch::default();

        if let Some(guard) = parent {
            let mut stored: Transaction = self
                .read(CF_TRANSACTIONS, guard.id.as_bytes())?
                .ok_or(PaymentError::ParentNotFound(guard.id))?;
            if guard.settle(&mut stored, &mut tx)? {
                batch.put_cf(cf, stored.id.as_bytes(), encode(&stored)?);
            }
        }

        batch.put_cf(cf, tx.id.as_bytes(), encode(&tx)?);
        self.db.write(batch)?;
        Ok(tx)
    }

    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        Ok(self
            .scan::<Transaction>(CF_TRANSACTIONS)?
            .into_iter()
            .filter(|tx| query.matches(tx))
            .collect())
    }

    async fn purge(&self, older_than: Option<DateTime<Utc>>) -> Result<usize> {
        let Some(cutoff) = older_than else {
            return Ok(0);
        };
        let _guard = self.write_lock.lock().await;
        let cf = self.cf(CF_TRANSACTIONS)?;

        let mut batch = WriteBatch::default();
        let mut removed = 0;
        for tx in self.scan::<Transaction>(CF_TRANSACTIONS)? {
            if tx.created_at < cutoff {
                batch.delete_cf(cf, tx.id.as_bytes());
                removed += 1;
            }
        }
        self.db.write(batch)?;
        Ok(removed)
    }
}
