use crate::domain::admin::Admin;
use crate::domain::merchant::{Merchant, MerchantUpdate};
use crate::domain::ports::{MerchantStore, TransactionStore};
use crate::domain::transaction::{ParentGuard, Transaction, TransactionQuery};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Ledger {
    admins: HashMap<Uuid, Admin>,
    merchants: HashMap<Uuid, Merchant>,
    /// Lowercased emails of every admin and merchant, tombstoned merchants included.
    emails: HashSet<String>,
    transactions: HashMap<Uuid, Transaction>,
}

impl Ledger {
    fn reserve_email(&mut self, email: &str) -> Result<()> {
        if !self.emails.insert(email.to_lowercase()) {
            return Err(PaymentError::EmailTaken(email.to_string()));
        }
        Ok(())
    }

    fn live_merchant_mut(&mut self, id: Uuid) -> Result<&mut Merchant> {
        self.merchants
            .get_mut(&id)
            .filter(|m| !m.is_deleted())
            .ok_or(PaymentError::MerchantNotFound(id))
    }

    fn owned_transactions(&self, merchant: Uuid) -> usize {
        self.transactions
            .values()
            .filter(|tx| tx.merchant_id == merchant)
            .count()
    }
}

/// A thread-safe in-memory gateway implementing both store ports.
///
/// All state sits behind a single `Arc<RwLock<_>>`, so every write (including
/// `create_atomic` and `purge`) runs under one exclusive guard and is atomic with
/// respect to every other operation. Clones share the same ledger.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MerchantStore for InMemoryStore {
    async fn create_admin(&self, admin: Admin) -> Result<Admin> {
        let mut ledger = self.ledger.write().await;
        ledger.reserve_email(&admin.email)?;
        ledger.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn create_merchant(&self, merchant: Merchant) -> Result<Merchant> {
        let mut ledger = self.ledger.write().await;
        ledger.reserve_email(&merchant.email)?;
        ledger.merchants.insert(merchant.id, merchant.clone());
        Ok(merchant)
    }

    async fn get_merchant(&self, id: Uuid) -> Result<Option<Merchant>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.merchants.get(&id).filter(|m| !m.is_deleted()).cloned())
    }

    async fn update_merchant(&self, id: Uuid, update: MerchantUpdate) -> Result<Merchant> {
        let mut ledger = self.ledger.write().await;
        let current_email = ledger.live_merchant_mut(id)?.email.clone();

        if let Some(email) = &update.email
            && !email.eq_ignore_ascii_case(&current_email)
        {
            ledger.reserve_email(email)?;
            ledger.emails.remove(&current_email.to_lowercase());
        }

        let merchant = ledger.live_merchant_mut(id)?;
        merchant.apply(&update);
        Ok(merchant.clone())
    }

    async fn delete_merchant(&self, id: Uuid) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        ledger.live_merchant_mut(id)?;

        let count = ledger.owned_transactions(id);
        if count > 0 {
            return Err(PaymentError::OwnedRecordsExist {
                merchant: id,
                count,
            });
        }

        ledger.live_merchant_mut(id)?.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn all_merchants(&self) -> Result<Vec<Merchant>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .merchants
            .values()
            .filter(|m| !m.is_deleted())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionStore for InMemoryStore {
    async fn get(&self, tx_id: Uuid) -> Result<Option<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.transactions.get(&tx_id).cloned())
    }

    async fn create_atomic(
        &self,
        mut tx: Transaction,
        parent: Option<ParentGuard>,
    ) -> Result<Transaction> {
        let mut ledger = self.ledger.write().await;

        // `settle` only touches the parent once the guard has passed.
        if let Some(guard) = parent {
            let stored = ledger
                .transactions
                .get_mut(&guard.id)
                .ok_or(PaymentError::ParentNotFound(guard.id))?;
            guard.settle(stored, &mut tx)?;
        }

        ledger.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn list(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .transactions
            .values()
            .filter(|tx| query.matches(tx))
            .cloned()
            .collect())
    }

    async fn purge(&self, older_than: Option<DateTime<Utc>>) -> Result<usize> {
        let Some(cutoff) = older_than else {
            return Ok(0);
        };
        let mut ledger = self.ledger.write().await;
        let before = ledger.transactions.len();
        ledger.transactions.retain(|_, tx| tx.created_at >= cutoff);
        Ok(before - ledger.transactions.len())
    }
}
