use crate::domain::admin::{Admin, NewAdmin};
use crate::domain::merchant::{Merchant, MerchantSummary, MerchantUpdate, NewMerchant};
use crate::domain::ports::{MerchantStoreRef, TransactionStoreRef};
use crate::domain::transaction::{Transaction, TransactionQuery};
use crate::domain::validation::{
    validate_admin_create, validate_merchant_create, validate_merchant_delete,
    validate_merchant_update,
};
use crate::error::{PaymentError, Result};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

/// Administrative side of the system: admins, merchant accounts and their totals.
///
/// Totals are never stored. Each read folds the transaction ledger again, so there is
/// no counter that could drift from the ledger.
#[derive(Clone)]
pub struct MerchantDirectory {
    merchant_store: MerchantStoreRef,
    transaction_store: TransactionStoreRef,
}

impl MerchantDirectory {
    pub fn new(merchant_store: MerchantStoreRef, transaction_store: TransactionStoreRef) -> Self {
        Self {
            merchant_store,
            transaction_store,
        }
    }

    /// Creates admins in order, stopping at the first failure.
    ///
    /// Admins created before the failing entry stay persisted.
    pub async fn create_admins(&self, admins: Vec<NewAdmin>) -> Result<Vec<Admin>> {
        let mut created = Vec::with_capacity(admins.len());
        for admin in admins {
            validate_admin_create(&admin)?;
            let admin = self.merchant_store.create_admin(admin.into_admin()).await?;
            info!(admin_id = %admin.id, "admin created");
            created.push(admin);
        }
        Ok(created)
    }

    /// Creates merchants in order, stopping at the first failure.
    pub async fn create_merchants(&self, merchants: Vec<NewMerchant>) -> Result<Vec<Merchant>> {
        let mut created = Vec::with_capacity(merchants.len());
        for merchant in merchants {
            validate_merchant_create(&merchant)?;
            let merchant = self
                .merchant_store
                .create_merchant(merchant.into_merchant())
                .await?;
            info!(merchant_id = %merchant.id, status = %merchant.status, "merchant created");
            created.push(merchant);
        }
        Ok(created)
    }

    pub async fn update_merchant(&self, update: MerchantUpdate) -> Result<MerchantSummary> {
        let update = update.normalized();
        validate_merchant_update(&update)?;
        let id = update
            .id
            .ok_or(PaymentError::MissingIdentifier("merchant_id"))?;

        let merchant = self.merchant_store.update_merchant(id, update).await?;
        info!(merchant_id = %id, "merchant updated");
        self.summarize(merchant).await
    }

    /// Soft-deletes a merchant that owns no transactions.
    pub async fn delete_merchant(&self, id: Option<Uuid>) -> Result<()> {
        let id = validate_merchant_delete(id)?;
        self.merchant_store.delete_merchant(id).await?;
        info!(merchant_id = %id, "merchant deleted");
        Ok(())
    }

    pub async fn merchant(&self, id: Uuid) -> Result<Option<MerchantSummary>> {
        match self.merchant_store.get_merchant(id).await? {
            Some(merchant) => Ok(Some(self.summarize(merchant).await?)),
            None => Ok(None),
        }
    }

    /// Lists live merchants in no particular order.
    pub async fn merchants(&self) -> Result<Vec<MerchantSummary>> {
        let merchants = self.merchant_store.all_merchants().await?;
        let ledger = self.transaction_store.list(TransactionQuery::default()).await?;
        let totals = approved_charge_totals(&ledger);

        Ok(merchants
            .into_iter()
            .map(|merchant| {
                let approved_charge_total = totals.get(&merchant.id).copied().unwrap_or(0);
                MerchantSummary {
                    merchant,
                    approved_charge_total,
                }
            })
            .collect())
    }

    async fn summarize(&self, merchant: Merchant) -> Result<MerchantSummary> {
        let ledger = self.transaction_store.list(TransactionQuery::default()).await?;
        let approved_charge_total = approved_charge_totals(&ledger)
            .get(&merchant.id)
            .copied()
            .unwrap_or(0);
        Ok(MerchantSummary {
            merchant,
            approved_charge_total,
        })
    }
}

/// Sums approved charges per owning merchant.
pub fn approved_charge_totals(ledger: &[Transaction]) -> HashMap<Uuid, i64> {
    let mut totals = HashMap::new();
    for tx in ledger.iter().filter(|tx| tx.is_approved_charge()) {
        let total: &mut i64 = totals.entry(tx.merchant_id).or_default();
        *total = total.saturating_add(tx.amount);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merchant::MerchantStatus;
    use crate::domain::transaction::{TransactionStatus, TransactionType};
    use crate::infrastructure::in_memory::InMemoryStore;
    use chrono::Utc;
    use std::sync::Arc;

    fn directory() -> MerchantDirectory {
        let store = InMemoryStore::new();
        MerchantDirectory::new(Arc::new(store.clone()), Arc::new(store))
    }

    fn new_merchant(name: &str, email: &str) -> NewMerchant {
        NewMerchant {
            name: name.to_string(),
            description: format!("{name} description"),
            email: email.to_string(),
            status: None,
        }
    }

    fn ledger_entry(
        merchant_id: Uuid,
        r#type: TransactionType,
        status: TransactionStatus,
        amount: i64,
    ) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            parent_id: None,
            merchant_id,
            r#type,
            amount,
            status,
            customer_email: "buyer@example.com".to_string(),
            customer_phone: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_totals_count_only_approved_charges() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ledger = vec![
            ledger_entry(a, TransactionType::Authorize, TransactionStatus::Approved, 500),
            ledger_entry(a, TransactionType::Charge, TransactionStatus::Approved, 100),
            ledger_entry(a, TransactionType::Charge, TransactionStatus::Approved, 40),
            ledger_entry(a, TransactionType::Charge, TransactionStatus::Refunded, 70),
            ledger_entry(a, TransactionType::Refund, TransactionStatus::Refunded, 70),
            ledger_entry(a, TransactionType::Charge, TransactionStatus::Error, 10),
            ledger_entry(b, TransactionType::Charge, TransactionStatus::Approved, 7),
        ];

        let totals = approved_charge_totals(&ledger);
        assert_eq!(totals.get(&a), Some(&140));
        assert_eq!(totals.get(&b), Some(&7));
    }

    #[tokio::test]
    async fn test_create_merchants_stops_at_first_invalid() {
        let directory = directory();
        let result = directory
            .create_merchants(vec![
                new_merchant("One", "one@example.com"),
                new_merchant("", "two@example.com"),
                new_merchant("Three", "three@example.com"),
            ])
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::InvalidField { field: "name", .. })
        ));
        let listed = directory.merchants().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].merchant.name, "One");
        assert_eq!(listed[0].approved_charge_total, 0);
    }

    #[tokio::test]
    async fn test_create_admins() {
        let directory = directory();
        let admins = directory
            .create_admins(vec![NewAdmin {
                name: "Root".to_string(),
                description: "operator".to_string(),
                email: "root@example.com".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);

        // Admins and merchants share one email namespace.
        assert!(matches!(
            directory
                .create_merchants(vec![new_merchant("Shop", "root@example.com")])
                .await,
            Err(PaymentError::EmailTaken(_))
        ));
    }

    #[tokio::test]
    async fn test_update_merchant_partial() {
        let directory = directory();
        let created = directory
            .create_merchants(vec![new_merchant("Shop", "shop@example.com")])
            .await
            .unwrap();
        let id = created[0].id;

        let updated = directory
            .update_merchant(MerchantUpdate {
                id: Some(id),
                name: Some("Renamed".to_string()),
                description: Some(String::new()),
                email: None,
                status: Some(MerchantStatus::Inactive),
            })
            .await
            .unwrap();

        assert_eq!(updated.merchant.name, "Renamed");
        assert_eq!(updated.merchant.description, "Shop description");
        assert_eq!(updated.merchant.email, "shop@example.com");
        assert_eq!(updated.merchant.status, MerchantStatus::Inactive);

        assert!(matches!(
            directory.update_merchant(MerchantUpdate::default()).await,
            Err(PaymentError::MissingIdentifier("merchant_id"))
        ));
        assert!(matches!(
            directory
                .update_merchant(MerchantUpdate {
                    id: Some(Uuid::new_v4()),
                    ..Default::default()
                })
                .await,
            Err(PaymentError::MerchantNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_merchant_excludes_from_listing() {
        let directory = directory();
        let created = directory
            .create_merchants(vec![
                new_merchant("Keep", "keep@example.com"),
                new_merchant("Drop", "drop@example.com"),
            ])
            .await
            .unwrap();

        assert!(matches!(
            directory.delete_merchant(None).await,
            Err(PaymentError::MissingIdentifier("merchant_id"))
        ));

        directory.delete_merchant(Some(created[1].id)).await.unwrap();
        let listed = directory.merchants().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].merchant.id, created[0].id);
        assert!(directory.merchant(created[1].id).await.unwrap().is_none());
    }
}
