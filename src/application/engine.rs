use crate::domain::ports::{MerchantStoreRef, TransactionStoreRef};
use crate::domain::transaction::{
    NewTransaction, ParentGuard, Transaction, TransactionQuery, TransactionStatus,
    TransactionType,
};
use crate::domain::validation::validate_transaction_create;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the engine decided for a candidate whose checks all passed.
struct Decision {
    status: TransactionStatus,
    parent: Option<ParentGuard>,
}

impl Decision {
    fn status(status: TransactionStatus) -> Self {
        Self {
            status,
            parent: None,
        }
    }

    /// The parent must still be approved at commit time; `advance` is its next status.
    fn guarded(
        status: TransactionStatus,
        parent: &Transaction,
        advance: Option<TransactionStatus>,
    ) -> Self {
        Self {
            status,
            parent: Some(ParentGuard {
                id: parent.id,
                expected: TransactionStatus::Approved,
                advance,
            }),
        }
    }
}

/// The single authority on transaction outcomes.
///
/// `TransactionEngine` validates a candidate, checks the owning merchant and the
/// referenced parent, decides the resulting status and persists the new transaction
/// together with any parent status change as one atomic unit. It holds no state of its
/// own beyond the store handles, so it is safe to share across concurrent requests.
#[derive(Clone)]
pub struct TransactionEngine {
    merchant_store: MerchantStoreRef,
    transaction_store: TransactionStoreRef,
}

impl TransactionEngine {
    /// Creates a new `TransactionEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `merchant_store` - The store used to resolve the owning merchant.
    /// * `transaction_store` - The transaction ledger.
    pub fn new(merchant_store: MerchantStoreRef, transaction_store: TransactionStoreRef) -> Self {
        Self {
            merchant_store,
            transaction_store,
        }
    }

    /// Decides the outcome of a candidate transaction and persists it.
    ///
    /// Validation and referential failures return an error with nothing persisted.
    /// A charge, refund or reversal whose parent is no longer in a usable state is the
    /// one exception: it is recorded with status `error` and the parent is left as is.
    /// The store re-checks the parent at commit, so this also covers a parent that a
    /// concurrent reversal moved after it was read.
    pub async fn start_transaction(&self, candidate: NewTransaction) -> Result<Transaction> {
        validate_transaction_create(&candidate)?;
        let merchant_id = candidate
            .merchant_id
            .ok_or(PaymentError::MissingIdentifier("merchant_id"))?;

        let merchant = self
            .merchant_store
            .get_merchant(merchant_id)
            .await?
            .ok_or(PaymentError::MerchantNotFound(merchant_id))?;
        if !merchant.is_active() {
            return Err(PaymentError::MerchantInactive(merchant_id));
        }

        let decision = match candidate.r#type {
            TransactionType::Authorize => Decision::status(TransactionStatus::Approved),
            TransactionType::Charge | TransactionType::Refund | TransactionType::Reversal => {
                let parent_id = candidate
                    .parent_id
                    .ok_or(PaymentError::MissingIdentifier("parent_id"))?;
                let parent = self
                    .transaction_store
                    .get(parent_id)
                    .await?
                    .ok_or(PaymentError::ParentNotFound(parent_id))?;
                if parent.merchant_id != merchant_id {
                    return Err(PaymentError::ForeignParent {
                        parent: parent_id,
                        merchant: merchant_id,
                    });
                }

                if !parent.status.is_usable_parent() {
                    warn!(
                        %parent_id,
                        parent_status = %parent.status,
                        kind = %candidate.r#type,
                        "parent not usable, recording failed attempt"
                    );
                    Decision::status(TransactionStatus::Error)
                } else {
                    decide_child(&candidate, &parent)?
                }
            }
        };

        let tx = Transaction::from_candidate(candidate, merchant_id, decision.status);
        let tx = self
            .transaction_store
            .create_atomic(tx, decision.parent)
            .await?;
        if tx.status != decision.status {
            warn!(
                tx_id = %tx.id,
                parent_id = ?tx.parent_id,
                kind = %tx.r#type,
                "parent changed before commit, recording failed attempt"
            );
        }

        info!(
            tx_id = %tx.id,
            %merchant_id,
            kind = %tx.r#type,
            amount = tx.amount,
            status = %tx.status,
            "transaction recorded"
        );
        Ok(tx)
    }

    /// Lists transactions, optionally only those created before a cutoff.
    pub async fn transactions(&self, query: TransactionQuery) -> Result<Vec<Transaction>> {
        self.transaction_store.list(query).await
    }

    /// Deletes transactions created strictly before `older_than`. `None` is a no-op.
    pub async fn purge_transactions(&self, older_than: Option<DateTime<Utc>>) -> Result<usize> {
        let removed = self.transaction_store.purge(older_than).await?;
        if removed > 0 {
            info!(removed, "purged transactions");
        }
        Ok(removed)
    }

    pub async fn transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.transaction_store.get(id).await
    }
}

/// Type-specific rules for a child whose parent passed the usable-state gate.
fn decide_child(candidate: &NewTransaction, parent: &Transaction) -> Result<Decision> {
    let requested = candidate.amount;
    match candidate.r#type {
        TransactionType::Charge => {
            require_parent(parent, TransactionType::Authorize)?;
            if requested > parent.amount {
                return Err(PaymentError::AmountExceedsAuthorized {
                    requested,
                    authorized: parent.amount,
                });
            }
            debug!(parent_id = %parent.id, requested, "charge within authorization");
            Ok(Decision::guarded(TransactionStatus::Approved, parent, None))
        }
        TransactionType::Refund => {
            require_parent(parent, TransactionType::Charge)?;
            if requested != parent.amount {
                return Err(PaymentError::AmountMismatch {
                    requested,
                    charged: parent.amount,
                });
            }
            Ok(Decision::guarded(
                TransactionStatus::Refunded,
                parent,
                Some(TransactionStatus::Refunded),
            ))
        }
        TransactionType::Reversal => {
            require_parent(parent, TransactionType::Authorize)?;
            Ok(Decision::guarded(
                TransactionStatus::Reversed,
                parent,
                Some(TransactionStatus::Reversed),
            ))
        }
        TransactionType::Authorize => Err(PaymentError::invalid_field(
            "parent_id",
            "authorize cannot reference a parent transaction",
        )),
    }
}

fn require_parent(parent: &Transaction, expected: TransactionType) -> Result<()> {
    if parent.r#type != expected {
        return Err(PaymentError::InvalidParentType {
            expected,
            found: parent.r#type,
        });
    }
    if parent.status != TransactionStatus::Approved {
        return Err(PaymentError::InvalidParentStatus(parent.status));
    }
    Ok(())
}
