use super::engine::TransactionEngine;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Background task that periodically deletes transactions older than a retention window.
///
/// The first run happens one full interval after start. Stopping prevents any further
/// runs; a purge already executing is allowed to finish.
pub struct PurgeScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PurgeScheduler {
    pub fn start(engine: TransactionEngine, interval: Duration, retention: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => {
                        debug!("purge scheduler shutdown signal received");
                        break;
                    }
                }

                // Runs outside the select so a shutdown never cuts a purge short.
                let cutoff = chrono::Duration::from_std(retention)
                    .ok()
                    .and_then(|retention| Utc::now().checked_sub_signed(retention));
                match engine.purge_transactions(cutoff).await {
                    Ok(removed) => debug!(removed, "purge run finished"),
                    Err(e) => error!(error = %e, "cleaning up transactions failed"),
                }
            }
        });

        info!(?interval, ?retention, "purge scheduler started");
        Self { shutdown, handle }
    }

    /// Signals the task to stop scheduling and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!(error = %e, "purge scheduler task failed");
        }
        info!("purge scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merchant::NewMerchant;
    use crate::domain::ports::{MerchantStore, TransactionStore};
    use crate::domain::transaction::{Transaction, TransactionQuery, TransactionStatus, TransactionType};
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    async fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let merchant = store
            .create_merchant(
                NewMerchant {
                    name: "Shop".to_string(),
                    description: String::new(),
                    email: "shop@example.com".to_string(),
                    status: None,
                }
                .into_merchant(),
            )
            .await
            .unwrap();
        let mut old = Transaction {
            id: Uuid::new_v4(),
            parent_id: None,
            merchant_id: merchant.id,
            r#type: TransactionType::Authorize,
            amount: 10,
            status: TransactionStatus::Approved,
            customer_email: "buyer@example.com".to_string(),
            customer_phone: None,
            created_at: Utc::now() - chrono::Duration::hours(3),
        };
        store.create_atomic(old.clone(), None).await.unwrap();
        old.id = Uuid::new_v4();
        old.created_at = Utc::now();
        store.create_atomic(old, None).await.unwrap();
        store
    }

    fn engine(store: &InMemoryStore) -> TransactionEngine {
        TransactionEngine::new(Arc::new(store.clone()), Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn test_scheduler_purges_expired_rows() {
        let store = seeded_store().await;
        let scheduler = PurgeScheduler::start(
            engine(&store),
            Duration::from_millis(20),
            Duration::from_secs(3600),
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.stop().await;

        let remaining = store.list(TransactionQuery::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[tokio::test]
    async fn test_stopped_scheduler_does_not_run() {
        let store = seeded_store().await;
        let scheduler = PurgeScheduler::start(
            engine(&store),
            Duration::from_millis(50),
            Duration::from_secs(3600),
        );
        scheduler.stop().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        let remaining = store.list(TransactionQuery::default()).await.unwrap();
        assert_eq!(remaining.len(), 2);
    }
}
