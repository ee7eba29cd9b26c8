use super::csv::account_reader::AccountReader;
use super::csv::transaction_reader::{TransactionReader, TransactionRecord};
use super::report::{Labeled, Rejection, Report};
use crate::application::directory::MerchantDirectory;
use crate::application::engine::TransactionEngine;
use crate::domain::transaction::{NewTransaction, TransactionType};
use crate::error::{PaymentError, Result};
use std::collections::HashMap;
use std::io::Read;
use tracing::warn;
use uuid::Uuid;

/// Drives CSV batches through the directory and the engine.
///
/// Rows are handled one at a time. A row that fails to decode or is rejected is logged,
/// recorded in the report and skipped; the batch carries on with the next row.
pub struct BatchRunner {
    directory: MerchantDirectory,
    engine: TransactionEngine,
    merchants: Vec<(String, Uuid)>,
    transactions: Vec<(String, Uuid)>,
    labels: HashMap<String, Uuid>,
    rejected: Vec<Rejection>,
}

impl BatchRunner {
    pub fn new(directory: MerchantDirectory, engine: TransactionEngine) -> Self {
        Self {
            directory,
            engine,
            merchants: Vec::new(),
            transactions: Vec::new(),
            labels: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    pub async fn load_admins<R: Read>(&mut self, source: R) -> Result<()> {
        for admin in AccountReader::new(source).admins() {
            let outcome = match admin {
                Ok(admin) => {
                    let email = admin.email.clone();
                    self.directory
                        .create_admins(vec![admin])
                        .await
                        .map_err(|e| (Some(email), e))
                }
                Err(e) => Err((None, e)),
            };
            if let Err((reference, e)) = outcome {
                self.reject(reference, "admin", e);
            }
        }
        Ok(())
    }

    pub async fn load_merchants<R: Read>(&mut self, source: R) -> Result<()> {
        for record in AccountReader::new(source).merchants() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    self.reject(None, "merchant", e);
                    continue;
                }
            };
            let reference = record.reference.clone();
            let created = match record.into_candidate() {
                Ok(candidate) => self.directory.create_merchants(vec![candidate]).await,
                Err(e) => Err(e),
            };
            match created {
                Ok(mut merchants) => {
                    if let Some(merchant) = merchants.pop() {
                        self.labels.insert(reference.clone(), merchant.id);
                        self.merchants.push((reference, merchant.id));
                    }
                }
                Err(e) => self.reject(Some(reference), "merchant", e),
            }
        }
        Ok(())
    }

    pub async fn run_transactions<R: Read>(&mut self, source: R) -> Result<()> {
        for record in TransactionReader::new(source).transactions() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    self.reject(None, "transaction", e);
                    continue;
                }
            };
            let reference = record.reference.clone();
            let started = match self.candidate(record) {
                Ok(candidate) => self.engine.start_transaction(candidate).await,
                Err(e) => Err(e),
            };
            match started {
                Ok(tx) => {
                    self.labels.insert(reference.clone(), tx.id);
                    self.transactions.push((reference, tx.id));
                }
                Err(e) => self.reject(Some(reference), "transaction", e),
            }
        }
        Ok(())
    }

    /// Collects the current state of every merchant and transaction created by the batch.
    ///
    /// Transactions are re-read so parents show the status their children gave them.
    pub async fn into_report(self) -> Result<Report> {
        let mut report = Report {
            rejected: self.rejected,
            ..Default::default()
        };
        for (reference, id) in self.merchants {
            if let Some(entity) = self.directory.merchant(id).await? {
                report.merchants.push(Labeled { reference, entity });
            }
        }
        for (reference, id) in self.transactions {
            if let Some(entity) = self.engine.transaction(id).await? {
                report.transactions.push(Labeled { reference, entity });
            }
        }
        Ok(report)
    }

    fn candidate(&self, record: TransactionRecord) -> Result<NewTransaction> {
        let r#type: TransactionType = record.r#type.parse()?;
        let parent_id = record
            .parent
            .as_deref()
            .map(|label| self.resolve("parent", label))
            .transpose()?;
        let merchant_id = Some(self.resolve("merchant", &record.merchant)?);

        Ok(NewTransaction {
            parent_id,
            merchant_id,
            r#type,
            amount: record.amount,
            status: None,
            customer_email: record.customer_email,
            customer_phone: record.customer_phone,
        })
    }

    /// Maps a batch label, or a literal UUID from an earlier run, to an identifier.
    fn resolve(&self, field: &'static str, label: &str) -> Result<Uuid> {
        if let Some(id) = self.labels.get(label) {
            return Ok(*id);
        }
        Uuid::parse_str(label)
            .map_err(|_| PaymentError::invalid_field(field, format!("unknown reference `{label}`")))
    }

    fn reject(&mut self, reference: Option<String>, kind: &'static str, error: PaymentError) {
        warn!(
            reference = reference.as_deref().unwrap_or("-"),
            kind,
            %error,
            "row rejected"
        );
        self.rejected.push(Rejection {
            reference,
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionStatus;
    use crate::infrastructure::in_memory::InMemoryStore;
    use std::sync::Arc;

    fn runner() -> BatchRunner {
        let store = InMemoryStore::new();
        BatchRunner::new(
            MerchantDirectory::new(Arc::new(store.clone()), Arc::new(store.clone())),
            TransactionEngine::new(Arc::new(store.clone()), Arc::new(store)),
        )
    }

    const MERCHANTS: &str = "ref, name, description, email, status\n\
                             m1, Shop, , shop@example.com,";
    const HEADER: &str = "ref, parent, merchant, type, amount, customer_email, customer_phone";

    #[tokio::test]
    async fn test_labels_chain_rows() {
        let mut runner = runner();
        runner.load_merchants(MERCHANTS.as_bytes()).await.unwrap();

        let transactions = format!(
            "{HEADER}\n\
             a1, , m1, authorize, 100, buyer@example.com,\n\
             c1, a1, m1, charge, 100, buyer@example.com,\n\
             f1, c1, m1, refund, 100, buyer@example.com,"
        );
        runner
            .run_transactions(transactions.as_bytes())
            .await
            .unwrap();
        let report = runner.into_report().await.unwrap();

        assert!(report.rejected.is_empty());
        let statuses: Vec<_> = report
            .transactions
            .iter()
            .map(|t| (t.reference.as_str(), t.entity.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("a1", TransactionStatus::Approved),
                ("c1", TransactionStatus::Refunded),
                ("f1", TransactionStatus::Refunded),
            ]
        );
        assert_eq!(report.merchants[0].entity.approved_charge_total, 0);
    }

    #[tokio::test]
    async fn test_bad_rows_are_skipped() {
        let mut runner = runner();
        runner.load_merchants(MERCHANTS.as_bytes()).await.unwrap();

        let transactions = format!(
            "{HEADER}\n\
             x1, , m1, capture, 100, buyer@example.com,\n\
             x2, , m9, authorize, 100, buyer@example.com,\n\
             x3, , m1, authorize, many, buyer@example.com,\n\
             a1, , m1, authorize, 100, buyer@example.com,"
        );
        runner
            .run_transactions(transactions.as_bytes())
            .await
            .unwrap();
        let report = runner.into_report().await.unwrap();

        assert_eq!(report.transactions.len(), 1);
        assert_eq!(report.rejected.len(), 3);
        assert_eq!(report.rejected[0].reference.as_deref(), Some("x1"));
        assert!(report.rejected[0].error.contains("invalid transaction type"));
        assert!(report.rejected[1].error.contains("unknown reference"));
        assert_eq!(report.rejected[2].reference, None);
    }
}
