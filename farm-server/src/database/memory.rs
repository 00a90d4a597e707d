//! In-process transaction store for development and tests

use async_trait::async_trait;
use farm_types::{StoredTransaction, TransactionRecord, TransactionStatus};
use tokio::sync::RwLock;

use super::{InsertOutcome, Page, TransactionFilter, TransactionPage, TransactionStore, TransactionSummary};
use crate::core::StorageResult;

#[derive(Default)]
pub struct MemoryTransactionStore {
    records: RwLock<Vec<StoredTransaction>>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn insert(&self, record: TransactionRecord) -> StorageResult<InsertOutcome> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter().find(|t| t.record.tx_hash == record.tx_hash) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        let stored = StoredTransaction::new(record);
        records.push(stored.clone());
        Ok(InsertOutcome::Created(stored))
    }

    async fn list(&self, filter: &TransactionFilter, page: Page) -> StorageResult<TransactionPage> {
        let records = self.records.read().await;
        let mut matching: Vec<&StoredTransaction> = records.iter().filter(|t| filter.matches(&t.record)).collect();
        matching.sort_by(|a, b| b.record.date.cmp(&a.record.date));

        let total = matching.len() as u64;
        let transactions = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(TransactionPage {
            transactions,
            total,
            page: page.page,
            pages: page.pages_for(total),
        })
    }

    async fn summary(&self) -> StorageResult<TransactionSummary> {
        let records = self.records.read().await;
        Ok(TransactionSummary::from_groups(records.iter().map(|t| {
            // unparseable fees were rejected at insert; count them as zero here
            let fee = t.record.gas_fee_decimal().unwrap_or_default();
            ((t.record.tx_type, t.record.status), (1, fee))
        })))
    }

    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> StorageResult<Option<StoredTransaction>> {
        let mut records = self.records.write().await;
        let Some(stored) = records.iter_mut().find(|t| t.record.tx_hash == tx_hash) else {
            return Ok(None);
        };
        stored.record.status = status;
        if let Some(fee) = gas_fee {
            stored.record.gas_fee = fee;
        }
        Ok(Some(stored.clone()))
    }

    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
