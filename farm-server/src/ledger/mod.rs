//! Local pending-transaction ledger
//!
//! Transaction records whose remote write failed are parked in a durable
//! local list and replayed later, so a record is never lost only because
//! the persistence API was unreachable.

pub mod store;

pub use store::{LedgerStore, RocksLedgerStore};

use chrono::{DateTime, Utc};
use farm_types::{
    StoredTransaction, TransactionRecord, TransactionStatus, FAILED_LEDGER_KEY, PENDING_LEDGER_KEY,
};
use prometheus::IntGauge;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::{LedgerError, StorageResult, TransactionSink};
use crate::metrics::metrics;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    Pending,
}

/// A transaction record waiting to be replayed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(flatten)]
    pub transaction: TransactionRecord,
    /// When the entry was parked
    pub timestamp: DateTime<Utc>,
    pub sync_status: SyncStatus,
    #[serde(default)]
    pub retry_count: u32,
}

impl LedgerEntry {
    pub fn pending(transaction: TransactionRecord) -> Self {
        Self {
            transaction,
            timestamp: Utc::now(),
            sync_status: SyncStatus::Pending,
            retry_count: 0,
        }
    }
}

/// Ledger entry with its positional identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingView {
    pub id: String,
    #[serde(flatten)]
    pub entry: LedgerEntry,
}

/// Records transactions remotely, parking failures locally for replay
pub struct PendingLedger {
    sink: Arc<dyn TransactionSink>,
    store: Arc<dyn LedgerStore>,
    pending_gauge: IntGauge,
    // serializes every read-modify-write of the stored lists
    lock: Mutex<()>,
}

impl PendingLedger {
    pub fn new(sink: Arc<dyn TransactionSink>, store: Arc<dyn LedgerStore>) -> Self {
        Self::with_pending_gauge(sink, store, metrics().ledger_pending.clone())
    }

    /// Ledger reporting its parked count to `pending_gauge`
    ///
    /// The gauge starts at the number of entries already in the store.
    pub fn with_pending_gauge(
        sink: Arc<dyn TransactionSink>,
        store: Arc<dyn LedgerStore>,
        pending_gauge: IntGauge,
    ) -> Self {
        match store.load(PENDING_LEDGER_KEY) {
            Ok(entries) => {
                if !entries.is_empty() {
                    info!("Found {} parked transactions from a previous run", entries.len());
                }
                pending_gauge.set(entries.len() as i64);
            }
            Err(e) => warn!("Failed to count parked transactions: {}", e),
        }
        Self {
            sink,
            store,
            pending_gauge,
            lock: Mutex::new(()),
        }
    }

    /// Persist a record remotely, parking it locally on failure
    ///
    /// The remote failure is always returned to the caller, even when the
    /// record was parked successfully.
    pub async fn record(&self, transaction: TransactionRecord) -> Result<StoredTransaction, LedgerError> {
        let remote_err = match self.sink.persist(&transaction).await {
            Ok(stored) => return Ok(stored),
            Err(e) => e,
        };

        warn!(
            "Failed to persist transaction {}, parking it locally: {}",
            transaction.tx_hash, remote_err
        );

        let entry = LedgerEntry::pending(transaction);
        let _guard = self.lock.lock().await;
        match self.store.append(PENDING_LEDGER_KEY, entry.clone()) {
            Ok(()) => {
                metrics().ledger_parked.inc();
                self.pending_gauge.inc();
            }
            Err(local_err) => {
                error!("Failed to park transaction {}: {}", entry.transaction.tx_hash, local_err);
                if let Err(e) = self.store.append(FAILED_LEDGER_KEY, entry) {
                    error!("Failed to record transaction in failed list: {}", e);
                }
            }
        }

        Err(LedgerError::Remote(remote_err))
    }

    /// Parked entries in insertion order with ids `local-<position>`
    pub async fn list_pending(&self) -> StorageResult<Vec<PendingView>> {
        let _guard = self.lock.lock().await;
        Ok(self
            .store
            .load(PENDING_LEDGER_KEY)?
            .into_iter()
            .enumerate()
            .map(|(i, entry)| PendingView {
                id: format!("local-{}", i),
                entry,
            })
            .collect())
    }

    /// Entries that could not even be parked
    pub async fn list_failed(&self) -> StorageResult<Vec<LedgerEntry>> {
        let _guard = self.lock.lock().await;
        self.store.load(FAILED_LEDGER_KEY)
    }

    /// Replay parked entries newest first; returns how many were stored
    ///
    /// Entries that fail again stay with an incremented retry count. There
    /// is no retry ceiling.
    pub async fn sync(&self) -> StorageResult<usize> {
        let _guard = self.lock.lock().await;
        let mut entries = self.store.load(PENDING_LEDGER_KEY)?;
        if entries.is_empty() {
            return Ok(0);
        }

        let mut synced = 0;
        for idx in (0..entries.len()).rev() {
            match self.sink.persist(&entries[idx].transaction).await {
                Ok(stored) => {
                    debug!("Replayed transaction {} as {}", stored.record.tx_hash, stored.id);
                    entries.remove(idx);
                    synced += 1;
                }
                Err(e) => {
                    entries[idx].retry_count += 1;
                    debug!(
                        "Replay of {} failed (retry {}): {}",
                        entries[idx].transaction.tx_hash, entries[idx].retry_count, e
                    );
                }
            }
        }

        self.store.save(PENDING_LEDGER_KEY, &entries)?;
        metrics().ledger_synced.inc_by(synced as u64);
        self.pending_gauge.set(entries.len() as i64);

        if synced > 0 {
            info!("Synced {} parked transactions, {} remaining", synced, entries.len());
        }
        Ok(synced)
    }

    /// Update the status of a parked entry, used when confirmation arrives
    /// before the record reached the API
    pub async fn update_local_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> StorageResult<bool> {
        let _guard = self.lock.lock().await;
        let mut entries = self.store.load(PENDING_LEDGER_KEY)?;
        let mut found = false;
        for entry in entries.iter_mut().filter(|e| e.transaction.tx_hash == tx_hash) {
            entry.transaction.status = status;
            if let Some(fee) = &gas_fee {
                entry.transaction.gas_fee = fee.clone();
            }
            found = true;
        }
        if found {
            self.store.save(PENDING_LEDGER_KEY, &entries)?;
        }
        self.pending_gauge.set(entries.len() as i64);
        Ok(found)
    }

    /// Remote status update with fallback to the parked entry
    pub async fn update_status(&self, tx_hash: &str, status: TransactionStatus, gas_fee: Option<String>) {
        match self.sink.update_status(tx_hash, status, gas_fee.clone()).await {
            Ok(_) => debug!("Transaction {} marked {}", tx_hash, status),
            Err(e) => match self.update_local_status(tx_hash, status, gas_fee).await {
                Ok(true) => debug!("Transaction {} marked {} in local ledger", tx_hash, status),
                Ok(false) => warn!("Could not mark {} as {}: {}", tx_hash, status, e),
                Err(local) => error!("Could not mark {} as {}: {}; {}", tx_hash, status, e, local),
            },
        }
    }
}

/// Run `sync()` every `interval` until the task is aborted
pub fn spawn_sync_loop(ledger: Arc<PendingLedger>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = ledger.sync().await {
                error!("Ledger sync failed: {}", e);
            }
        }
    })
}
