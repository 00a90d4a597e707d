//! Transaction record storage behind the persistence API

pub mod memory;
pub mod postgres;

pub use memory::MemoryTransactionStore;
pub use postgres::PostgresTransactionStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use farm_types::{
    FarmError, FarmResult, FeeBucket, StoredTransaction, TransactionRecord, TransactionStatus, TransactionType,
    DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::StorageResult;

/// Result of inserting a record
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(StoredTransaction),
    /// A record with the same `txHash` was already stored; it is returned unchanged
    Existing(StoredTransaction),
}

impl InsertOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn into_inner(self) -> StoredTransaction {
        match self {
            Self::Created(t) | Self::Existing(t) => t,
        }
    }
}

/// List filters, all optional and combined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub tx_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    /// Inclusive lower bound on `date`
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date`
    pub to_date: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.tx_type.map_or(true, |t| record.tx_type == t)
            && self.status.map_or(true, |s| record.status == s)
            && self.from_date.map_or(true, |from| record.date >= from)
            && self.to_date.map_or(true, |to| record.date <= to)
    }
}

/// Parse a date query bound given as RFC 3339 or `YYYY-MM-DD`
///
/// A bare date used as an upper bound covers the whole day.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> FarmResult<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FarmError::InvalidTimestamp {
        value: value.to_string(),
    })?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    if end_of_day {
        Ok(start + Duration::days(1) - Duration::nanoseconds(1))
    } else {
        Ok(start)
    }
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamp raw query values: page at least 1, limit between 1 and the maximum
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn pages_for(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<StoredTransaction>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
}

/// Gas fees summed per bucket
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FeeTotals {
    pub conversion: Decimal,
    pub liquidity: Decimal,
    pub staking: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCount {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransactionSummary {
    pub fees: FeeTotals,
    pub counts: Vec<StatusCount>,
}

impl TransactionSummary {
    /// Build from per-(type, status) groups of `(count, fee sum)`
    pub fn from_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = ((TransactionType, TransactionStatus), (u64, Decimal))>,
    {
        let mut merged: BTreeMap<(TransactionType, TransactionStatus), (u64, Decimal)> = BTreeMap::new();
        for (key, (count, fees)) in groups {
            let slot = merged.entry(key).or_default();
            slot.0 += count;
            slot.1 += fees;
        }

        let mut summary = Self::default();
        for ((tx_type, status), (count, fees)) in merged {
            match tx_type.fee_bucket() {
                Some(FeeBucket::Conversion) => summary.fees.conversion += fees,
                Some(FeeBucket::Liquidity) => summary.fees.liquidity += fees,
                Some(FeeBucket::Staking) => summary.fees.staking += fees,
                None => {}
            }
            summary.fees.total += fees;
            summary.counts.push(StatusCount { tx_type, status, count });
        }

        let fees = &mut summary.fees;
        for value in [&mut fees.conversion, &mut fees.liquidity, &mut fees.staking, &mut fees.total] {
            *value = value.normalize();
        }
        summary
    }
}

/// Durable storage of transaction records
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Insert a validated record, deduplicated by `txHash`
    async fn insert(&self, record: TransactionRecord) -> StorageResult<InsertOutcome>;

    /// Filtered records, newest `date` first
    async fn list(&self, filter: &TransactionFilter, page: Page) -> StorageResult<TransactionPage>;

    async fn summary(&self) -> StorageResult<TransactionSummary>;

    /// `None` when no record has this hash
    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> StorageResult<Option<StoredTransaction>>;

    async fn health_check(&self) -> StorageResult<()>;
}
