/// Transaction records persisted by the dashboard

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::TX_HASH_HEX_LEN;
use crate::errors::{is_prefixed_hex, FarmError};
use crate::FarmResult;

// ============================================================================
// Enumerations
// ============================================================================

/// Kind of user or admin action a transaction record describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    TokenApproval,
    LiquidityAdd,
    LiquidityRemove,
    PoolUpdate,
    Stake,
    Unstake,
    Harvest,
    Conversion,
}

impl TransactionType {
    pub const ALL: [TransactionType; 8] = [
        Self::TokenApproval,
        Self::LiquidityAdd,
        Self::LiquidityRemove,
        Self::PoolUpdate,
        Self::Stake,
        Self::Unstake,
        Self::Harvest,
        Self::Conversion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TokenApproval => "token_approval",
            Self::LiquidityAdd => "liquidity_add",
            Self::LiquidityRemove => "liquidity_remove",
            Self::PoolUpdate => "pool_update",
            Self::Stake => "stake",
            Self::Unstake => "unstake",
            Self::Harvest => "harvest",
            Self::Conversion => "conversion",
        }
    }

    /// Fee bucket used by the summary report, if any
    pub fn fee_bucket(&self) -> Option<FeeBucket> {
        match self {
            Self::Conversion => Some(FeeBucket::Conversion),
            Self::LiquidityAdd | Self::LiquidityRemove => Some(FeeBucket::Liquidity),
            Self::Stake | Self::Unstake | Self::Harvest => Some(FeeBucket::Staking),
            Self::TokenApproval | Self::PoolUpdate => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = FarmError;

    fn from_str(s: &str) -> FarmResult<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FarmError::unknown_variant("transaction type", s))
    }
}

/// Grouping used when totalling gas fees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeBucket {
    Conversion,
    Liquidity,
    Staking,
}

/// Lifecycle of a recorded transaction
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = FarmError;

    fn from_str(s: &str) -> FarmResult<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(FarmError::unknown_variant("transaction status", other)),
        }
    }
}

// ============================================================================
// Transaction Record
// ============================================================================

/// A user or admin transaction as recorded by the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub date: DateTime<Utc>,
    pub from_token: String,
    #[serde(default = "zero")]
    pub from_amount: String,
    pub to_token: String,
    #[serde(default = "zero")]
    pub to_amount: String,
    #[serde(default = "zero")]
    pub gas_fee: String,
    #[serde(default)]
    pub status: TransactionStatus,
    pub tx_hash: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

fn zero() -> String {
    "0".to_string()
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl TransactionRecord {
    /// New pending record dated now
    pub fn pending(
        tx_type: TransactionType,
        tx_hash: impl Into<String>,
        from_token: impl Into<String>,
        to_token: impl Into<String>,
    ) -> Self {
        Self {
            tx_type,
            date: Utc::now(),
            from_token: from_token.into(),
            from_amount: zero(),
            to_token: to_token.into(),
            to_amount: zero(),
            gas_fee: zero(),
            status: TransactionStatus::Pending,
            tx_hash: tx_hash.into(),
            description: String::new(),
            metadata: empty_metadata(),
        }
    }

    pub fn with_amounts(mut self, from_amount: impl Into<String>, to_amount: impl Into<String>) -> Self {
        self.from_amount = from_amount.into();
        self.to_amount = to_amount.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_metadata(mut self, key: &str, value: serde_json::Value) -> Self {
        if let serde_json::Value::Object(map) = &mut self.metadata {
            map.insert(key.to_string(), value);
        }
        self
    }

    /// Check required fields, hash encoding and decimal amounts
    pub fn validate(&self) -> FarmResult<()> {
        if self.from_token.trim().is_empty() {
            return Err(FarmError::missing("fromToken"));
        }
        if self.to_token.trim().is_empty() {
            return Err(FarmError::missing("toToken"));
        }
        if self.tx_hash.trim().is_empty() {
            return Err(FarmError::missing("txHash"));
        }
        if !is_prefixed_hex(&self.tx_hash, TX_HASH_HEX_LEN) {
            return Err(FarmError::invalid_hex("txHash", TX_HASH_HEX_LEN));
        }
        for (field, value) in [
            ("fromAmount", &self.from_amount),
            ("toAmount", &self.to_amount),
            ("gasFee", &self.gas_fee),
        ] {
            parse_decimal(field, value)?;
        }
        if !self.metadata.is_object() {
            return Err(FarmError::InvalidField {
                field: "metadata".to_string(),
                reason: "expected an object".to_string(),
            });
        }
        Ok(())
    }

    /// Gas fee as a decimal, zero when blank
    pub fn gas_fee_decimal(&self) -> FarmResult<Decimal> {
        parse_decimal("gasFee", &self.gas_fee)
    }
}

/// A transaction record as held by the persistence API
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredTransaction {
    pub id: Uuid,
    #[serde(flatten)]
    pub record: TransactionRecord,
    pub created_at: DateTime<Utc>,
}

impl StoredTransaction {
    pub fn new(record: TransactionRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            record,
            created_at: Utc::now(),
        }
    }
}

/// Parse a decimal amount, treating blank as zero
pub fn parse_decimal(field: &str, value: &str) -> FarmResult<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed).map_err(|_| FarmError::invalid_decimal(field, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(c: char) -> String {
        format!("0x{}", c.to_string().repeat(64))
    }

    #[test]
    fn test_type_round_trips_through_str() {
        for t in TransactionType::ALL {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert!("swap".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_fee_buckets() {
        assert_eq!(TransactionType::Conversion.fee_bucket(), Some(FeeBucket::Conversion));
        assert_eq!(TransactionType::LiquidityRemove.fee_bucket(), Some(FeeBucket::Liquidity));
        assert_eq!(TransactionType::Harvest.fee_bucket(), Some(FeeBucket::Staking));
        assert_eq!(TransactionType::PoolUpdate.fee_bucket(), None);
    }

    #[test]
    fn test_record_defaults_when_deserializing() {
        let json = format!(
            r#"{{"type":"stake","date":"2024-05-01T10:00:00Z","fromToken":"BNB","toToken":"CAKE-BNB-LP","txHash":"{}"}}"#,
            hash('a')
        );
        let record: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.tx_type, TransactionType::Stake);
        assert_eq!(record.status, TransactionStatus::Pending);
        assert_eq!(record.gas_fee, "0");
        assert!(record.metadata.is_object());
        record.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_fields() {
        let ok = TransactionRecord::pending(TransactionType::Harvest, hash('b'), "CAKE", "CAKE");
        assert!(ok.validate().is_ok());

        let mut missing = ok.clone();
        missing.to_token = " ".to_string();
        assert_eq!(missing.validate(), Err(FarmError::missing("toToken")));

        let mut short = ok.clone();
        short.tx_hash = "0xabc".to_string();
        assert_eq!(short.validate(), Err(FarmError::invalid_hex("txHash", 64)));

        let bad_fee = ok.clone().with_amounts("1.5", "abc");
        assert_eq!(bad_fee.validate(), Err(FarmError::invalid_decimal("toAmount", "abc")));
    }

    #[test]
    fn test_metadata_builder() {
        let record = TransactionRecord::pending(TransactionType::Stake, hash('c'), "LP", "POOL")
            .with_metadata("poolId", serde_json::json!(3));
        assert_eq!(record.metadata["poolId"], 3);
    }
}
