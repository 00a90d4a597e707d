//! Core value types passed across ports

use farm_types::{FarmError, FarmResult, TransactionStatus, TransactionType};
use serde::{Deserialize, Serialize};

/// Receipt of a mined transaction as reported by the contract gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub tx_hash: String,
    /// `true` when execution succeeded
    pub status: bool,
    #[serde(with = "farm_types::dec_u128")]
    pub block_number: u128,
    #[serde(with = "farm_types::dec_u128")]
    pub gas_used: u128,
    #[serde(with = "farm_types::dec_u128")]
    pub effective_gas_price: u128,
}

impl TxReceipt {
    /// Gas fee paid, in native token units
    pub fn gas_fee(&self, decimals: u32) -> String {
        format_units(self.gas_used.saturating_mul(self.effective_gas_price), decimals)
    }

    pub fn final_status(&self) -> TransactionStatus {
        if self.status {
            TransactionStatus::Completed
        } else {
            TransactionStatus::Failed
        }
    }
}

/// Outcome of a write action as returned to callers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub tx_hash: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    /// Whether the transaction record reached the persistence API
    pub recorded: bool,
}

/// Render a raw integer amount with `decimals` fractional digits
pub fn format_units(raw: u128, decimals: u32) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    let scale = 10u128.pow(decimals);
    let whole = raw / scale;
    let frac = raw % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Parse a token amount such as `"1.5"` into its raw integer form
pub fn parse_units(field: &str, value: &str, decimals: u32) -> FarmResult<u128> {
    let invalid = || FarmError::invalid_decimal(field, value);
    let trimmed = value.trim();
    let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let frac = frac.trim_end_matches('0');
    if frac.len() > decimals as usize {
        return Err(FarmError::InvalidField {
            field: field.to_string(),
            reason: format!("more than {} decimal places", decimals),
        });
    }

    let scale = 10u128.checked_pow(decimals).ok_or_else(invalid)?;
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let frac_raw: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_raw))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(0, 18), "0");
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format_units(1, 18), "0.000000000000000001");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("amount", "1.5", 18).unwrap(), 1_500_000_000_000_000_000);
        assert_eq!(parse_units("amount", "2", 0).unwrap(), 2);
        assert_eq!(parse_units("amount", ".25", 2).unwrap(), 25);
        assert_eq!(parse_units("amount", "1.10", 1).unwrap(), 11);
        assert!(parse_units("amount", "1.234", 2).is_err());
        assert!(parse_units("amount", "-1", 18).is_err());
        assert!(parse_units("amount", "abc", 18).is_err());
        assert!(parse_units("amount", ".", 18).is_err());
    }

    #[test]
    fn test_receipt_gas_fee() {
        let receipt = TxReceipt {
            tx_hash: "0x01".to_string(),
            status: true,
            block_number: 10,
            gas_used: 21_000,
            effective_gas_price: 5_000_000_000,
        };
        assert_eq!(receipt.gas_fee(18), "0.000105");
        assert_eq!(receipt.final_status(), TransactionStatus::Completed);
    }
}
