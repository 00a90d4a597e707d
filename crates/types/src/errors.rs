use thiserror::Error;

/// Validation and conversion errors for shared dashboard types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FarmError {
    /// Required field absent or empty
    #[error("Missing required field '{field}'")]
    MissingField { field: String },

    /// Field present but not a decimal number
    #[error("Field '{field}' is not a decimal: '{value}'")]
    InvalidDecimal { field: String, value: String },

    /// Field is not 0x-prefixed hex of the expected length
    #[error("Field '{field}' must be 0x followed by {expected_len} hex characters")]
    InvalidHex { field: String, expected_len: usize },

    /// Enum value not recognised
    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: String, value: String },

    /// Field present but malformed
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Timestamp could not be parsed
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },
}

impl FarmError {
    pub fn missing(field: &str) -> Self {
        Self::MissingField { field: field.to_string() }
    }

    pub fn invalid_decimal(field: &str, value: &str) -> Self {
        Self::InvalidDecimal {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invalid_hex(field: &str, expected_len: usize) -> Self {
        Self::InvalidHex {
            field: field.to_string(),
            expected_len,
        }
    }

    pub fn unknown_variant(kind: &str, value: &str) -> Self {
        Self::UnknownVariant {
            kind: kind.to_string(),
            value: value.to_string(),
        }
    }
}

/// Check that `value` is `0x` followed by exactly `hex_len` hex characters
pub fn is_prefixed_hex(value: &str, hex_len: usize) -> bool {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(digits) => digits.len() == hex_len && digits.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
