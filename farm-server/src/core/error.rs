//! Centralized error types for the farm server

use farm_types::FarmError;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Validation error: {0}")]
    Validation(#[from] FarmError),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("RocksDB error: {0}")]
    RocksDB(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Column family '{0}' not found")]
    MissingColumnFamily(String),
}

/// Failure to persist a transaction record through the remote API
#[derive(Error, Debug, Clone)]
pub enum SinkError {
    #[error("Transaction API unreachable: {0}")]
    Unreachable(String),

    #[error("Transaction API rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid response from transaction API: {0}")]
    InvalidResponse(String),
}

/// Classification of a failed contract call, decided where the call is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainErrorKind {
    UserRejected,
    InsufficientFunds,
    ContractReverted,
    Network,
    InvalidResponse,
    Other,
}

impl ChainErrorKind {
    /// Notification text shown to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UserRejected => "Transaction was rejected in the wallet",
            Self::InsufficientFunds => "Insufficient funds to cover amount and gas",
            Self::ContractReverted => "Transaction reverted by the staking contract",
            Self::Network => "Network error while contacting the chain, please retry",
            Self::InvalidResponse => "Unexpected response from the chain gateway",
            Self::Other => "Transaction failed",
        }
    }

    /// Classify a JSON-RPC error from its code and message
    pub fn classify(code: i64, message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if code == 4001 || lower.contains("user rejected") || lower.contains("user denied") {
            Self::UserRejected
        } else if lower.contains("insufficient funds") {
            Self::InsufficientFunds
        } else if code == 3 || lower.contains("revert") {
            Self::ContractReverted
        } else if lower.contains("timeout") || lower.contains("connection") {
            Self::Network
        } else {
            Self::Other
        }
    }
}

/// Contract call error carrying its classification
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct ChainError {
    pub kind: ChainErrorKind,
    pub message: String,
}

impl ChainError {
    pub fn new(kind: ChainErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::InvalidResponse, message)
    }

    /// Build from a JSON-RPC error object
    pub fn from_rpc(code: i64, message: &str) -> Self {
        Self::new(ChainErrorKind::classify(code, message), message)
    }
}

/// Ledger errors: either the remote write failed (entry parked locally) or
/// the local store itself failed
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Remote persistence failed: {0}")]
    Remote(#[from] SinkError),

    #[error("Local ledger failure: {0}")]
    Local(#[from] StorageError),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for contract calls
pub type ChainResult<T> = Result<T, ChainError>;

/// Helper to convert sqlx errors
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Helper to convert rocksdb errors
impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::RocksDB(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for SinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SinkError::InvalidResponse(err.to_string())
        } else if let Some(status) = err.status() {
            SinkError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            SinkError::Unreachable(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChainError::invalid_response(err.to_string())
        } else {
            ChainError::network(err.to_string())
        }
    }
}
