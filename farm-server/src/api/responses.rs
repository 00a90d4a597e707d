//! API response types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use farm_types::{FarmError, PoolRecord};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::{ChainErrorKind, ServiceError, StorageError};
use crate::ledger::{LedgerEntry, PendingView};

/// Response for the pool list
#[derive(Debug, Serialize, Deserialize)]
pub struct PoolsResponse {
    pub pools: Vec<PoolRecord>,
}

/// Response for a forced refresh request
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub triggered: bool,
    pub refresh_count: u32,
    pub max_refreshes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pools: Option<Vec<PoolRecord>>,
}

/// Response for locally parked transactions
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingLedgerResponse {
    pub entries: Vec<PendingView>,
    pub count: usize,
}

/// Response for entries that could not be parked
#[derive(Debug, Serialize, Deserialize)]
pub struct FailedLedgerResponse {
    pub entries: Vec<LedgerEntry>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SyncResponse {
    pub synced: usize,
    pub remaining: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub storage: bool,
    pub timestamp: i64,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    /// Chain failure classification, when the error came from a contract call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChainErrorKind>,
    pub timestamp: i64,
}

/// Errors returned by handlers
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Chain { kind: ChainErrorKind, message: String },
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Chain { kind, .. } => match kind {
                ChainErrorKind::UserRejected | ChainErrorKind::InsufficientFunds | ChainErrorKind::ContractReverted => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ChainErrorKind::Network | ChainErrorKind::InvalidResponse => StatusCode::BAD_GATEWAY,
                ChainErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FarmError> for ApiError {
    fn from(err: FarmError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        error!("Storage failure: {}", err);
        Self::Internal(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(e) => e.into(),
            ServiceError::Chain(e) => Self::Chain {
                kind: e.kind,
                message: e.message,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, kind) = match self {
            Self::BadRequest(msg) | Self::NotFound(msg) | Self::Internal(msg) => (msg, None),
            Self::Chain { kind, message } => (format!("{}: {}", kind.user_message(), message), Some(kind)),
        };
        let body = ErrorResponse {
            error,
            code: status.as_u16(),
            kind,
            timestamp: chrono::Utc::now().timestamp(),
        };
        (status, Json(body)).into_response()
    }
}
