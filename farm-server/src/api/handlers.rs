//! API request handlers

use super::{responses::*, ApiState};
use crate::core::ActionReceipt;
use crate::database::{parse_date_bound, Page, TransactionFilter, TransactionPage, TransactionSummary};
use crate::pools::RefreshOutcome;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use farm_types::{
    parse_decimal, FarmError, FarmResult, StoredTransaction, TransactionRecord, TransactionStatus, TransactionType,
};
use serde::Deserialize;
use tracing::{debug, info};

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Transactions
// ============================================================================

/// Body of `POST /api/transactions`; every field optional so that missing
/// required fields produce a readable 400
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransactionRequest {
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub from_token: Option<String>,
    pub from_amount: Option<String>,
    pub to_token: Option<String>,
    pub to_amount: Option<String>,
    pub gas_fee: Option<String>,
    pub status: Option<String>,
    pub tx_hash: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

fn required(value: Option<String>, field: &str) -> FarmResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| FarmError::missing(field))
}

/// Missing and blank amounts are stored as "0"
fn amount_or_zero(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "0".to_string())
}

impl NewTransactionRequest {
    pub fn into_record(self) -> FarmResult<TransactionRecord> {
        let tx_type: TransactionType = required(self.tx_type, "type")?.parse()?;
        let from_token = required(self.from_token, "fromToken")?;
        let to_token = required(self.to_token, "toToken")?;
        let tx_hash = required(self.tx_hash, "txHash")?;

        let mut record = TransactionRecord::pending(tx_type, tx_hash, from_token, to_token);
        if let Some(date) = self.date {
            record.date = date;
        }
        if let Some(status) = self.status {
            record.status = status.parse()?;
        }
        record.from_amount = amount_or_zero(self.from_amount);
        record.to_amount = amount_or_zero(self.to_amount);
        record.gas_fee = amount_or_zero(self.gas_fee);
        record.description = self.description.unwrap_or_default();
        if let Some(metadata) = self.metadata {
            record.metadata = metadata;
        }

        record.validate()?;
        Ok(record)
    }
}

/// Store a transaction record; an already known `txHash` returns the stored one
pub async fn create_transaction(
    State(state): State<ApiState>,
    payload: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredTransaction>), ApiError> {
    let record = json_body(payload)?.into_record()?;
    let outcome = state.store.insert(record).await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let stored = outcome.into_inner();
    debug!("Transaction {} stored as {}", stored.record.tx_hash, stored.id);
    Ok((status, Json(stored)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub status: Option<String>,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ListTransactionsQuery {
    pub fn filter(&self) -> FarmResult<TransactionFilter> {
        Ok(TransactionFilter {
            tx_type: non_empty(&self.tx_type).map(str::parse).transpose()?,
            status: non_empty(&self.status).map(str::parse).transpose()?,
            from_date: non_empty(&self.from_date)
                .map(|v| parse_date_bound(v, false))
                .transpose()?,
            to_date: non_empty(&self.to_date).map(|v| parse_date_bound(v, true)).transpose()?,
        })
    }
}

/// Filtered, paginated listing, newest first
pub async fn list_transactions(
    State(state): State<ApiState>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<Json<TransactionPage>, ApiError> {
    let Query(query) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let filter = query.filter()?;
    let page = Page::new(query.page, query.limit);
    Ok(Json(state.store.list(&filter, page).await?))
}

/// Fee totals per bucket and counts per (type, status)
pub async fn transaction_summary(State(state): State<ApiState>) -> Result<Json<TransactionSummary>, ApiError> {
    Ok(Json(state.store.summary().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: TransactionStatus,
    pub gas_fee: Option<String>,
}

/// Move a stored record to a new status
pub async fn update_transaction(
    State(state): State<ApiState>,
    Path(tx_hash): Path<String>,
    payload: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<StoredTransaction>, ApiError> {
    let update = json_body(payload)?;
    if let Some(fee) = &update.gas_fee {
        parse_decimal("gasFee", fee)?;
    }

    match state.store.update_status(&tx_hash, update.status, update.gas_fee).await? {
        Some(stored) => Ok(Json(stored)),
        None => Err(ApiError::NotFound(format!("Transaction {} not found", tx_hash))),
    }
}

// ============================================================================
// Pools
// ============================================================================

/// Current pool snapshot
pub async fn list_pools(State(state): State<ApiState>) -> Json<PoolsResponse> {
    Json(PoolsResponse {
        pools: state.pools.pools().await,
    })
}

/// Rate-limited forced refresh
pub async fn refresh_pools(State(state): State<ApiState>) -> Json<RefreshResponse> {
    let outcome = state.pools.force_refresh().await;
    let limiter = state.pools.limiter();
    let (triggered, pools) = match outcome {
        RefreshOutcome::Triggered(pools) => (true, Some(pools)),
        RefreshOutcome::Suppressed => (false, None),
    };
    Json(RefreshResponse {
        triggered,
        refresh_count: limiter.count(),
        max_refreshes: limiter.max(),
        pools,
    })
}

pub async fn reset_refresh(State(state): State<ApiState>) -> Json<RefreshResponse> {
    let limiter = state.pools.limiter();
    limiter.reset();
    Json(RefreshResponse {
        triggered: false,
        refresh_count: limiter.count(),
        max_refreshes: limiter.max(),
        pools: None,
    })
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: String,
}

pub async fn stake(
    State(state): State<ApiState>,
    Path(pool_id): Path<u64>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let body = json_body(payload)?;
    let receipt = state.actions.stake(pool_id, &body.amount).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn unstake(
    State(state): State<ApiState>,
    Path(pool_id): Path<u64>,
    payload: Result<Json<AmountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let body = json_body(payload)?;
    let receipt = state.actions.unstake(pool_id, &body.amount).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn harvest(
    State(state): State<ApiState>,
    Path(pool_id): Path<u64>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let receipt = state.actions.harvest(pool_id).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn emergency_withdraw(
    State(state): State<ApiState>,
    Path(pool_id): Path<u64>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let receipt = state.actions.emergency_withdraw(pool_id).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPoolRequest {
    #[serde(with = "farm_types::dec_u128")]
    pub alloc_point: u128,
    pub lp_token: String,
    #[serde(default)]
    pub with_update: bool,
}

pub async fn add_pool(
    State(state): State<ApiState>,
    payload: Result<Json<AddPoolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let body = json_body(payload)?;
    let receipt = state
        .actions
        .add_pool(body.alloc_point, &body.lp_token, body.with_update)
        .await?;
    info!("Pool for {} added in {}", body.lp_token, receipt.tx_hash);
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePoolRequest {
    #[serde(with = "farm_types::dec_u128")]
    pub alloc_point: u128,
    pub is_active: bool,
    #[serde(default)]
    pub with_update: bool,
}

pub async fn update_pool(
    State(state): State<ApiState>,
    Path(pool_id): Path<u64>,
    payload: Result<Json<UpdatePoolRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionReceipt>), ApiError> {
    let body = json_body(payload)?;
    let receipt = state
        .actions
        .update_pool(pool_id, body.alloc_point, body.is_active, body.with_update)
        .await?;
    info!("Pool {} updated in {}", pool_id, receipt.tx_hash);
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

// ============================================================================
// Ledger
// ============================================================================

pub async fn ledger_pending(State(state): State<ApiState>) -> Result<Json<PendingLedgerResponse>, ApiError> {
    let entries = state.ledger.list_pending().await?;
    Ok(Json(PendingLedgerResponse {
        count: entries.len(),
        entries,
    }))
}

pub async fn ledger_failed(State(state): State<ApiState>) -> Result<Json<FailedLedgerResponse>, ApiError> {
    let entries = state.ledger.list_failed().await?;
    Ok(Json(FailedLedgerResponse {
        count: entries.len(),
        entries,
    }))
}

/// Replay parked transactions now
pub async fn ledger_sync(State(state): State<ApiState>) -> Result<Json<SyncResponse>, ApiError> {
    let synced = state.ledger.sync().await?;
    let remaining = state.ledger.list_pending().await?.len();
    Ok(Json(SyncResponse { synced, remaining }))
}
