//! API route definitions

use super::{handlers::*, ApiState};
use axum::{
    routing::{get, patch, post, put},
    Router,
};

/// Transaction persistence routes
pub fn create_transaction_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/transactions", post(create_transaction).get(list_transactions))
        .route("/api/transactions/summary", get(transaction_summary))
        .route("/api/transactions/:tx_hash", patch(update_transaction))
}

/// Pool snapshot and staking routes
pub fn create_pool_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/pools", get(list_pools))
        .route("/api/pools/refresh", post(refresh_pools))
        .route("/api/pools/refresh/reset", post(reset_refresh))
        .route("/api/pools/:id/stake", post(stake))
        .route("/api/pools/:id/unstake", post(unstake))
        .route("/api/pools/:id/harvest", post(harvest))
        .route("/api/pools/:id/emergency-withdraw", post(emergency_withdraw))
}

/// Admin pool management routes
pub fn create_admin_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/admin/pools", post(add_pool))
        .route("/api/admin/pools/:id", put(update_pool))
}

/// Local ledger routes
pub fn create_ledger_routes() -> Router<ApiState> {
    Router::new()
        .route("/api/ledger/pending", get(ledger_pending))
        .route("/api/ledger/failed", get(ledger_failed))
        .route("/api/ledger/sync", post(ledger_sync))
}
