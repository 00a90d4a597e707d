//! REST API for pools, staking actions, the transaction store and the ledger

mod handlers;
mod responses;
mod routes;

pub use handlers::{AddPoolRequest, AmountRequest, NewTransactionRequest, StatusUpdateRequest, UpdatePoolRequest};
pub use responses::*;
pub use routes::*;

use crate::actions::StakingActions;
use crate::config::ApiConfig;
use crate::database::TransactionStore;
use crate::ledger::PendingLedger;
use crate::metrics::metrics;
use crate::pools::PoolService;
use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Shared API state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn TransactionStore>,
    pub pools: Arc<PoolService>,
    pub ledger: Arc<PendingLedger>,
    pub actions: Arc<StakingActions>,
}

impl ApiState {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        pools: Arc<PoolService>,
        ledger: Arc<PendingLedger>,
        actions: Arc<StakingActions>,
    ) -> Self {
        Self {
            store,
            pools,
            ledger,
            actions,
        }
    }
}

/// Start the API server
pub async fn start_server(state: ApiState, config: &ApiConfig) -> Result<tokio::task::JoinHandle<()>> {
    let app = create_router(state, config);

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("API server listening on {}", config.bind_address);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(handle)
}

/// Start the metrics server
pub async fn start_metrics_server(port: u16) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Metrics server listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    Ok(handle)
}

/// Create the main API application
pub fn create_router(state: ApiState, config: &ApiConfig) -> Router {
    let mut app = Router::new()
        .merge(create_transaction_routes())
        .merge(create_pool_routes())
        .merge(create_admin_routes())
        .merge(create_ledger_routes())
        .route("/health", get(health_handler))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(RequestBodyLimitLayer::new(config.max_request_size_mb * 1024 * 1024)),
    )
}

/// Health check handler
async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let storage = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Transaction store unhealthy: {}", e);
            false
        }
    };
    let status = if storage { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(HealthResponse {
            status: if storage { "healthy" } else { "degraded" }.to_string(),
            service: "farm-server".to_string(),
            storage,
            timestamp: chrono::Utc::now().timestamp(),
        }),
    )
}

/// Prometheus text exposition
async fn metrics_handler() -> String {
    metrics().render()
}
