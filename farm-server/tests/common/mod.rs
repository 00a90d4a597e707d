//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use farm_server::api::{create_router, ApiState};
use farm_server::chain::MockStakingContract;
use farm_server::config::{RocksDBConfig, ServerConfig};
use farm_server::core::{SinkError, TransactionSink};
use farm_server::database::{MemoryTransactionStore, TransactionStore};
use farm_server::ledger::RocksLedgerStore;
use farm_server::server::assemble;
use farm_server::sink::StoreSink;
use farm_types::{StoredTransaction, TransactionRecord, TransactionStatus};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`

/// Sink over the in-memory store that can be switched off
pub struct FlakySink {
    inner: StoreSink,
    down: AtomicBool,
    persist_calls: AtomicUsize,
}

impl FlakySink {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self {
            inner: StoreSink::new(store),
            down: AtomicBool::new(false),
            persist_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSink for FlakySink {
    async fn persist(&self, record: &TransactionRecord) -> Result<StoredTransaction, SinkError> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(SinkError::Unreachable("connection refused".to_string()));
        }
        self.inner.persist(record).await
    }

    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> Result<StoredTransaction, SinkError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SinkError::Unreachable("connection refused".to_string()));
        }
        self.inner.update_status(tx_hash, status, gas_fee).await
    }
}

pub fn rocksdb_config(dir: &TempDir) -> RocksDBConfig {
    RocksDBConfig {
        path: dir.path().to_path_buf(),
        enable_compression: false,
        max_open_files: 64,
        write_buffer_size_mb: 4,
    }
}

/// Configuration with fast confirmation polling
pub fn test_config(dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.storage.rocksdb = rocksdb_config(dir);
    config.confirmation.max_attempts = 3;
    config.confirmation.base_delay_ms = 10;
    config.confirmation.max_delay_ms = 50;
    config.ledger.sync_interval_secs = 0;
    config.monitoring.metrics_port = 0;
    config
}

/// Fully wired server over the mock contract and in-memory store
pub struct TestApp {
    pub router: Router,
    pub state: ApiState,
    pub mock: Arc<MockStakingContract>,
    pub store: Arc<MemoryTransactionStore>,
    pub sink: Arc<FlakySink>,
    pub config: ServerConfig,
    _dir: TempDir,
}

impl TestApp {
    pub fn new(pool_count: u64) -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let config = test_config(&dir);
        Self::with_config(pool_count, config, dir)
    }

    pub fn with_config(pool_count: u64, config: ServerConfig, dir: TempDir) -> anyhow::Result<Self> {
        let mock = Arc::new(MockStakingContract::with_pools(pool_count));
        let store = Arc::new(MemoryTransactionStore::new());
        let sink = Arc::new(FlakySink::new(store.clone()));
        let ledger_store = Arc::new(RocksLedgerStore::open(&config.storage.rocksdb)?);

        let state = assemble(&config, mock.clone(), store.clone(), sink.clone(), ledger_store);
        let router = create_router(state.clone(), &config.api);

        Ok(Self {
            router,
            state,
            mock,
            store,
            sink,
            config,
            _dir: dir,
        })
    }

    /// Send a request and decode the JSON response body
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send_request(&self.router, request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }
}

pub async fn send_request(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

pub fn tx_hash(n: u64) -> String {
    format!("0x{:064x}", n)
}
