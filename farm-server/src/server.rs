//! Component wiring shared by the binary and the integration tests

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::actions::StakingActions;
use crate::api::ApiState;
use crate::chain::{MockStakingContract, RpcStakingContract};
use crate::config::{DatabaseBackend, ServerConfig};
use crate::core::{StakingContract, TransactionSink};
use crate::database::{MemoryTransactionStore, PostgresTransactionStore, TransactionStore};
use crate::ledger::{LedgerStore, PendingLedger, RocksLedgerStore};
use crate::pools::PoolService;
use crate::sink::{StoreSink, TransactionApiClient};

const DEFAULT_SINK_TIMEOUT_SECS: u64 = 10;

/// Staking contract selected by configuration
pub fn build_contract(config: &ServerConfig, mock_chain: bool) -> Result<Arc<dyn StakingContract>> {
    if mock_chain {
        info!("Using in-process mock staking contract");
        return Ok(Arc::new(MockStakingContract::with_pools(4)));
    }
    info!("Using contract gateway at {}", config.chain.rpc_url);
    let client = RpcStakingContract::new(
        config.chain.rpc_url.clone(),
        Duration::from_secs(config.chain.request_timeout_secs),
    )
    .context("failed to build contract gateway client")?;
    Ok(Arc::new(client))
}

/// Transaction store selected by `[database] backend`
pub async fn open_transaction_store(config: &ServerConfig) -> Result<Arc<dyn TransactionStore>> {
    match config.database.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory transaction store");
            Ok(Arc::new(MemoryTransactionStore::new()))
        }
        DatabaseBackend::Postgres => {
            let store = PostgresTransactionStore::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            Ok(Arc::new(store))
        }
    }
}

/// Remote persistence API when configured, the local store otherwise
pub fn build_sink(config: &ServerConfig, store: Arc<dyn TransactionStore>) -> Result<Arc<dyn TransactionSink>> {
    match &config.transaction_api.base_url {
        Some(base_url) => {
            info!("Recording transactions through {}", base_url);
            let timeout = config.transaction_api.timeout_secs.unwrap_or(DEFAULT_SINK_TIMEOUT_SECS);
            let client = TransactionApiClient::new(base_url.clone(), Duration::from_secs(timeout))
                .context("failed to build transaction API client")?;
            Ok(Arc::new(client))
        }
        None => Ok(Arc::new(StoreSink::new(store))),
    }
}

/// Assemble the API state from already opened components
pub fn assemble(
    config: &ServerConfig,
    contract: Arc<dyn StakingContract>,
    store: Arc<dyn TransactionStore>,
    sink: Arc<dyn TransactionSink>,
    ledger_store: Arc<dyn LedgerStore>,
) -> ApiState {
    let pools = Arc::new(PoolService::from_config(contract.clone(), config));
    let ledger = Arc::new(PendingLedger::new(sink, ledger_store));
    let actions = Arc::new(StakingActions::new(contract, ledger.clone(), pools.clone(), config));
    ApiState::new(store, pools, ledger, actions)
}

/// Open every component named by the configuration
pub async fn build_state(config: &ServerConfig, mock_chain: bool) -> Result<ApiState> {
    let contract = build_contract(config, mock_chain)?;
    let store = open_transaction_store(config).await?;
    let sink = build_sink(config, store.clone())?;
    let ledger_store =
        RocksLedgerStore::open(&config.storage.rocksdb).context("failed to open ledger database")?;
    Ok(assemble(config, contract, store, sink, Arc::new(ledger_store)))
}
