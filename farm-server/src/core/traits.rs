//! Core trait abstractions (ports to the chain, the persistence API and the stores)

use async_trait::async_trait;
use farm_types::{PoolInfo, StoredTransaction, TransactionRecord, TransactionStatus, UserInfo};

use super::error::{ChainResult, SinkError};
use super::types::TxReceipt;

/// Staking contract port
///
/// Reads return decoded values; writes return the transaction hash as soon
/// as the transaction is submitted, before it is mined.
#[async_trait]
pub trait StakingContract: Send + Sync {
    async fn pool_length(&self) -> ChainResult<u64>;

    async fn get_pool_info(&self, pool_id: u64) -> ChainResult<PoolInfo>;

    async fn user_info(&self, pool_id: u64, user: &str) -> ChainResult<UserInfo>;

    async fn pending_reward(&self, pool_id: u64, user: &str) -> ChainResult<u128>;

    async fn total_alloc_point(&self) -> ChainResult<u128>;

    async fn add_pool(&self, alloc_point: u128, lp_token: &str, with_update: bool) -> ChainResult<String>;

    async fn update_pool(
        &self,
        pool_id: u64,
        alloc_point: u128,
        is_active: bool,
        with_update: bool,
    ) -> ChainResult<String>;

    async fn emergency_withdraw(&self, pool_id: u64) -> ChainResult<String>;

    async fn deposit(&self, pool_id: u64, amount: u128) -> ChainResult<String>;

    async fn withdraw(&self, pool_id: u64, amount: u128) -> ChainResult<String>;

    async fn claim_reward(&self, pool_id: u64) -> ChainResult<String>;

    /// `None` while the transaction is not yet mined
    async fn transaction_receipt(&self, tx_hash: &str) -> ChainResult<Option<TxReceipt>>;
}

/// Remote transaction record persistence
#[async_trait]
pub trait TransactionSink: Send + Sync {
    /// Store a record; an already stored `txHash` returns the existing record
    async fn persist(&self, record: &TransactionRecord) -> Result<StoredTransaction, SinkError>;

    /// Move a stored record to its final status, optionally setting the gas fee
    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> Result<StoredTransaction, SinkError>;
}
