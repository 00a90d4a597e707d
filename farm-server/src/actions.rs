//! Staking and admin writes: contract call, transaction record, confirmation

use farm_types::{pool_name, FarmError, TransactionRecord, TransactionType};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chain::{Confirmation, ConfirmationTracker};
use crate::config::ServerConfig;
use crate::core::{format_units, parse_units, ActionReceipt, ServiceResult, StakingContract};
use crate::ledger::PendingLedger;
use crate::pools::PoolService;

/// Executes user and admin writes against the staking contract
///
/// Every successful submission produces exactly one pending transaction
/// record; its final status is set once a receipt arrives.
pub struct StakingActions {
    contract: Arc<dyn StakingContract>,
    ledger: Arc<PendingLedger>,
    pools: Arc<PoolService>,
    tracker: Arc<ConfirmationTracker>,
    account: Option<String>,
    reward_token: String,
    token_decimals: u32,
    confirmations: Mutex<Vec<JoinHandle<()>>>,
}

impl StakingActions {
    pub fn new(
        contract: Arc<dyn StakingContract>,
        ledger: Arc<PendingLedger>,
        pools: Arc<PoolService>,
        config: &ServerConfig,
    ) -> Self {
        let tracker = ConfirmationTracker::new(contract.clone(), config.confirmation.clone());
        Self {
            contract,
            ledger,
            pools,
            tracker: Arc::new(tracker),
            account: config.chain.account.clone(),
            reward_token: config.chain.reward_token.clone(),
            token_decimals: config.chain.token_decimals,
            confirmations: Mutex::new(Vec::new()),
        }
    }

    fn amount(&self, value: &str) -> ServiceResult<u128> {
        let raw = parse_units("amount", value, self.token_decimals)?;
        if raw == 0 {
            return Err(FarmError::InvalidField {
                field: "amount".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(raw)
    }

    /// Stake `amount` LP tokens into a pool
    pub async fn stake(&self, pool_id: u64, amount: &str) -> ServiceResult<ActionReceipt> {
        let raw = self.amount(amount)?;
        let tx_hash = self.contract.deposit(pool_id, raw).await?;
        let lp = pool_name(pool_id);
        let record = TransactionRecord::pending(TransactionType::Stake, &tx_hash, &lp, pool_label(pool_id))
            .with_amounts(amount.trim(), amount.trim())
            .with_description(format!("Staked {} {} in pool {}", amount.trim(), lp, pool_id))
            .with_metadata("poolId", json!(pool_id));
        Ok(self.track(tx_hash, record).await)
    }

    /// Withdraw `amount` LP tokens from a pool
    pub async fn unstake(&self, pool_id: u64, amount: &str) -> ServiceResult<ActionReceipt> {
        let raw = self.amount(amount)?;
        let tx_hash = self.contract.withdraw(pool_id, raw).await?;
        let lp = pool_name(pool_id);
        let record = TransactionRecord::pending(TransactionType::Unstake, &tx_hash, pool_label(pool_id), &lp)
            .with_amounts(amount.trim(), amount.trim())
            .with_description(format!("Unstaked {} {} from pool {}", amount.trim(), lp, pool_id))
            .with_metadata("poolId", json!(pool_id));
        Ok(self.track(tx_hash, record).await)
    }

    /// Claim pending rewards of a pool
    pub async fn harvest(&self, pool_id: u64) -> ServiceResult<ActionReceipt> {
        // read before the claim resets it
        let pending = match &self.account {
            Some(account) => self.contract.pending_reward(pool_id, account).await.unwrap_or_else(|e| {
                debug!("Pending reward for pool {} unavailable: {}", pool_id, e);
                0
            }),
            None => 0,
        };
        let reward = format_units(pending, self.token_decimals);

        let tx_hash = self.contract.claim_reward(pool_id).await?;
        let record =
            TransactionRecord::pending(TransactionType::Harvest, &tx_hash, pool_label(pool_id), &self.reward_token)
                .with_amounts("0", &reward)
                .with_description(format!("Harvested {} {} from pool {}", reward, self.reward_token, pool_id))
                .with_metadata("poolId", json!(pool_id));
        Ok(self.track(tx_hash, record).await)
    }

    /// Withdraw the whole stake without rewards
    pub async fn emergency_withdraw(&self, pool_id: u64) -> ServiceResult<ActionReceipt> {
        let staked = match &self.account {
            Some(account) => self
                .contract
                .user_info(pool_id, account)
                .await
                .map(|info| info.amount)
                .unwrap_or(0),
            None => 0,
        };
        let amount = format_units(staked, self.token_decimals);

        let tx_hash = self.contract.emergency_withdraw(pool_id).await?;
        let lp = pool_name(pool_id);
        let record = TransactionRecord::pending(TransactionType::Unstake, &tx_hash, pool_label(pool_id), &lp)
            .with_amounts(&amount, &amount)
            .with_description(format!("Emergency withdrawal of {} {} from pool {}", amount, lp, pool_id))
            .with_metadata("poolId", json!(pool_id))
            .with_metadata("emergency", json!(true));
        Ok(self.track(tx_hash, record).await)
    }

    /// Register a new pool (admin)
    pub async fn add_pool(&self, alloc_point: u128, lp_token: &str, with_update: bool) -> ServiceResult<ActionReceipt> {
        if !farm_types::is_prefixed_hex(lp_token, farm_types::ADDRESS_HEX_LEN) {
            return Err(FarmError::invalid_hex("lpToken", farm_types::ADDRESS_HEX_LEN).into());
        }
        let tx_hash = self.contract.add_pool(alloc_point, lp_token, with_update).await?;
        self.pools.invalidate();

        let record = TransactionRecord::pending(TransactionType::PoolUpdate, &tx_hash, lp_token, "Farm")
            .with_description(format!("Added pool for {} with allocation {}", lp_token, alloc_point))
            .with_metadata("action", json!("add_pool"))
            .with_metadata("allocPoint", json!(alloc_point.to_string()))
            .with_metadata("lpToken", json!(lp_token))
            .with_metadata("withUpdate", json!(with_update));
        Ok(self.track(tx_hash, record).await)
    }

    /// Change allocation and activity of a pool (admin)
    pub async fn update_pool(
        &self,
        pool_id: u64,
        alloc_point: u128,
        is_active: bool,
        with_update: bool,
    ) -> ServiceResult<ActionReceipt> {
        let tx_hash = self
            .contract
            .update_pool(pool_id, alloc_point, is_active, with_update)
            .await?;
        self.pools.apply_admin_update(pool_id, alloc_point, is_active);

        let name = pool_name(pool_id);
        let record = TransactionRecord::pending(TransactionType::PoolUpdate, &tx_hash, &name, &name)
            .with_description(format!(
                "Updated pool {}: allocation {}, {}",
                pool_id,
                alloc_point,
                if is_active { "active" } else { "inactive" }
            ))
            .with_metadata("action", json!("update_pool"))
            .with_metadata("poolId", json!(pool_id))
            .with_metadata("allocPoint", json!(alloc_point.to_string()))
            .with_metadata("isActive", json!(is_active))
            .with_metadata("withUpdate", json!(with_update));
        Ok(self.track(tx_hash, record).await)
    }

    /// Record the submitted transaction and start confirmation tracking
    async fn track(&self, tx_hash: String, record: TransactionRecord) -> ActionReceipt {
        let tx_type = record.tx_type;
        let recorded = match self.ledger.record(record).await {
            Ok(stored) => {
                debug!("Recorded {} as {}", tx_hash, stored.id);
                true
            }
            Err(e) => {
                warn!("Transaction {} submitted but not recorded remotely: {}", tx_hash, e);
                false
            }
        };

        if self.tracker.enabled() {
            let tracker = self.tracker.clone();
            let ledger = self.ledger.clone();
            let pools = self.pools.clone();
            let decimals = self.token_decimals;
            let hash = tx_hash.clone();
            let handle = tokio::spawn(async move {
                match tracker.wait(&hash).await {
                    Confirmation::Confirmed(receipt) | Confirmation::Reverted(receipt) => {
                        let status = receipt.final_status();
                        ledger.update_status(&hash, status, Some(receipt.gas_fee(decimals))).await;
                        info!("Transaction {} is {}", hash, status);
                    }
                    Confirmation::TimedOut { .. } => {}
                }
                pools.invalidate();
            });
            let mut confirmations = self.confirmations_guard();
            confirmations.retain(|h| !h.is_finished());
            confirmations.push(handle);
        }

        ActionReceipt {
            tx_hash,
            tx_type,
            recorded,
        }
    }

    fn confirmations_guard(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.confirmations.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait for every confirmation task started so far
    pub async fn settle(&self) {
        let handles: Vec<_> = std::mem::take(&mut *self.confirmations_guard());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Confirmation task failed: {}", e);
            }
        }
    }
}

fn pool_label(pool_id: u64) -> String {
    format!("Farm Pool {}", pool_id)
}
