//! In-process staking contract for development mode and tests

use async_trait::async_trait;
use farm_types::{example_pools, PoolInfo, UserInfo};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::core::{ChainError, ChainResult, StakingContract, TxReceipt};

const MOCK_GAS_USED: u128 = 120_000;
const MOCK_GAS_PRICE: u128 = 3_000_000_000;

#[derive(Default)]
struct MockState {
    pools: Vec<PoolInfo>,
    stakes: HashMap<(u64, String), u128>,
    failing_pools: HashSet<u64>,
    reject_next: Option<ChainError>,
    reverted: HashSet<String>,
    submitted: HashSet<String>,
}

/// Staking contract simulated in memory
///
/// Writes are mined immediately unless `set_auto_mine(false)` is used, in
/// which case receipts stay unavailable.
pub struct MockStakingContract {
    state: Mutex<MockState>,
    nonce: AtomicU64,
    pool_length_calls: AtomicUsize,
    pool_info_calls: AtomicUsize,
    pool_info_delay: Mutex<Duration>,
    auto_mine: Mutex<bool>,
    account: String,
}

impl MockStakingContract {
    /// Empty contract with no pools
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            nonce: AtomicU64::new(1),
            pool_length_calls: AtomicUsize::new(0),
            pool_info_calls: AtomicUsize::new(0),
            pool_info_delay: Mutex::new(Duration::ZERO),
            auto_mine: Mutex::new(true),
            account: "0x00000000000000000000000000000000000000aa".to_string(),
        }
    }

    /// Contract seeded with `count` pools, the first ones mirroring the example set
    pub fn with_pools(count: u64) -> Self {
        let mock = Self::new();
        {
            let examples = example_pools();
            let mut state = mock.lock();
            for id in 0..count {
                let lp_token = examples
                    .get(id as usize)
                    .map(|p| p.lp_token_address.clone())
                    .unwrap_or_else(|| format!("0x{:040x}", id + 1));
                state.pools.push(PoolInfo {
                    lp_token,
                    alloc_point: 100 + id as u128 * 10,
                    last_reward_block: 1_000,
                    acc_reward_per_share: 0,
                    total_staked: (id as u128 + 1) * 1_000_000_000_000_000_000_000,
                    is_active: true,
                });
            }
        }
        mock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of `poolLength` calls served so far
    pub fn pool_length_calls(&self) -> usize {
        self.pool_length_calls.load(Ordering::SeqCst)
    }

    /// Number of `getPoolInfo` calls served so far
    pub fn pool_info_calls(&self) -> usize {
        self.pool_info_calls.load(Ordering::SeqCst)
    }

    /// Make `getPoolInfo` fail for a pool
    pub fn fail_pool(&self, pool_id: u64) {
        self.lock().failing_pools.insert(pool_id);
    }

    /// Clear all injected pool failures
    pub fn heal_pools(&self) {
        self.lock().failing_pools.clear();
    }

    /// Delay every `getPoolInfo` response
    pub fn set_pool_info_delay(&self, delay: Duration) {
        *self.pool_info_delay.lock().unwrap_or_else(|p| p.into_inner()) = delay;
    }

    /// Fail the next write with `error`
    pub fn reject_next_write(&self, error: ChainError) {
        self.lock().reject_next = Some(error);
    }

    /// Report a failed receipt for `tx_hash`
    pub fn revert_hash(&self, tx_hash: &str) {
        self.lock().reverted.insert(tx_hash.to_string());
    }

    pub fn set_auto_mine(&self, enabled: bool) {
        *self.auto_mine.lock().unwrap_or_else(|p| p.into_inner()) = enabled;
    }

    /// Hash the next submitted write will get
    pub fn peek_next_hash(&self) -> String {
        format!("0x{:064x}", self.nonce.load(Ordering::SeqCst))
    }

    pub fn pool(&self, pool_id: u64) -> Option<PoolInfo> {
        self.lock().pools.get(pool_id as usize).cloned()
    }

    pub fn staked(&self, pool_id: u64, user: &str) -> u128 {
        self.lock()
            .stakes
            .get(&(pool_id, user.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    fn submit<F>(&self, method: &str, apply: F) -> ChainResult<String>
    where
        F: FnOnce(&mut MockState) -> ChainResult<()>,
    {
        let mut state = self.lock();
        if let Some(error) = state.reject_next.take() {
            return Err(error);
        }
        apply(&mut *state)?;
        let hash = format!("0x{:064x}", self.nonce.fetch_add(1, Ordering::SeqCst));
        state.submitted.insert(hash.clone());
        debug!("mock {} submitted as {}", method, hash);
        Ok(hash)
    }

    fn pool_mut(state: &mut MockState, pool_id: u64) -> ChainResult<&mut PoolInfo> {
        state
            .pools
            .get_mut(pool_id as usize)
            .ok_or_else(|| ChainError::from_rpc(3, "execution reverted: pool does not exist"))
    }
}

impl Default for MockStakingContract {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StakingContract for MockStakingContract {
    async fn pool_length(&self) -> ChainResult<u64> {
        self.pool_length_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lock().pools.len() as u64)
    }

    async fn get_pool_info(&self, pool_id: u64) -> ChainResult<PoolInfo> {
        self.pool_info_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.pool_info_delay.lock().unwrap_or_else(|p| p.into_inner());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.failing_pools.contains(&pool_id) {
            return Err(ChainError::invalid_response(format!("pool {} response missing fields", pool_id)));
        }
        state
            .pools
            .get(pool_id as usize)
            .cloned()
            .ok_or_else(|| ChainError::from_rpc(3, "execution reverted: pool does not exist"))
    }

    async fn user_info(&self, pool_id: u64, user: &str) -> ChainResult<UserInfo> {
        Ok(UserInfo {
            amount: self.staked(pool_id, user),
            reward_debt: 0,
        })
    }

    async fn pending_reward(&self, pool_id: u64, user: &str) -> ChainResult<u128> {
        // a tenth of the stake keeps the numbers easy to assert on
        Ok(self.staked(pool_id, user) / 10)
    }

    async fn total_alloc_point(&self) -> ChainResult<u128> {
        Ok(self
            .lock()
            .pools
            .iter()
            .filter(|p| p.is_active)
            .map(|p| p.alloc_point)
            .sum())
    }

    async fn add_pool(&self, alloc_point: u128, lp_token: &str, _with_update: bool) -> ChainResult<String> {
        let lp_token = lp_token.to_string();
        self.submit("addPool", move |state| {
            state.pools.push(PoolInfo {
                lp_token,
                alloc_point,
                last_reward_block: 0,
                acc_reward_per_share: 0,
                total_staked: 0,
                is_active: true,
            });
            Ok(())
        })
    }

    async fn update_pool(
        &self,
        pool_id: u64,
        alloc_point: u128,
        is_active: bool,
        _with_update: bool,
    ) -> ChainResult<String> {
        self.submit("updatePool", move |state| {
            let pool = Self::pool_mut(state, pool_id)?;
            pool.alloc_point = alloc_point;
            pool.is_active = is_active;
            Ok(())
        })
    }

    async fn emergency_withdraw(&self, pool_id: u64) -> ChainResult<String> {
        let account = self.account.clone();
        self.submit("emergencyWithdraw", move |state| {
            let amount = state.stakes.remove(&(pool_id, account)).unwrap_or(0);
            let pool = Self::pool_mut(state, pool_id)?;
            pool.total_staked = pool.total_staked.saturating_sub(amount);
            Ok(())
        })
    }

    async fn deposit(&self, pool_id: u64, amount: u128) -> ChainResult<String> {
        let account = self.account.clone();
        self.submit("deposit", move |state| {
            let pool = Self::pool_mut(state, pool_id)?;
            if !pool.is_active {
                return Err(ChainError::from_rpc(3, "execution reverted: pool inactive"));
            }
            pool.total_staked += amount;
            *state.stakes.entry((pool_id, account)).or_insert(0) += amount;
            Ok(())
        })
    }

    async fn withdraw(&self, pool_id: u64, amount: u128) -> ChainResult<String> {
        let account = self.account.clone();
        self.submit("withdraw", move |state| {
            let key = (pool_id, account);
            let staked = state.stakes.get(&key).copied().unwrap_or(0);
            if staked < amount {
                return Err(ChainError::from_rpc(3, "execution reverted: withdraw: not good"));
            }
            state.stakes.insert(key, staked - amount);
            let pool = Self::pool_mut(state, pool_id)?;
            pool.total_staked -= amount;
            Ok(())
        })
    }

    async fn claim_reward(&self, pool_id: u64) -> ChainResult<String> {
        self.submit("claimReward", move |state| {
            Self::pool_mut(state, pool_id)?;
            Ok(())
        })
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> ChainResult<Option<TxReceipt>> {
        if !*self.auto_mine.lock().unwrap_or_else(|p| p.into_inner()) {
            return Ok(None);
        }
        let state = self.lock();
        if !state.submitted.contains(tx_hash) {
            return Ok(None);
        }
        Ok(Some(TxReceipt {
            tx_hash: tx_hash.to_string(),
            status: !state.reverted.contains(tx_hash),
            block_number: 1_000 + self.nonce.load(Ordering::SeqCst) as u128,
            gas_used: MOCK_GAS_USED,
            effective_gas_price: MOCK_GAS_PRICE,
        }))
    }
}
