//! Time-limited snapshot of the pool list

use farm_types::{example_pools, placeholder_pool, PoolRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{to_pool_record, AprParams, UserPosition};
use crate::core::StakingContract;
use crate::metrics::metrics;

/// Cache tuning
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_pools: u64,
    /// Account whose stake and rewards are filled into each record
    pub account: Option<String>,
    pub apr: AprParams,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(farm_types::POOL_CACHE_TTL_SECS),
            max_pools: farm_types::MAX_POOLS_PER_REFRESH,
            account: None,
            apr: AprParams::default(),
        }
    }
}

struct Snapshot {
    pools: Vec<PoolRecord>,
    /// `None` once invalidated
    fetched_at: Option<Instant>,
}

/// Clears the in-flight flag when the fetch finishes or is dropped
struct FetchGuard<'a>(&'a AtomicBool);

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Last-known pool list with a TTL and single in-flight fetch
pub struct PoolSnapshotCache {
    contract: Arc<dyn StakingContract>,
    settings: CacheSettings,
    snapshot: Mutex<Option<Snapshot>>,
    fetching: AtomicBool,
}

impl PoolSnapshotCache {
    pub fn new(contract: Arc<dyn StakingContract>, settings: CacheSettings) -> Self {
        Self {
            contract,
            settings,
            snapshot: Mutex::new(None),
            fetching: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Snapshot>> {
        self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot younger than the TTL, if any
    pub fn fresh(&self) -> Option<Vec<PoolRecord>> {
        let guard = self.lock();
        let snapshot = guard.as_ref()?;
        match snapshot.fetched_at {
            Some(at) if at.elapsed() < self.settings.ttl => Some(snapshot.pools.clone()),
            _ => None,
        }
    }

    /// Last snapshot regardless of age
    pub fn previous(&self) -> Option<Vec<PoolRecord>> {
        self.lock().as_ref().map(|s| s.pools.clone())
    }

    /// Current pool list for a chain reporting `pool_count` pools
    ///
    /// A fresh snapshot is returned as is. Otherwise up to `max_pools`
    /// pools are read one after another. While another fetch is running the
    /// previous snapshot is returned instead of waiting for it.
    pub async fn get_pools(&self, pool_count: u64) -> Vec<PoolRecord> {
        if pool_count == 0 {
            return example_pools();
        }

        if let Some(pools) = self.fresh() {
            return pools;
        }

        if self
            .fetching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Pool fetch already in flight, serving previous snapshot");
            return self.previous().unwrap_or_else(example_pools);
        }
        let _guard = FetchGuard(&self.fetching);

        // another caller may have finished a fetch between the checks
        if let Some(pools) = self.fresh() {
            return pools;
        }

        let pools = self.fetch(pool_count).await;
        *self.lock() = Some(Snapshot {
            pools: pools.clone(),
            fetched_at: Some(Instant::now()),
        });
        pools
    }

    async fn fetch(&self, pool_count: u64) -> Vec<PoolRecord> {
        let count = pool_count.min(self.settings.max_pools);
        metrics().pool_refreshes.inc();

        let total_alloc = match self.contract.total_alloc_point().await {
            Ok(total) => Some(total),
            Err(e) => {
                warn!("Failed to read total allocation, APR unavailable: {}", e);
                None
            }
        };

        let mut pools = Vec::with_capacity(count as usize);
        let mut failures = 0u64;
        for id in 0..count {
            match self.contract.get_pool_info(id).await {
                Ok(info) => {
                    let user = self.user_position(id).await;
                    pools.push(to_pool_record(id, &info, total_alloc, user, &self.settings.apr));
                }
                Err(e) => {
                    warn!("Failed to read pool {}, using placeholder: {}", id, e);
                    metrics().pool_fetch_failures.inc();
                    failures += 1;
                    pools.push(placeholder_pool(id));
                }
            }
        }

        if failures == count {
            warn!("All {} pool reads failed, serving example pools", count);
            return example_pools();
        }

        info!("Fetched {} pools ({} placeholders)", count, failures);
        pools
    }

    async fn user_position(&self, pool_id: u64) -> UserPosition {
        let Some(account) = self.settings.account.as_deref() else {
            return UserPosition::default();
        };

        let staked = match self.contract.user_info(pool_id, account).await {
            Ok(info) => info.amount,
            Err(e) => {
                debug!("User stake for pool {} unavailable: {}", pool_id, e);
                0
            }
        };
        let pending_rewards = match self.contract.pending_reward(pool_id, account).await {
            Ok(amount) => amount,
            Err(e) => {
                debug!("Pending reward for pool {} unavailable: {}", pool_id, e);
                0
            }
        };

        UserPosition { staked, pending_rewards }
    }

    /// Mark the snapshot expired; records are kept for in-flight readers
    pub fn invalidate(&self) {
        if let Some(snapshot) = self.lock().as_mut() {
            snapshot.fetched_at = None;
        }
        debug!("Pool snapshot invalidated");
    }

    /// Patch allocation and activity of one cached pool
    ///
    /// Returns `false` when no cached record has that id.
    pub fn apply_pool_update(&self, pool_id: u64, alloc_point: u128, is_active: bool) -> bool {
        let mut guard = self.lock();
        let Some(snapshot) = guard.as_mut() else {
            return false;
        };
        match snapshot.pools.iter_mut().find(|p| p.id == pool_id) {
            Some(pool) => {
                pool.apply_update(alloc_point, is_active);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockStakingContract;

    fn cache(mock: &Arc<MockStakingContract>) -> PoolSnapshotCache {
        PoolSnapshotCache::new(mock.clone(), CacheSettings::default())
    }

    #[tokio::test]
    async fn test_patch_without_snapshot_is_noop() {
        let mock = Arc::new(MockStakingContract::with_pools(2));
        let cache = cache(&mock);
        assert!(!cache.apply_pool_update(0, 1, false));
    }

    #[tokio::test]
    async fn test_invalidate_keeps_previous_records() {
        let mock = Arc::new(MockStakingContract::with_pools(2));
        let cache = cache(&mock);

        let pools = cache.get_pools(2).await;
        cache.invalidate();

        assert_eq!(cache.previous(), Some(pools));
        assert!(cache.fresh().is_none());
    }

    #[tokio::test]
    async fn test_fetch_flag_released_after_fetch() {
        let mock = Arc::new(MockStakingContract::with_pools(1));
        let cache = cache(&mock);

        cache.get_pools(1).await;
        assert!(!cache.fetching.load(Ordering::Acquire));
    }
}
