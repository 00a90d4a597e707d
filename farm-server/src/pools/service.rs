//! Coordinator owning the pool snapshot cache and its refresh limiter

use farm_types::{example_pools, PoolRecord};
use std::sync::Arc;
use tracing::{info, warn};

use super::cache::{CacheSettings, PoolSnapshotCache};
use super::refresh::{RefreshLimiter, RefreshOutcome};
use super::AprParams;
use crate::config::ServerConfig;
use crate::core::StakingContract;

/// Pool reads for one dashboard instance
///
/// Each service owns its own cache and limiter, so independent instances
/// never share refresh budgets.
pub struct PoolService {
    contract: Arc<dyn StakingContract>,
    cache: PoolSnapshotCache,
    limiter: RefreshLimiter,
}

impl PoolService {
    pub fn new(contract: Arc<dyn StakingContract>, settings: CacheSettings, limiter: RefreshLimiter) -> Self {
        Self {
            cache: PoolSnapshotCache::new(contract.clone(), settings),
            contract,
            limiter,
        }
    }

    pub fn from_config(contract: Arc<dyn StakingContract>, config: &ServerConfig) -> Self {
        let settings = CacheSettings {
            ttl: config.pools.cache_ttl(),
            max_pools: config.pools.max_pools,
            account: config.chain.account.clone(),
            apr: AprParams::from_config(&config.chain),
        };
        let limiter = RefreshLimiter::new(config.pools.max_forced_refreshes, config.pools.refresh_debounce());
        Self::new(contract, settings, limiter)
    }

    pub fn cache(&self) -> &PoolSnapshotCache {
        &self.cache
    }

    pub fn limiter(&self) -> &RefreshLimiter {
        &self.limiter
    }

    /// Current pool list, read through the snapshot cache
    pub async fn pools(&self) -> Vec<PoolRecord> {
        if let Some(pools) = self.cache.fresh() {
            return pools;
        }
        match self.contract.pool_length().await {
            Ok(count) => self.cache.get_pools(count).await,
            Err(e) => {
                warn!("Failed to read pool count, serving example pools: {}", e);
                example_pools()
            }
        }
    }

    /// Rate-limited refetch that bypasses the snapshot age
    pub async fn force_refresh(&self) -> RefreshOutcome<Vec<PoolRecord>> {
        self.limiter
            .request_refresh(move || async move {
                self.cache.invalidate();
                self.pools().await
            })
            .await
    }

    /// Reflect an admin pool update before the next refetch
    pub fn apply_admin_update(&self, pool_id: u64, alloc_point: u128, is_active: bool) {
        if !self.cache.apply_pool_update(pool_id, alloc_point, is_active) {
            info!("Pool {} not cached yet, update will appear on next fetch", pool_id);
        }
        self.cache.invalidate();
        self.limiter.reset();
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}
