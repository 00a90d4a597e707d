//! Pool snapshots: chain-to-record conversion, the snapshot cache, the
//! forced-refresh limiter and the service tying them together

pub mod cache;
pub mod refresh;
pub mod service;

pub use cache::PoolSnapshotCache;
pub use refresh::{RefreshLimiter, RefreshOutcome};
pub use service::PoolService;

use farm_types::{pool_name, PoolInfo, PoolRecord};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::ChainConfig;
use crate::core::format_units;

/// Inputs for the APR estimate
#[derive(Debug, Clone)]
pub struct AprParams {
    pub reward_per_block: Decimal,
    pub blocks_per_year: u64,
    pub token_decimals: u32,
}

impl AprParams {
    pub fn from_config(chain: &ChainConfig) -> Self {
        Self {
            reward_per_block: farm_types::parse_decimal("reward_per_block", &chain.reward_per_block)
                .unwrap_or(Decimal::ZERO),
            blocks_per_year: chain.blocks_per_year,
            token_decimals: chain.token_decimals,
        }
    }
}

impl Default for AprParams {
    fn default() -> Self {
        Self {
            reward_per_block: Decimal::from(10),
            blocks_per_year: 10_512_000,
            token_decimals: 18,
        }
    }
}

/// Stake and rewards of the configured account in one pool
#[derive(Debug, Clone, Copy, Default)]
pub struct UserPosition {
    pub staked: u128,
    pub pending_rewards: u128,
}

fn to_decimal(raw: u128, decimals: u32) -> Option<Decimal> {
    Decimal::from_str(&format_units(raw, decimals)).ok()
}

/// Yearly reward emission attributed to a pool over its stake, in percent
///
/// Returns `"0"` when nothing is staked, no allocation exists or the
/// arithmetic leaves the decimal range.
pub fn estimate_apr(alloc_point: u128, total_alloc: u128, total_staked: u128, params: &AprParams) -> String {
    if alloc_point == 0 || total_alloc == 0 || total_staked == 0 {
        return "0".to_string();
    }

    let apr = (|| {
        let share = to_decimal(alloc_point, 0)?.checked_div(to_decimal(total_alloc, 0)?)?;
        let staked = to_decimal(total_staked, params.token_decimals)?;
        let yearly = params
            .reward_per_block
            .checked_mul(Decimal::from(params.blocks_per_year))?
            .checked_mul(share)?;
        yearly.checked_div(staked)?.checked_mul(Decimal::from(100))
    })();

    apr.map(|v| v.round_dp(2).normalize().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Build the dashboard record for a pool read from chain
pub fn to_pool_record(
    id: u64,
    info: &PoolInfo,
    total_alloc: Option<u128>,
    user: UserPosition,
    params: &AprParams,
) -> PoolRecord {
    let apr = match total_alloc {
        Some(total) => estimate_apr(info.alloc_point, total, info.total_staked, params),
        None => "0".to_string(),
    };

    PoolRecord {
        id,
        name: pool_name(id),
        apr,
        alloc_point: info.alloc_point.to_string(),
        total_staked: format_units(info.total_staked, params.token_decimals),
        user_staked: format_units(user.staked, params.token_decimals),
        pending_rewards: format_units(user.pending_rewards, params.token_decimals),
        lp_token_address: info.lp_token.clone(),
        is_active: info.is_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_apr_estimate() {
        let params = AprParams {
            reward_per_block: Decimal::from(1),
            blocks_per_year: 1000,
            token_decimals: 18,
        };
        // half of 1000 tokens/year over 250 staked tokens
        assert_eq!(estimate_apr(50, 100, 250 * ONE, &params), "200");
        assert_eq!(estimate_apr(1, 3, 1000 * ONE, &params), "33.33");
        assert_eq!(estimate_apr(50, 100, 0, &params), "0");
        assert_eq!(estimate_apr(0, 100, ONE, &params), "0");
    }

    #[test]
    fn test_pool_record_from_chain() {
        let info = PoolInfo {
            lp_token: "0x58F876857a02D6762E0101bb5C46A8c1ED44Dc16".to_string(),
            alloc_point: 150,
            last_reward_block: 1,
            acc_reward_per_share: 0,
            total_staked: 3 * ONE / 2,
            is_active: false,
        };
        let record = to_pool_record(
            1,
            &info,
            None,
            UserPosition {
                staked: ONE / 2,
                pending_rewards: ONE / 4,
            },
            &AprParams::default(),
        );

        assert_eq!(record.name, "BUSD-BNB LP");
        assert_eq!(record.alloc_point, "150");
        assert_eq!(record.total_staked, "1.5");
        assert_eq!(record.user_staked, "0.5");
        assert_eq!(record.pending_rewards, "0.25");
        assert_eq!(record.apr, "0");
        assert!(!record.is_active);
    }
}
