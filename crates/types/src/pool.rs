/// Pool records served to the dashboard and the raw contract shapes they come from

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::ZERO_ADDRESS;

// ============================================================================
// Pool Record
// ============================================================================

/// Dashboard view of a staking pool
///
/// Amounts are decimal strings so that values above 2^53 survive JSON
/// consumers unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolRecord {
    pub id: u64,
    pub name: String,
    pub apr: String,
    pub alloc_point: String,
    pub total_staked: String,
    pub user_staked: String,
    pub pending_rewards: String,
    pub lp_token_address: String,
    pub is_active: bool,
}

impl PoolRecord {
    /// Apply an admin update to allocation and activity
    pub fn apply_update(&mut self, alloc_point: u128, is_active: bool) {
        self.alloc_point = alloc_point.to_string();
        self.is_active = is_active;
    }
}

/// Display name for a pool id
pub fn pool_name(id: u64) -> String {
    EXAMPLE_POOLS
        .iter()
        .find(|p| p.0 == id)
        .map(|p| p.1.to_string())
        .unwrap_or_else(|| format!("Pool #{}", id))
}

// id, name, apr, alloc, total staked, lp token
const EXAMPLE_POOLS: [(u64, &str, &str, &str, &str, &str); 4] = [
    (0, "CAKE-BNB LP", "42.5", "100", "125000", "0x0eD7e52944161450477ee417DE9Cd3a859b14fD0"),
    (1, "BUSD-BNB LP", "28.3", "80", "98000", "0x58F876857a02D6762E0101bb5C46A8c1ED44Dc16"),
    (2, "ETH-BNB LP", "35.1", "60", "64000", "0x74E4716E431f45807DCF19f284c7aA99F18a4fbc"),
    (3, "USDT-BUSD LP", "12.7", "40", "210000", "0x7EFaEf62fDdCCa950418312c6C91Aef321375A00"),
];

/// Fixed example pool set shown when the chain cannot be read
pub fn example_pools() -> Vec<PoolRecord> {
    EXAMPLE_POOLS
        .iter()
        .map(|(id, name, apr, alloc, staked, lp)| PoolRecord {
            id: *id,
            name: name.to_string(),
            apr: apr.to_string(),
            alloc_point: alloc.to_string(),
            total_staked: staked.to_string(),
            user_staked: "0".to_string(),
            pending_rewards: "0".to_string(),
            lp_token_address: lp.to_string(),
            is_active: true,
        })
        .collect()
}

/// Stand-in record for a pool whose detail read failed
///
/// Uses the example record when one exists for `id`, otherwise an inactive
/// zeroed record.
pub fn placeholder_pool(id: u64) -> PoolRecord {
    example_pools()
        .into_iter()
        .find(|p| p.id == id)
        .unwrap_or_else(|| PoolRecord {
            id,
            name: pool_name(id),
            apr: "0".to_string(),
            alloc_point: "0".to_string(),
            total_staked: "0".to_string(),
            user_staked: "0".to_string(),
            pending_rewards: "0".to_string(),
            lp_token_address: ZERO_ADDRESS.to_string(),
            is_active: false,
        })
}

// ============================================================================
// Contract Shapes
// ============================================================================

/// Result of `getPoolInfo(poolId)`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub lp_token: String,
    #[serde(with = "dec_u128")]
    pub alloc_point: u128,
    #[serde(with = "dec_u128")]
    pub last_reward_block: u128,
    #[serde(with = "dec_u128")]
    pub acc_reward_per_share: u128,
    #[serde(with = "dec_u128")]
    pub total_staked: u128,
    pub is_active: bool,
}

/// Result of `userInfo(poolId, user)`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(with = "dec_u128")]
    pub amount: u128,
    #[serde(with = "dec_u128")]
    pub reward_debt: u128,
}

/// Serde helper for integers that may arrive as JSON numbers or decimal strings
pub mod dec_u128 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Num(n) => Ok(n as u128),
            Raw::Str(s) => parse_quantity(&s).map_err(serde::de::Error::custom),
        }
    }

    /// Parse a decimal or 0x-prefixed hex quantity
    pub fn parse_quantity(s: &str) -> Result<u128, String> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(hex) if !hex.is_empty() => u128::from_str_radix(hex, 16),
            _ => s.parse::<u128>(),
        };
        parsed.map_err(|e| format!("invalid quantity '{}': {}", s, e))
    }
}
