/// Constants shared across the dashboard components

// ============================================================================
// Pool Snapshot Constants
// ============================================================================

/// Age after which a pool snapshot is considered stale
pub const POOL_CACHE_TTL_SECS: u64 = 30;

/// Upper bound on pool detail reads per refresh cycle
pub const MAX_POOLS_PER_REFRESH: u64 = 10;

/// Forced refreshes allowed per limiter lifetime
pub const MAX_FORCED_REFRESHES: u32 = 3;

/// Debounce applied before a forced refresh runs
pub const DEFAULT_REFRESH_DEBOUNCE_MS: u64 = 250;

// ============================================================================
// Encoding Constants
// ============================================================================

/// Hex characters in a transaction hash (32 bytes)
pub const TX_HASH_HEX_LEN: usize = 64;

/// Hex characters in an account or token address (20 bytes)
pub const ADDRESS_HEX_LEN: usize = 40;

/// Zero address used for placeholder LP tokens
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ============================================================================
// Persistence Constants
// ============================================================================

/// Default page size for transaction listings
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Maximum page size for transaction listings
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Durable key holding transactions awaiting replay
pub const PENDING_LEDGER_KEY: &str = "pending_transactions";

/// Durable key holding transactions that could not be parked locally
pub const FAILED_LEDGER_KEY: &str = "failed_transactions";
