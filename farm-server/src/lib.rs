//! LP staking dashboard backend
//!
//! Pool snapshots with a TTL cache and a forced-refresh limiter, a durable
//! pending-transaction ledger backed by RocksDB, staking actions with
//! receipt tracking, and the transaction persistence API.

pub mod actions;
pub mod api;
pub mod chain;
pub mod config;
pub mod core;
pub mod database;
pub mod ledger;
pub mod metrics;
pub mod pools;
pub mod server;
pub mod sink;

// Re-export commonly used types
pub use config::ServerConfig;
pub use ledger::{LedgerEntry, PendingLedger};
pub use pools::{PoolService, PoolSnapshotCache, RefreshLimiter};
