/// Shared types for the LP staking dashboard
///
/// This crate provides the pool and transaction records exchanged between
/// the pool snapshot cache, the pending-transaction ledger and the
/// transaction persistence API.

pub mod constants;
pub mod errors;
pub mod pool;
pub mod transaction;

// Re-export all public types
pub use constants::*;
pub use errors::*;
pub use pool::*;
pub use transaction::*;

/// Result type alias using the shared error type
pub type FarmResult<T> = std::result::Result<T, FarmError>;
