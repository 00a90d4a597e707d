//! Staking contract access: gateway client, in-process mock and receipt tracking

pub mod confirmation;
pub mod mock;
pub mod rpc_client;

pub use confirmation::{Confirmation, ConfirmationTracker};
pub use mock::MockStakingContract;
pub use rpc_client::RpcStakingContract;
