//! Receipt polling with bounded exponential backoff

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ConfirmationConfig;
use crate::core::{StakingContract, TxReceipt};

/// Final word on a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Mined and executed successfully
    Confirmed(TxReceipt),
    /// Mined but execution failed
    Reverted(TxReceipt),
    /// No receipt within the polling budget; the record stays pending
    TimedOut { attempts: u32 },
}

/// Polls the contract gateway for transaction receipts
pub struct ConfirmationTracker {
    contract: Arc<dyn StakingContract>,
    policy: ConfirmationConfig,
}

impl ConfirmationTracker {
    pub fn new(contract: Arc<dyn StakingContract>, policy: ConfirmationConfig) -> Self {
        Self { contract, policy }
    }

    pub fn enabled(&self) -> bool {
        self.policy.enabled
    }

    /// Wait for a receipt, sleeping with backoff between attempts
    ///
    /// Gateway errors count as attempts and are retried.
    pub async fn wait(&self, tx_hash: &str) -> Confirmation {
        for attempt in 0..self.policy.max_attempts {
            match self.contract.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.status => {
                    info!("Transaction {} confirmed in block {}", tx_hash, receipt.block_number);
                    return Confirmation::Confirmed(receipt);
                }
                Ok(Some(receipt)) => {
                    warn!("Transaction {} reverted in block {}", tx_hash, receipt.block_number);
                    return Confirmation::Reverted(receipt);
                }
                Ok(None) => debug!("No receipt yet for {} (attempt {})", tx_hash, attempt + 1),
                Err(e) => warn!("Receipt lookup for {} failed (attempt {}): {}", tx_hash, attempt + 1, e),
            }

            if attempt + 1 < self.policy.max_attempts {
                tokio::time::sleep(self.policy.delay_for_attempt(attempt)).await;
            }
        }

        warn!(
            "Gave up waiting for {} after {} attempts, leaving it pending",
            tx_hash, self.policy.max_attempts
        );
        Confirmation::TimedOut {
            attempts: self.policy.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MockStakingContract;

    fn policy(max_attempts: u32) -> ConfirmationConfig {
        ConfirmationConfig {
            enabled: true,
            max_attempts,
            base_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_confirms_mined_transaction() {
        let mock = Arc::new(MockStakingContract::with_pools(1));
        let hash = mock.deposit(0, 10).await.unwrap();
        let tracker = ConfirmationTracker::new(mock.clone(), policy(3));

        match tracker.wait(&hash).await {
            Confirmation::Confirmed(receipt) => assert_eq!(receipt.tx_hash, hash),
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reports_revert() {
        let mock = Arc::new(MockStakingContract::with_pools(1));
        let hash = mock.claim_reward(0).await.unwrap();
        mock.revert_hash(&hash);
        let tracker = ConfirmationTracker::new(mock.clone(), policy(3));

        assert!(matches!(tracker.wait(&hash).await, Confirmation::Reverted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_without_receipt() {
        let mock = Arc::new(MockStakingContract::with_pools(1));
        mock.set_auto_mine(false);
        let hash = mock.claim_reward(0).await.unwrap();
        let tracker = ConfirmationTracker::new(mock.clone(), policy(4));

        let started = tokio::time::Instant::now();
        assert_eq!(tracker.wait(&hash).await, Confirmation::TimedOut { attempts: 4 });
        // 100 + 200 + 400 ms between the four attempts
        let elapsed = started.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(700));
        assert!(elapsed < std::time::Duration::from_millis(800));
    }
}
