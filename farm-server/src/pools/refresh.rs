//! Lifetime cap on forced pool refreshes

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::metrics::metrics;

/// Result of a refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome<T> {
    Triggered(T),
    /// Limit reached, nothing was refetched
    Suppressed,
}

impl<T> RefreshOutcome<T> {
    pub fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered(_))
    }
}

/// Counts forced refreshes and refuses them past `max`
///
/// There is no time-window decay: once the cap is hit only `reset()`
/// re-enables refreshing.
pub struct RefreshLimiter {
    count: AtomicU32,
    max: u32,
    debounce: Duration,
}

impl RefreshLimiter {
    pub fn new(max: u32, debounce: Duration) -> Self {
        Self {
            count: AtomicU32::new(0),
            max,
            debounce,
        }
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Run `refetch` after the debounce delay unless the cap is reached
    pub async fn request_refresh<F, Fut, T>(&self, refetch: F) -> RefreshOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let max = self.max;
        let admitted = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1));

        match admitted {
            Ok(previous) => {
                debug!("Forced refresh {}/{} scheduled", previous + 1, max);
                tokio::time::sleep(self.debounce).await;
                RefreshOutcome::Triggered(refetch().await)
            }
            Err(current) => {
                warn!("Refresh limit reached ({}/{}), ignoring refresh request", current, max);
                metrics().refreshes_suppressed.inc();
                RefreshOutcome::Suppressed
            }
        }
    }

    pub fn reset(&self) {
        self.count.store(0, Ordering::Release);
        debug!("Refresh limiter reset");
    }
}
