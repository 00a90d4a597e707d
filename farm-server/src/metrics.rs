//! Prometheus metrics for refreshes and the pending-transaction ledger

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::OnceLock;

pub struct ServerMetrics {
    registry: Registry,
    pub pool_refreshes: IntCounter,
    pub pool_fetch_failures: IntCounter,
    pub refreshes_suppressed: IntCounter,
    pub ledger_pending: IntGauge,
    pub ledger_synced: IntCounter,
    pub ledger_parked: IntCounter,
}

impl ServerMetrics {
    fn new() -> Self {
        let registry = Registry::new();

        let pool_refreshes = IntCounter::new("farm_pool_refreshes_total", "Pool snapshot fetches from chain")
            .expect("valid metric");
        let pool_fetch_failures = IntCounter::new(
            "farm_pool_fetch_failures_total",
            "Pool detail reads replaced by a placeholder",
        )
        .expect("valid metric");
        let refreshes_suppressed = IntCounter::new(
            "farm_refreshes_suppressed_total",
            "Forced refreshes rejected by the rate limiter",
        )
        .expect("valid metric");
        let ledger_pending = IntGauge::new("farm_ledger_pending", "Transactions waiting in the local ledger")
            .expect("valid metric");
        let ledger_synced = IntCounter::new("farm_ledger_synced_total", "Ledger entries replayed successfully")
            .expect("valid metric");
        let ledger_parked = IntCounter::new(
            "farm_ledger_parked_total",
            "Transactions parked locally after a failed remote write",
        )
        .expect("valid metric");

        for collector in [
            Box::new(pool_refreshes.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(pool_fetch_failures.clone()),
            Box::new(refreshes_suppressed.clone()),
            Box::new(ledger_pending.clone()),
            Box::new(ledger_synced.clone()),
            Box::new(ledger_parked.clone()),
        ] {
            registry.register(collector).expect("metric registered once");
        }

        Self {
            registry,
            pool_refreshes,
            pool_fetch_failures,
            refreshes_suppressed,
            ledger_pending,
            ledger_synced,
            ledger_parked,
        }
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Process-wide metrics handle
pub fn metrics() -> &'static ServerMetrics {
    static METRICS: OnceLock<ServerMetrics> = OnceLock::new();
    METRICS.get_or_init(ServerMetrics::new)
}
