//! Transaction sinks: the remote persistence API and the in-process store

use async_trait::async_trait;
use farm_types::{StoredTransaction, TransactionRecord, TransactionStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::{SinkError, TransactionSink};
use crate::database::TransactionStore;

/// HTTP client for a remote transaction persistence API
pub struct TransactionApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl TransactionApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn parse(response: reqwest::Response) -> Result<StoredTransaction, SinkError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<StoredTransaction>().await?)
    }
}

#[async_trait]
impl TransactionSink for TransactionApiClient {
    async fn persist(&self, record: &TransactionRecord) -> Result<StoredTransaction, SinkError> {
        let url = format!("{}/api/transactions", self.base_url);
        debug!("POST {} ({})", url, record.tx_hash);
        let response = self.client.post(&url).json(record).send().await?;
        Self::parse(response).await
    }

    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> Result<StoredTransaction, SinkError> {
        let url = format!("{}/api/transactions/{}", self.base_url, tx_hash);
        debug!("PATCH {} -> {}", url, status);
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "status": status, "gasFee": gas_fee }))
            .send()
            .await?;
        Self::parse(response).await
    }
}

/// Sink writing straight into the local transaction store
///
/// Used when the server hosts the persistence API itself.
pub struct StoreSink {
    store: Arc<dyn TransactionStore>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl TransactionSink for StoreSink {
    async fn persist(&self, record: &TransactionRecord) -> Result<StoredTransaction, SinkError> {
        record.validate().map_err(|e| SinkError::Rejected {
            status: 400,
            body: e.to_string(),
        })?;
        self.store
            .insert(record.clone())
            .await
            .map(|outcome| outcome.into_inner())
            .map_err(|e| SinkError::Unreachable(e.to_string()))
    }

    async fn update_status(
        &self,
        tx_hash: &str,
        status: TransactionStatus,
        gas_fee: Option<String>,
    ) -> Result<StoredTransaction, SinkError> {
        match self.store.update_status(tx_hash, status, gas_fee).await {
            Ok(Some(stored)) => Ok(stored),
            Ok(None) => Err(SinkError::Rejected {
                status: 404,
                body: format!("transaction {} not found", tx_hash),
            }),
            Err(e) => Err(SinkError::Unreachable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryTransactionStore;
    use farm_types::TransactionType;

    #[tokio::test]
    async fn test_store_sink_rejects_invalid_record() {
        let sink = StoreSink::new(Arc::new(MemoryTransactionStore::new()));
        let record = TransactionRecord::pending(TransactionType::Stake, "0x1234", "BNB", "LP");

        let err = sink.persist(&record).await.unwrap_err();
        assert!(matches!(err, SinkError::Rejected { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_store_sink_update_unknown_is_404() {
        let sink = StoreSink::new(Arc::new(MemoryTransactionStore::new()));
        let err = sink
            .update_status(&format!("0x{}", "0".repeat(64)), TransactionStatus::Failed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_reported() {
        // nothing listens on port 9 locally
        let client = TransactionApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let record = TransactionRecord::pending(TransactionType::Harvest, format!("0x{}", "4".repeat(64)), "P", "CAKE");
        let err = client.persist(&record).await.unwrap_err();
        assert!(matches!(err, SinkError::Unreachable(_)));
    }
}
