//! JSON-RPC client for the staking contract gateway
//!
//! The gateway exposes each contract method under its own name and signs
//! writes with the operator wallet, so reads and writes share one call path.

use async_trait::async_trait;
use farm_types::{dec_u128::parse_quantity, PoolInfo, UserInfo};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::core::{ChainError, ChainResult, StakingContract, TxReceipt};

/// Staking contract reached through a JSON-RPC gateway
pub struct RpcStakingContract {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

/// RPC response wrapper
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// RPC error structure
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Integers may come back as numbers, decimal strings or hex quantities
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Quantity {
    Num(u64),
    Str(String),
}

impl Quantity {
    fn into_u128(self) -> ChainResult<u128> {
        match self {
            Quantity::Num(n) => Ok(n as u128),
            Quantity::Str(s) => parse_quantity(&s).map_err(ChainError::invalid_response),
        }
    }
}

impl RpcStakingContract {
    pub fn new(url: impl Into<String>, timeout: Duration) -> ChainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Send a JSON-RPC request and decode its envelope
    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<RpcResponse<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });

        debug!("RPC call: {} with params: {}", method, params);

        let response = self.client.post(&self.url).json(&request_body).send().await?;

        if !response.status().is_success() {
            return Err(ChainError::network(format!(
                "gateway returned HTTP {} for {}",
                response.status(),
                method
            )));
        }

        Ok(response.json().await?)
    }

    /// Make a JSON-RPC call
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let rpc_response: RpcResponse<T> = self.request(method, params).await?;

        if let Some(error) = rpc_response.error {
            return Err(ChainError::from_rpc(error.code, &error.message));
        }

        rpc_response
            .result
            .ok_or_else(|| ChainError::invalid_response(format!("no result in {} response", method)))
    }

    async fn call_quantity(&self, method: &str, params: Value) -> ChainResult<u128> {
        let quantity: Quantity = self.call(method, params).await?;
        quantity.into_u128()
    }

    /// Submit a write and return its transaction hash
    async fn send(&self, method: &str, params: Value) -> ChainResult<String> {
        let hash: String = self.call(method, params).await?;
        if !farm_types::is_prefixed_hex(&hash, farm_types::TX_HASH_HEX_LEN) {
            return Err(ChainError::invalid_response(format!(
                "{} returned malformed transaction hash '{}'",
                method, hash
            )));
        }
        Ok(hash)
    }
}

#[async_trait]
impl StakingContract for RpcStakingContract {
    async fn pool_length(&self) -> ChainResult<u64> {
        let length = self.call_quantity("poolLength", json!([])).await?;
        u64::try_from(length).map_err(|_| ChainError::invalid_response("pool length out of range"))
    }

    async fn get_pool_info(&self, pool_id: u64) -> ChainResult<PoolInfo> {
        self.call("getPoolInfo", json!([pool_id])).await
    }

    async fn user_info(&self, pool_id: u64, user: &str) -> ChainResult<UserInfo> {
        self.call("userInfo", json!([pool_id, user])).await
    }

    async fn pending_reward(&self, pool_id: u64, user: &str) -> ChainResult<u128> {
        self.call_quantity("pendingReward", json!([pool_id, user])).await
    }

    async fn total_alloc_point(&self) -> ChainResult<u128> {
        self.call_quantity("totalAllocPoint", json!([])).await
    }

    async fn add_pool(&self, alloc_point: u128, lp_token: &str, with_update: bool) -> ChainResult<String> {
        self.send("addPool", json!([alloc_point.to_string(), lp_token, with_update])).await
    }

    async fn update_pool(
        &self,
        pool_id: u64,
        alloc_point: u128,
        is_active: bool,
        with_update: bool,
    ) -> ChainResult<String> {
        self.send(
            "updatePool",
            json!([pool_id, alloc_point.to_string(), is_active, with_update]),
        )
        .await
    }

    async fn emergency_withdraw(&self, pool_id: u64) -> ChainResult<String> {
        self.send("emergencyWithdraw", json!([pool_id])).await
    }

    async fn deposit(&self, pool_id: u64, amount: u128) -> ChainResult<String> {
        self.send("deposit", json!([pool_id, amount.to_string()])).await
    }

    async fn withdraw(&self, pool_id: u64, amount: u128) -> ChainResult<String> {
        self.send("withdraw", json!([pool_id, amount.to_string()])).await
    }

    async fn claim_reward(&self, pool_id: u64) -> ChainResult<String> {
        self.send("claimReward", json!([pool_id])).await
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> ChainResult<Option<TxReceipt>> {
        // A null result is the normal "not mined yet" answer, so it bypasses `call`
        let response: RpcResponse<TxReceipt> = self.request("getTransactionReceipt", json!([tx_hash])).await?;

        if let Some(error) = response.error {
            return Err(ChainError::from_rpc(error.code, &error.message));
        }
        Ok(response.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ChainErrorKind;
    use axum::{routing::post, Json, Router};

    /// Local gateway answering every call through `answer`
    async fn gateway(answer: fn(&str, &Value) -> Value) -> RpcStakingContract {
        let app = Router::new().route(
            "/",
            post(move |Json(request): Json<Value>| async move {
                let method = request["method"].as_str().unwrap_or_default().to_string();
                let mut body = answer(&method, &request["params"]);
                body["jsonrpc"] = json!("2.0");
                body["id"] = request["id"].clone();
                Json(body)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        RpcStakingContract::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_reads_decode_quantities() {
        let contract = gateway(|method, params| {
            let active = params[0] != json!(2);
            match method {
                "poolLength" => json!({ "result": "0x3" }),
                "totalAllocPoint" => json!({ "result": 250 }),
                "getPoolInfo" => json!({ "result": {
                    "lpToken": "0x0eD7e52944161450477ee417DE9Cd3a859b14fD0",
                    "allocPoint": "100",
                    "lastRewardBlock": 12,
                    "accRewardPerShare": "0",
                    "totalStaked": "340282366920938463463374607431768211455",
                    "isActive": active,
                }}),
                _ => json!({ "error": { "code": -32601, "message": "method not found" } }),
            }
        })
        .await;

        assert_eq!(contract.pool_length().await.unwrap(), 3);
        assert_eq!(contract.total_alloc_point().await.unwrap(), 250);
        let info = contract.get_pool_info(2).await.unwrap();
        assert_eq!(info.total_staked, u128::MAX);
        assert!(!info.is_active);
    }

    #[tokio::test]
    async fn test_write_errors_are_classified() {
        let contract = gateway(|method, _| match method {
            "deposit" => json!({ "error": { "code": 4001, "message": "User rejected the request." } }),
            "withdraw" => json!({ "error": { "code": 3, "message": "execution reverted: withdraw: not good" } }),
            "claimReward" => json!({ "result": "0x1234" }),
            _ => json!({ "result": format!("0x{}", "ab".repeat(32)) }),
        })
        .await;

        let err = contract.deposit(0, 1).await.unwrap_err();
        assert_eq!(err.kind, ChainErrorKind::UserRejected);
        let err = contract.withdraw(0, 1).await.unwrap_err();
        assert_eq!(err.kind, ChainErrorKind::ContractReverted);
        let err = contract.claim_reward(0).await.unwrap_err();
        assert_eq!(err.kind, ChainErrorKind::InvalidResponse);
        assert_eq!(contract.emergency_withdraw(1).await.unwrap(), format!("0x{}", "ab".repeat(32)));
    }

    #[tokio::test]
    async fn test_missing_receipt_is_none() {
        let contract = gateway(|_, params| {
            if params[0] == json!("0x01") {
                json!({ "result": null })
            } else {
                json!({ "result": {
                    "txHash": params[0],
                    "status": true,
                    "blockNumber": "0x10",
                    "gasUsed": "21000",
                    "effectiveGasPrice": "1000000000",
                }})
            }
        })
        .await;

        assert!(contract.transaction_receipt("0x01").await.unwrap().is_none());
        let receipt = contract.transaction_receipt("0x02").await.unwrap().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_fee(18), "0.000021");
    }

    #[tokio::test]
    async fn test_receipt_on_gateway_outage_is_network_error() {
        let app = Router::new().route(
            "/",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "upstream down") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let contract = RpcStakingContract::new(format!("http://{}/", addr), Duration::from_secs(5)).unwrap();

        let err = contract.transaction_receipt("0x01").await.unwrap_err();

        assert_eq!(err.kind, ChainErrorKind::Network);
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_network_error() {
        let contract = RpcStakingContract::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = contract.pool_length().await.unwrap_err();
        assert_eq!(err.kind, ChainErrorKind::Network);
    }
}
