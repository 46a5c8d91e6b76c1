//! Ethereum JSON-RPC chain client over HTTP

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use super::{ChainClient, ChainError, ChainLog, LogFilter, TxRequest};

const RECEIPT_POLL_INTERVAL_MS: u64 = 500;
const RECEIPT_POLL_ATTEMPTS: u32 = 120;

/// Talks to a node that manages (and has unlocked) the accounts it signs for,
/// e.g. a local development node.
pub struct JsonRpcChain {
    rpc_url: String,
    http: Client,
    next_id: AtomicU64,
    receipt_poll_interval: Duration,
    receipt_poll_attempts: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
}

impl JsonRpcChain {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            http: Client::new(),
            next_id: AtomicU64::new(1),
            receipt_poll_interval: Duration::from_millis(RECEIPT_POLL_INTERVAL_MS),
            receipt_poll_attempts: RECEIPT_POLL_ATTEMPTS,
        }
    }

    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_poll_attempts = attempts.max(1);
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(err) = response.get("error") {
            return Err(ChainError::Rpc {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<(), ChainError> {
        for _ in 0..self.receipt_poll_attempts {
            let receipt = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;

            if !receipt.is_null() {
                let status = receipt.get("status").and_then(Value::as_str);
                return match status {
                    Some(raw) if parse_quantity(raw)? == 0 => {
                        Err(ChainError::Reverted(format!("transaction {tx_hash} failed")))
                    }
                    _ => Ok(()),
                };
            }

            sleep(self.receipt_poll_interval).await;
        }

        Err(ChainError::ReceiptTimeout(tx_hash))
    }
}

#[async_trait]
impl ChainClient for JsonRpcChain {
    async fn accounts(&self) -> Result<Vec<Address>, ChainError> {
        let result = self.rpc_call("eth_accounts", json!([])).await?;
        serde_json::from_value(result)
            .map_err(|err| ChainError::InvalidResponse(format!("eth_accounts: {err}")))
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let result = self.rpc_call("eth_blockNumber", json!([])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| ChainError::InvalidResponse("eth_blockNumber: not a string".into()))?;
        parse_quantity(raw)
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ChainError> {
        let mut request = json!({ "to": to, "data": data });
        if let Some(from) = from {
            request["from"] = json!(from);
        }

        let result = self.rpc_call("eth_call", json!([request, "latest"])).await?;
        serde_json::from_value(result)
            .map_err(|err| ChainError::InvalidResponse(format!("eth_call: {err}")))
    }

    async fn send(&self, tx: TxRequest) -> Result<B256, ChainError> {
        let request = json!({
            "from": tx.from,
            "to": tx.to,
            "data": tx.data,
            "value": format!("0x{:x}", tx.value),
            "gas": format!("0x{:x}", tx.gas),
            "gasPrice": format!("0x{:x}", tx.gas_price),
        });

        let result = self.rpc_call("eth_sendTransaction", json!([request])).await?;
        let tx_hash: B256 = serde_json::from_value(result)
            .map_err(|err| ChainError::InvalidResponse(format!("eth_sendTransaction: {err}")))?;

        self.wait_for_receipt(tx_hash).await?;
        Ok(tx_hash)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<ChainLog>, ChainError> {
        let mut request = json!({
            "address": filter.address,
            "fromBlock": format!("0x{:x}", filter.from_block),
            "toBlock": format!("0x{:x}", filter.to_block),
        });
        if let Some(topic0) = filter.topic0 {
            request["topics"] = json!([topic0]);
        }

        let result = self.rpc_call("eth_getLogs", json!([request])).await?;
        let logs: Vec<RpcLog> = serde_json::from_value(result)
            .map_err(|err| ChainError::InvalidResponse(format!("eth_getLogs: {err}")))?;

        logs.into_iter()
            .map(|log| {
                Ok(ChainLog {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    block_number: log.block_number.as_deref().map(parse_quantity).transpose()?.unwrap_or(0),
                    transaction_hash: log.transaction_hash,
                })
            })
            .collect()
    }
}

/// Parses a 0x-prefixed hex quantity.
fn parse_quantity(raw: &str) -> Result<u64, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("quantity without 0x prefix: {raw}")))?;
    if digits.is_empty() {
        return Err(ChainError::InvalidResponse("empty quantity".into()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|err| ChainError::InvalidResponse(format!("bad quantity {raw}: {err}")))
}
