//! JSON-RPC wallet sender.
//!
//! Talks to a node or wallet that manages the buyer's account itself
//! (`eth_sendTransaction` signs on the far side). Confirmation is a plain
//! receipt poll; the caller bounds how long it runs.

use alloy_primitives::{Address, TxHash};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChainError, Confirmation, ContractCall, TransactionHandle, TransactionSender};
use crate::config::{DEFAULT_RECEIPT_POLL_INTERVAL, USER_REJECTED_REQUEST_CODE};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

/// [`TransactionSender`] over HTTP JSON-RPC with a node-managed account.
#[derive(Debug)]
pub struct JsonRpcWallet {
    client: Client,
    url: String,
    from: Address,
    poll_interval: Duration,
    next_id: AtomicU64,
}

impl JsonRpcWallet {
    pub fn new(url: impl Into<String>, from: Address) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            from,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn from_address(&self) -> Address {
        self.from
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response: RpcResponse = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| ChainError::Rpc(format!("{method}: malformed response: {e}")))?;

        if let Some(err) = response.error {
            if err.code == USER_REJECTED_REQUEST_CODE {
                return Err(ChainError::Rejected(err.message));
            }
            return Err(ChainError::Rpc(format!("{method}: {} (code {})", err.message, err.code)));
        }

        Ok(response.result.unwrap_or(Value::Null))
    }
}

fn parse_quantity(hex_str: &str) -> Option<u64> {
    u64::from_str_radix(hex_str.trim_start_matches("0x"), 16).ok()
}

#[async_trait]
impl TransactionSender for JsonRpcWallet {
    async fn send(&self, call: ContractCall) -> Result<TransactionHandle, ChainError> {
        let mut tx = json!({
            "from": self.from,
            "to": call.to,
            "data": call.data,
        });
        if let Some(gas) = call.gas_limit {
            tx["gas"] = Value::String(format!("{gas:#x}"));
        }

        let result = self.call("eth_sendTransaction", json!([tx])).await?;
        let hash: TxHash = serde_json::from_value(result)
            .map_err(|e| ChainError::Rpc(format!("eth_sendTransaction: bad hash: {e}")))?;

        debug!(tx_hash = %hash, to = %call.to, "transaction broadcast");
        Ok(TransactionHandle::new(hash))
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Confirmation, ChainError> {
        loop {
            let result = self
                .call("eth_getTransactionReceipt", json!([handle.hash]))
                .await?;

            if result.is_null() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let receipt: Receipt = serde_json::from_value(result)
                .map_err(|e| ChainError::Rpc(format!("malformed receipt: {e}")))?;
            let block_number = receipt.block_number.as_deref().and_then(parse_quantity);

            return match receipt.status.as_deref().and_then(parse_quantity) {
                Some(1) => Ok(Confirmation {
                    hash: handle.hash,
                    block_number,
                }),
                Some(_) => Err(ChainError::Reverted { hash: handle.hash }),
                None => {
                    // Pre-Byzantium receipts carry no status field.
                    warn!(tx_hash = %handle, "receipt without status, treating as success");
                    Ok(Confirmation {
                        hash: handle.hash,
                        block_number,
                    })
                }
            };
        }
    }
}
