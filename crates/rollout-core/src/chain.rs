//! Chain RPC access: reading deployed bytecode, deploying contracts, and the
//! direct-execution path used on non-multisig networks.

use crate::error::{Result, RolloutError};
use crate::retry::with_retry;
use alloy_primitives::{Address, Bytes, B256};
use serde_json::{json, Value};
use std::str::FromStr;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

/// The seam between the pipeline and the chain. Steps and the proposal queue
/// only see this trait; tests substitute an in-memory double.
pub trait ChainClient {
    /// Runtime bytecode stored at `address` (empty for an EOA).
    fn get_code(&self, address: Address) -> Result<Bytes>;

    /// Deploy a contract from its creation bytecode, returning its address.
    fn deploy(&self, creation: &Bytes) -> Result<Address>;

    /// Send a state-changing call from the deployer account.
    fn send_transaction(&self, to: Address, data: &Bytes) -> Result<B256>;
}

// ---------------------------------------------------------------------------
// RpcClient
// ---------------------------------------------------------------------------

/// JSON-RPC implementation backed by a node that signs for the deployer
/// account (`eth_sendTransaction`).
pub struct RpcClient {
    http: reqwest::blocking::Client,
    url: String,
    deployer: Address,
    receipt_attempts: u32,
    receipt_delay: Duration,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, deployer: Address) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            url: url.into(),
            deployer,
            receipt_attempts: 30,
            receipt_delay: Duration::from_secs(2),
        }
    }

    #[cfg(test)]
    fn with_receipt_polling(mut self, attempts: u32, delay: Duration) -> Self {
        self.receipt_attempts = attempts;
        self.receipt_delay = delay;
        self
    }

    fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: Value = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| RolloutError::Rpc(format!("{method}: {e}")))?;

        if let Some(err) = response.get("error") {
            return Err(RolloutError::Rpc(format!("{method}: {err}")));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| RolloutError::Rpc(format!("{method}: missing result")))
    }

    fn result_str(value: &Value, method: &str) -> Result<String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RolloutError::Rpc(format!("{method}: non-string result")))
    }
}

impl ChainClient for RpcClient {
    fn get_code(&self, address: Address) -> Result<Bytes> {
        let result = self.call("eth_getCode", json!([address, "latest"]))?;
        let hex = Self::result_str(&result, "eth_getCode")?;
        Bytes::from_str(&hex).map_err(|e| RolloutError::Rpc(format!("eth_getCode: {e}")))
    }

    fn deploy(&self, creation: &Bytes) -> Result<Address> {
        let result = self.call(
            "eth_sendTransaction",
            json!([{ "from": self.deployer, "data": creation }]),
        )?;
        let tx_hash = Self::result_str(&result, "eth_sendTransaction")?;

        // The deployment address only exists once the transaction is mined.
        let receipt = with_retry(
            "deployment receipt",
            self.receipt_attempts,
            self.receipt_delay,
            || {
                let receipt = self.call("eth_getTransactionReceipt", json!([tx_hash]))?;
                if receipt.is_null() {
                    return Err(RolloutError::Rpc("receipt not yet available".into()));
                }
                Ok(receipt)
            },
        )?;

        let address = receipt
            .get("contractAddress")
            .and_then(Value::as_str)
            .ok_or_else(|| RolloutError::Rpc("receipt missing contractAddress".into()))?;
        Address::from_str(address).map_err(|e| RolloutError::Rpc(e.to_string()))
    }

    fn send_transaction(&self, to: Address, data: &Bytes) -> Result<B256> {
        let result = self.call(
            "eth_sendTransaction",
            json!([{ "from": self.deployer, "to": to, "data": data }]),
        )?;
        let hex = Self::result_str(&result, "eth_sendTransaction")?;
        B256::from_str(&hex).map_err(|e| RolloutError::Rpc(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
