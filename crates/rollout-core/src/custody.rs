//! Client for the multisig custody service and the nonce-allocation protocol
//! layered on top of its observable state.

use crate::config::CustodyConfig;
use crate::envelope::ProposalEnvelope;
use crate::error::{Result, RolloutError};
use crate::retry::{with_retry, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
use alloy_primitives::{Address, Bytes, B256};
use serde::Deserialize;
use std::time::Duration;

/// Queue entries of this type are transactions awaiting execution; other
/// entry types (module transactions, incoming transfers) never occupy a
/// multisig nonce.
const EXECUTABLE_TX_TYPE: &str = "MULTISIG_TRANSACTION";

// ---------------------------------------------------------------------------
// Service payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AccountInfo {
    /// Last confirmed on-chain nonce for the controlling account.
    nonce: u64,
}

#[derive(Debug, Deserialize)]
struct PendingPage {
    results: Vec<PendingTx>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTx {
    pub nonce: u64,
    pub tx_type: String,
}

impl PendingTx {
    pub fn is_executable(&self) -> bool {
        self.tx_type == EXECUTABLE_TX_TYPE
    }
}

// ---------------------------------------------------------------------------
// CustodyClient
// ---------------------------------------------------------------------------

pub struct CustodyClient {
    http: reqwest::blocking::Client,
    base_url: String,
    account: Address,
}

impl CustodyClient {
    pub fn new(config: &CustodyConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            account: config.account,
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    fn account_url(&self, suffix: &str) -> String {
        format!("{}/api/v1/safes/{}/{suffix}", self.base_url, self.account)
    }

    /// Last confirmed on-chain nonce for the controlling account.
    pub fn confirmed_nonce(&self) -> Result<u64> {
        let info: AccountInfo = self
            .http
            .get(self.account_url(""))
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| RolloutError::CustodyUnavailable(e.to_string()))?;
        Ok(info.nonce)
    }

    /// Not-yet-executed queue entries, most recent first.
    pub fn pending_transactions(&self) -> Result<Vec<PendingTx>> {
        let page: PendingPage = self
            .http
            .get(self.account_url("multisig-transactions/"))
            .query(&[("executed", "false"), ("ordering", "-nonce")])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| RolloutError::CustodyUnavailable(e.to_string()))?;
        Ok(page.results)
    }

    /// Submit a signed envelope. The service de-duplicates by content hash,
    /// so retried submissions are safe.
    pub fn submit_proposal(
        &self,
        envelope: &ProposalEnvelope,
        tx_hash: B256,
        sender: Address,
        signature: &Bytes,
    ) -> Result<()> {
        let mut body = serde_json::to_value(envelope)?;
        let obj = body.as_object_mut().expect("envelope is an object");
        obj.insert("contractTransactionHash".into(), serde_json::json!(tx_hash));
        obj.insert("sender".into(), serde_json::json!(sender));
        obj.insert("signature".into(), serde_json::json!(signature));

        self.http
            .post(self.account_url("multisig-transactions/"))
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| RolloutError::CustodyUnavailable(e.to_string()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NonceAllocator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct NonceOptions {
    /// Operator override. Highest priority, used to resume a stuck run at a
    /// known point.
    pub explicit: Option<u64>,
    /// Discard the not-yet-executed pending queue and restart from the last
    /// confirmed nonce.
    pub restart_from_confirmed: bool,
}

pub struct NonceAllocator;

impl NonceAllocator {
    /// Resolve the next free nonce, in priority order: explicit override,
    /// confirmed nonce (when restarting), newest executable pending entry
    /// plus one, confirmed nonce as the fallback. Proposals must not collide
    /// with transactions already awaiting signatures.
    pub fn resolve(client: &CustodyClient, options: &NonceOptions) -> Result<u64> {
        Self::resolve_with(client, options, DEFAULT_ATTEMPTS, DEFAULT_DELAY)
    }

    pub fn resolve_with(
        client: &CustodyClient,
        options: &NonceOptions,
        attempts: u32,
        delay: Duration,
    ) -> Result<u64> {
        if let Some(nonce) = options.explicit {
            return Ok(nonce);
        }

        let confirmed = with_retry("custody confirmed nonce", attempts, delay, || {
            client.confirmed_nonce()
        })
        .map_err(exhausted_to_unavailable)?;

        if options.restart_from_confirmed {
            return Ok(confirmed);
        }

        let pending = with_retry("custody pending queue", attempts, delay, || {
            client.pending_transactions()
        })
        .map_err(exhausted_to_unavailable)?;

        match pending.iter().find(|tx| tx.is_executable()) {
            Some(newest) => Ok(newest.nonce + 1),
            None => Ok(confirmed),
        }
    }
}

fn exhausted_to_unavailable(err: RolloutError) -> RolloutError {
    match err {
        RolloutError::RetriesExhausted { .. } => RolloutError::CustodyUnavailable(err.to_string()),
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
