//! Turns a desired privileged state change into either a direct transaction
//! or a proposal queued with the multisig custody service.

use crate::chain::ChainClient;
use crate::config::RunConfig;
use crate::custody::{CustodyClient, NonceAllocator, NonceOptions};
use crate::envelope::{sign_tx_hash, ProposalEnvelope};
use crate::error::{Result, RolloutError};
use crate::retry::{with_retry, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
use alloy_primitives::{Address, Bytes, B256};
use serde::Serialize;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ProposalRequest / ProposalResult
// ---------------------------------------------------------------------------

/// A desired state-changing call, constructed by a step and consumed
/// immediately by the queue.
#[derive(Debug, Clone)]
pub struct ProposalRequest {
    pub target: Address,
    pub data: Bytes,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProposalResult {
    /// Logged only; nothing external was contacted.
    DryRun,
    /// Sent directly from the single signer (non-multisig networks).
    Executed { tx_hash: B256 },
    /// Queued with the custody service, awaiting signatures.
    Queued { nonce: u64, tx_hash: B256 },
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// One line of the per-run audit trail, dumped for operator review after a
/// dry run and on abort.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub sequence: u32,
    /// None in dry-run and direct-execution modes, where no multisig nonce
    /// exists.
    pub nonce: Option<u64>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// ProposalQueue
// ---------------------------------------------------------------------------

/// Owns the run-scoped nonce cursor: the allocator is consulted once per run
/// (unless the operator supplied an explicit nonce) and every subsequent
/// proposal takes `previous + 1`.
pub struct ProposalQueue {
    execute: bool,
    chain_id: u64,
    sender: Address,
    custody: Option<CustodyHandle>,
    nonce_options: NonceOptions,
    next_nonce: Option<u64>,
    audit: Vec<AuditEntry>,
    attempts: u32,
    delay: Duration,
}

struct CustodyHandle {
    client: CustodyClient,
    signer_key: Option<String>,
}

impl ProposalQueue {
    pub fn new(cfg: &RunConfig, nonce_options: NonceOptions) -> Self {
        let custody = cfg.custody.as_ref().map(|c| CustodyHandle {
            client: CustodyClient::new(c),
            signer_key: c.signer_key.clone(),
        });
        Self {
            execute: cfg.execute,
            chain_id: cfg.network.id,
            sender: cfg.deployer,
            custody,
            nonce_options,
            next_nonce: None,
            audit: Vec::new(),
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }

    /// Override retry timing (tests use zero delay).
    pub fn with_timing(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts;
        self.delay = delay;
        self
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn propose(
        &mut self,
        request: ProposalRequest,
        chain: &dyn ChainClient,
    ) -> Result<ProposalResult> {
        if !self.execute {
            tracing::info!(
                target = %request.target,
                description = %request.description,
                "dry-run: proposal not submitted"
            );
            self.record(None, &request.description);
            return Ok(ProposalResult::DryRun);
        }

        match &self.custody {
            None => {
                let tx_hash = chain.send_transaction(request.target, &request.data)?;
                tracing::info!(%tx_hash, description = %request.description, "executed directly");
                self.record(None, &request.description);
                Ok(ProposalResult::Executed { tx_hash })
            }
            Some(custody) => {
                let signer_key = custody.signer_key.clone().ok_or_else(|| {
                    RolloutError::MissingConfig("custody.signer_key".to_string())
                })?;

                let nonce = match self.next_nonce {
                    Some(n) => n,
                    None => NonceAllocator::resolve_with(
                        &custody.client,
                        &self.nonce_options,
                        self.attempts,
                        self.delay,
                    )?,
                };

                let envelope = ProposalEnvelope::new(request.target, request.data.clone(), nonce);
                let tx_hash = envelope.tx_hash(self.chain_id, custody.client.account());
                let signature = sign_tx_hash(&signer_key, tx_hash)?;

                with_retry("custody submit", self.attempts, self.delay, || {
                    custody
                        .client
                        .submit_proposal(&envelope, tx_hash, self.sender, &signature)
                })
                .map_err(|e| match e {
                    RolloutError::RetriesExhausted { .. } => {
                        RolloutError::CustodyUnavailable(e.to_string())
                    }
                    other => other,
                })?;

                self.next_nonce = Some(nonce + 1);
                tracing::info!(nonce, %tx_hash, description = %request.description, "proposal queued");
                self.record(Some(nonce), &request.description);
                Ok(ProposalResult::Queued { nonce, tx_hash })
            }
        }
    }

    fn record(&mut self, nonce: Option<u64>, description: &str) {
        self.audit.push(AuditEntry {
            sequence: self.audit.len() as u32 + 1,
            nonce,
            description: description.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CustodyConfig, RunConfig};
    use crate::types::Network;
    use mockito::{Matcher, Server};
    use std::cell::RefCell;

    const TEST_KEY: &str = "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    struct FakeChain {
        sent: RefCell<Vec<(Address, Bytes)>>,
    }

    impl FakeChain {
        fn new() -> Self {
            Self {
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChainClient for FakeChain {
        fn get_code(&self, _address: Address) -> Result<Bytes> {
            Ok(Bytes::new())
        }

        fn deploy(&self, _creation: &Bytes) -> Result<Address> {
            Ok(Address::repeat_byte(0xdd))
        }

        fn send_transaction(&self, to: Address, data: &Bytes) -> Result<B256> {
            self.sent.borrow_mut().push((to, data.clone()));
            Ok(B256::repeat_byte(0xee))
        }
    }

    fn config(execute: bool, custody: Option<CustodyConfig>) -> RunConfig {
        RunConfig {
            network: Network {
                id: 1,
                name: "mainnet".to_string(),
            },
            rpc_url: "http://localhost:8545".to_string(),
            ledger_path: "ledger.json".into(),
            artifacts_dir: "artifacts".into(),
            deployer: Address::repeat_byte(0x0a),
            execute,
            custody,
            verification: None,
            address_book: Default::default(),
        }
    }

    fn custody_config(server: &Server, signer: bool) -> CustodyConfig {
        CustodyConfig {
            base_url: server.url(),
            account: Address::repeat_byte(0xaa),
            signer_key: signer.then(|| TEST_KEY.to_string()),
        }
    }

    fn request(description: &str) -> ProposalRequest {
        ProposalRequest {
            target: Address::repeat_byte(0x42),
            data: Bytes::from(vec![0x01, 0x02]),
            description: description.to_string(),
        }
    }

    fn safe_path(suffix: &str) -> String {
        format!(
            "/api/v1/safes/{}/{suffix}",
            Address::repeat_byte(0xaa)
        )
    }

    fn no_delay() -> Duration {
        Duration::from_millis(0)
    }

    #[test]
    fn dry_run_contacts_nothing_but_keeps_audit() {
        let mut server = Server::new();
        let info = server
            .mock("GET", safe_path("").as_str())
            .expect(0)
            .create();
        let submit = server
            .mock("POST", safe_path("multisig-transactions/").as_str())
            .expect(0)
            .create();

        let cfg = config(false, Some(custody_config(&server, true)));
        let mut queue = ProposalQueue::new(&cfg, NonceOptions::default());
        let chain = FakeChain::new();

        let a = queue.propose(request("set guardian"), &chain).unwrap();
        let b = queue.propose(request("transfer ownership"), &chain).unwrap();
        assert_eq!(a, ProposalResult::DryRun);
        assert_eq!(b, ProposalResult::DryRun);
        assert!(chain.sent.borrow().is_empty());

        let audit = queue.audit();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[0].sequence, 1);
        assert_eq!(audit[0].nonce, None);
        assert_eq!(audit[1].description, "transfer ownership");

        info.assert();
        submit.assert();
    }

    #[test]
    fn direct_execution_without_custody() {
        let cfg = config(true, None);
        let mut queue = ProposalQueue::new(&cfg, NonceOptions::default());
        let chain = FakeChain::new();

        let result = queue.propose(request("set guardian"), &chain).unwrap();
        assert!(matches!(result, ProposalResult::Executed { .. }));
        assert_eq!(chain.sent.borrow().len(), 1);
        assert_eq!(chain.sent.borrow()[0].0, Address::repeat_byte(0x42));
    }

    #[test]
    fn nonces_are_gap_free_and_allocator_consulted_once() {
        let mut server = Server::new();
        let info = server
            .mock("GET", safe_path("").as_str())
            .with_body(r#"{"nonce": 5}"#)
            .expect(1)
            .create();
        server
            .mock("GET", safe_path("multisig-transactions/").as_str())
            .match_query(Matcher::Any)
            .with_body(r#"{"results": []}"#)
            .expect(1)
            .create();
        let submit = server
            .mock("POST", safe_path("multisig-transactions/").as_str())
            .with_status(201)
            .expect(3)
            .create();

        let cfg = config(true, Some(custody_config(&server, true)));
        let mut queue = ProposalQueue::new(&cfg, NonceOptions::default()).with_timing(1, no_delay());
        let chain = FakeChain::new();

        let mut nonces = Vec::new();
        for desc in ["a", "b", "c"] {
            match queue.propose(request(desc), &chain).unwrap() {
                ProposalResult::Queued { nonce, .. } => nonces.push(nonce),
                other => panic!("unexpected result: {other:?}"),
            }
        }
        assert_eq!(nonces, vec![5, 6, 7]);
        assert!(chain.sent.borrow().is_empty(), "custody mode never sends directly");

        let audit_nonces: Vec<_> = queue.audit().iter().map(|e| e.nonce).collect();
        assert_eq!(audit_nonces, vec![Some(5), Some(6), Some(7)]);

        info.assert();
        submit.assert();
    }

    #[test]
    fn explicit_nonce_skips_allocator() {
        let mut server = Server::new();
        let info = server
            .mock("GET", safe_path("").as_str())
            .expect(0)
            .create();
        server
            .mock("POST", safe_path("multisig-transactions/").as_str())
            .with_status(201)
            .create();

        let cfg = config(true, Some(custody_config(&server, true)));
        let options = NonceOptions {
            explicit: Some(42),
            restart_from_confirmed: false,
        };
        let mut queue = ProposalQueue::new(&cfg, options).with_timing(1, no_delay());
        let chain = FakeChain::new();

        match queue.propose(request("resume"), &chain).unwrap() {
            ProposalResult::Queued { nonce, .. } => assert_eq!(nonce, 42),
            other => panic!("unexpected result: {other:?}"),
        }
        info.assert();
    }

    #[test]
    fn missing_signer_key_is_a_config_error() {
        let server = Server::new();
        let cfg = config(true, Some(custody_config(&server, false)));
        let mut queue = ProposalQueue::new(&cfg, NonceOptions::default()).with_timing(1, no_delay());
        let chain = FakeChain::new();

        let err = queue.propose(request("set guardian"), &chain).unwrap_err();
        assert!(matches!(err, RolloutError::MissingConfig(_)));
    }

    #[test]
    fn submit_failure_surfaces_as_custody_unavailable() {
        let mut server = Server::new();
        server
            .mock("GET", safe_path("").as_str())
            .with_body(r#"{"nonce": 5}"#)
            .create();
        server
            .mock("GET", safe_path("multisig-transactions/").as_str())
            .match_query(Matcher::Any)
            .with_body(r#"{"results": []}"#)
            .create();
        let submit = server
            .mock("POST", safe_path("multisig-transactions/").as_str())
            .with_status(503)
            .expect(2)
            .create();

        let cfg = config(true, Some(custody_config(&server, true)));
        let mut queue = ProposalQueue::new(&cfg, NonceOptions::default()).with_timing(2, no_delay());
        let chain = FakeChain::new();

        let err = queue.propose(request("set guardian"), &chain).unwrap_err();
        assert!(matches!(err, RolloutError::CustodyUnavailable(_)));
        submit.assert();
    }
}
