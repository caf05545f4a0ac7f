//! Best-effort artifact verification and the bytecode drift pass that
//! compares compiled artifacts against what is actually deployed.

use crate::artifacts::ArtifactStore;
use crate::bytecode::is_equivalent;
use crate::chain::ChainClient;
use crate::config::VerificationConfig;
use crate::error::{Result, RolloutError};
use crate::ledger::ReleaseEntry;
use crate::types::Component;
use alloy_primitives::{Address, Bytes};
use serde::Serialize;
use serde_json::json;

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The service already has this source-to-bytecode mapping.
    AlreadyVerified,
    /// The source payload exceeded the service's size limit.
    PayloadTooLarge,
}

/// Client for the source verification service. Registration is best-effort:
/// callers log `VerificationFailed` as a warning and keep going.
pub struct Verifier {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl Verifier {
    pub fn new(config: &VerificationConfig) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn verify(
        &self,
        address: Address,
        source_ref: &str,
        constructor_args: &Bytes,
    ) -> Result<VerifyOutcome> {
        let response = self
            .http
            .post(format!("{}/api/verify", self.base_url))
            .json(&json!({
                "address": address,
                "sourceRef": source_ref,
                "constructorArgs": constructor_args,
            }))
            .send()
            .map_err(|e| RolloutError::VerificationFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(VerifyOutcome::Verified);
        }

        let body = response.text().unwrap_or_default();
        let lower = body.to_lowercase();
        if status.as_u16() == 409 || lower.contains("already verified") {
            return Ok(VerifyOutcome::AlreadyVerified);
        }
        if status.as_u16() == 413 || lower.contains("payload too large") {
            return Ok(VerifyOutcome::PayloadTooLarge);
        }
        Err(RolloutError::VerificationFailed(format!(
            "{status}: {body}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Bytecode drift pass
// ---------------------------------------------------------------------------

/// One component whose deployed code does not match its compiled artifact.
/// Reported as a diagnostic list at the end of a verification pass, never as
/// an exception.
#[derive(Debug, Clone, Serialize)]
pub struct BytecodeMismatch {
    pub component: Component,
    pub address: Address,
}

/// Compare every component recorded in `entry` that has a compiled artifact
/// against the code deployed at its address(es). Components without an
/// artifact on disk are skipped; chain read failures are real errors.
pub fn check_release(
    entry: &ReleaseEntry,
    artifacts: &ArtifactStore,
    chain: &dyn ChainClient,
) -> Result<Vec<BytecodeMismatch>> {
    let mut mismatches = Vec::new();

    for (&component, value) in &entry.components {
        if !artifacts.has(component) {
            tracing::debug!(%component, "no artifact, skipping drift check");
            continue;
        }
        let artifact = artifacts.load(component)?;

        let addresses: Vec<Address> = match value.as_many() {
            Some(many) => many.to_vec(),
            None => value.as_one().into_iter().collect(),
        };

        for address in addresses {
            let code = chain.get_code(address)?;
            if !is_equivalent(&artifact.bytecode, &code) {
                tracing::warn!(%component, %address, "deployed code differs from artifact");
                mismatches.push(BytecodeMismatch { component, address });
            }
        }
    }

    Ok(mismatches)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ComponentValue, Network};
    use alloy_primitives::B256;
    use mockito::Server;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct MapChain {
        code: HashMap<Address, Bytes>,
    }

    impl ChainClient for MapChain {
        fn get_code(&self, address: Address) -> Result<Bytes> {
            Ok(self.code.get(&address).cloned().unwrap_or_default())
        }

        fn deploy(&self, _creation: &Bytes) -> Result<Address> {
            unreachable!("drift pass never deploys")
        }

        fn send_transaction(&self, _to: Address, _data: &Bytes) -> Result<B256> {
            unreachable!("drift pass never writes")
        }
    }

    fn verifier_for(server: &Server) -> Verifier {
        Verifier::new(&VerificationConfig {
            base_url: server.url(),
        })
    }

    #[test]
    fn verified_on_success() {
        let mut server = Server::new();
        server.mock("POST", "/api/verify").with_status(200).create();
        let outcome = verifier_for(&server)
            .verify(Address::repeat_byte(0x01), "src/Oracle.sol:Oracle", &Bytes::new())
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::Verified);
    }

    #[test]
    fn already_verified_is_tolerated() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/verify")
            .with_status(400)
            .with_body("contract is already verified")
            .create();
        let outcome = verifier_for(&server)
            .verify(Address::repeat_byte(0x01), "src/Oracle.sol:Oracle", &Bytes::new())
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::AlreadyVerified);
    }

    #[test]
    fn payload_too_large_is_tolerated() {
        let mut server = Server::new();
        server.mock("POST", "/api/verify").with_status(413).create();
        let outcome = verifier_for(&server)
            .verify(Address::repeat_byte(0x01), "src/Oracle.sol:Oracle", &Bytes::new())
            .unwrap();
        assert_eq!(outcome, VerifyOutcome::PayloadTooLarge);
    }

    #[test]
    fn other_failures_are_errors() {
        let mut server = Server::new();
        server
            .mock("POST", "/api/verify")
            .with_status(500)
            .with_body("compiler mismatch")
            .create();
        let err = verifier_for(&server)
            .verify(Address::repeat_byte(0x01), "src/Oracle.sol:Oracle", &Bytes::new())
            .unwrap_err();
        assert!(matches!(err, RolloutError::VerificationFailed(_)));
    }

    #[test]
    fn drift_pass_flags_only_mismatches() {
        let dir = TempDir::new().unwrap();
        // The oracle artifact's creation bytecode embeds the runtime bytes
        // verbatim, so identical deployed code passes the equivalence check.
        let runtime: Vec<u8> = (0..200u16).map(|i| i as u8).collect();
        let mut creation = vec![0xfe; 16];
        creation.extend_from_slice(&runtime);
        std::fs::write(
            dir.path().join("oracle.json"),
            format!(
                r#"{{"bytecode":"0x{}","deployedBytecode":"0x{}"}}"#,
                hex::encode(&creation),
                hex::encode(&runtime)
            ),
        )
        .unwrap();

        let good = Address::repeat_byte(0x01);
        let drifted = Address::repeat_byte(0x02);
        let mut code = HashMap::new();
        // get_code returns runtime with a 32-byte prefix the checker skips.
        let mut deployed = vec![0xab; 32];
        deployed.extend_from_slice(&runtime);
        code.insert(good, Bytes::from(deployed));
        code.insert(drifted, Bytes::from(vec![0x11; 260]));
        let chain = MapChain { code };

        let mut entry = ReleaseEntry::new(Network {
            id: 1,
            name: "mainnet".to_string(),
        });
        entry.set_component(Component::Oracle, good);
        // No artifact for the pool: skipped, not flagged.
        entry.set_component(Component::Pool, Address::repeat_byte(0x03));

        let store = ArtifactStore::new(dir.path());
        let mismatches = check_release(&entry, &store, &chain).unwrap();
        assert!(mismatches.is_empty());

        entry.set_component(Component::Oracle, ComponentValue::Many(vec![good, drifted]));
        let mismatches = check_release(&entry, &store, &chain).unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].address, drifted);
    }
}
