use crate::error::{Result, RolloutError};
use crate::types::Network;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// AddressBook
// ---------------------------------------------------------------------------

/// Externally supplied, read-only addresses of third-party protocols,
/// operator accounts, and feature toggles. Steps read from this; nothing
/// in the core writes to it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddressBook {
    #[serde(default)]
    pub addresses: BTreeMap<String, Address>,
    #[serde(default)]
    pub toggles: BTreeMap<String, bool>,
}

impl AddressBook {
    pub fn get(&self, key: &str) -> Option<Address> {
        self.addresses.get(key).copied()
    }

    pub fn require(&self, key: &str) -> Result<Address> {
        self.get(key)
            .ok_or_else(|| RolloutError::MissingConfig(format!("address_book.{key}")))
    }

    pub fn toggle(&self, key: &str) -> bool {
        self.toggles.get(key).copied().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// CustodyConfig
// ---------------------------------------------------------------------------

/// Connection details for the multisig custody service holding the queue of
/// pending proposals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    pub base_url: String,
    /// The controlling multisig account.
    pub account: Address,
    /// Hex-encoded proposer key used to sign submitted envelopes. Optional so
    /// dry runs can be configured without secrets on disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_key: Option<String>,
}

// ---------------------------------------------------------------------------
// VerificationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub base_url: String,
}

// ---------------------------------------------------------------------------
// RunConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub network: Network,
    pub rpc_url: String,
    pub ledger_path: PathBuf,
    pub artifacts_dir: PathBuf,
    /// Account the RPC node signs direct transactions with.
    pub deployer: Address,
    /// False means dry-run: log what would happen, touch nothing external.
    /// This is the safe default; the CLI `--execute` flag flips it.
    #[serde(default)]
    pub execute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custody: Option<CustodyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationConfig>,
    #[serde(default)]
    pub address_book: AddressBook,
}

impl RunConfig {
    /// Load from YAML. Relative `ledger_path` / `artifacts_dir` are resolved
    /// against the config file's directory so the tool works from anywhere.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RolloutError::MissingConfig(format!(
                "run configuration not found at {}",
                path.display()
            )));
        }
        let data = std::fs::read_to_string(path)?;
        let mut cfg: RunConfig = serde_yaml::from_str(&data)?;
        let base = path.parent().unwrap_or(Path::new("."));
        if cfg.ledger_path.is_relative() {
            cfg.ledger_path = base.join(&cfg.ledger_path);
        }
        if cfg.artifacts_dir.is_relative() {
            cfg.artifacts_dir = base.join(&cfg.artifacts_dir);
        }
        Ok(cfg)
    }

    /// Non-fatal configuration checks, reported to the operator before a run.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.execute {
            if let Some(custody) = &self.custody {
                if custody.signer_key.is_none() {
                    warnings.push(
                        "custody configured without signer_key: proposals cannot be signed"
                            .to_string(),
                    );
                }
            }
        }
        if !self.artifacts_dir.is_dir() {
            warnings.push(format!(
                "artifacts_dir {} does not exist",
                self.artifacts_dir.display()
            ));
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
network:
  id: 1
  name: mainnet
rpc_url: http://localhost:8545
ledger_path: deployments/ledger.json
artifacts_dir: artifacts
deployer: "0x00000000000000000000000000000000000000aa"
"#;

    #[test]
    fn minimal_config_loads_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rollout.yaml");
        std::fs::write(&path, MINIMAL).unwrap();

        let cfg = RunConfig::load(&path).unwrap();
        assert!(!cfg.execute, "dry-run must be the default");
        assert!(cfg.custody.is_none());
        assert_eq!(cfg.network.name, "mainnet");
        // Relative paths anchored at the config directory.
        assert_eq!(cfg.ledger_path, dir.path().join("deployments/ledger.json"));
        assert_eq!(cfg.artifacts_dir, dir.path().join("artifacts"));
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = RunConfig::load(&dir.path().join("rollout.yaml")).unwrap_err();
        assert!(matches!(err, RolloutError::MissingConfig(_)));
    }

    #[test]
    fn custody_without_signer_warns_in_execute_mode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rollout.yaml");
        let yaml = format!(
            "{MINIMAL}custody:\n  base_url: http://custody.local\n  account: \"0x00000000000000000000000000000000000000bb\"\n"
        );
        std::fs::write(&path, yaml).unwrap();

        let mut cfg = RunConfig::load(&path).unwrap();
        cfg.execute = true;
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("signer_key")));
    }

    #[test]
    fn address_book_lookup() {
        let yaml = r#"
addresses:
  guardian: "0x00000000000000000000000000000000000000cc"
toggles:
  transfer_ownership: true
"#;
        let book: AddressBook = serde_yaml::from_str(yaml).unwrap();
        assert!(book.get("guardian").is_some());
        assert!(book.require("guardian").is_ok());
        assert!(matches!(
            book.require("absent"),
            Err(RolloutError::MissingConfig(_))
        ));
        assert!(book.toggle("transfer_ownership"));
        assert!(!book.toggle("absent"));
    }
}
