use crate::output::{print_json, print_table};
use alloy_primitives::Bytes;
use anyhow::Context;
use rollout_core::{
    artifacts::ArtifactStore,
    chain::RpcClient,
    config::RunConfig,
    ledger::VersionLedger,
    verify::{check_release, Verifier, VerifyOutcome},
};
use std::path::Path;

/// Bytecode drift pass plus best-effort source verification. Mismatches are
/// diagnostics, not failures: the command exits 0 and prints the list.
pub fn run(config_path: &Path, tag: Option<&str>, json: bool) -> anyhow::Result<()> {
    let cfg = RunConfig::load(config_path).context("failed to load run configuration")?;
    let ledger = VersionLedger::load(&cfg.ledger_path).context("failed to load ledger")?;

    let (tag, entry) = match tag {
        Some(tag) => {
            let entry = ledger
                .entry(tag)
                .with_context(|| format!("release '{tag}' not found in ledger"))?;
            (tag.to_string(), entry)
        }
        None => {
            let (tag, entry) = ledger.latest().context("ledger has no releases")?;
            (tag.to_string(), entry)
        }
    };

    let chain = RpcClient::new(cfg.rpc_url.clone(), cfg.deployer);
    let artifacts = ArtifactStore::new(&cfg.artifacts_dir);

    let mismatches = check_release(entry, &artifacts, &chain)
        .with_context(|| format!("drift check failed for '{tag}'"))?;

    // Source registration is best-effort: failures are warnings, never fatal.
    if let Some(verification) = &cfg.verification {
        let verifier = Verifier::new(verification);
        for (&component, value) in &entry.components {
            let Some(address) = value.as_one() else { continue };
            let Ok(artifact) = artifacts.load(component) else { continue };
            let Some(source_ref) = artifact.source_ref.as_deref() else { continue };
            match verifier.verify(address, source_ref, &Bytes::new()) {
                Ok(VerifyOutcome::Verified) => tracing::info!(%component, "source verified"),
                Ok(VerifyOutcome::AlreadyVerified) => {
                    tracing::debug!(%component, "already verified")
                }
                Ok(VerifyOutcome::PayloadTooLarge) => {
                    tracing::warn!(%component, "source payload too large, skipped")
                }
                Err(e) => tracing::warn!(%component, error = %e, "verification failed"),
            }
        }
    }

    if json {
        print_json(&mismatches)?;
    } else if mismatches.is_empty() {
        println!("release '{tag}': all deployed bytecode matches compiled artifacts");
    } else {
        print_table(
            &["component", "address"],
            mismatches
                .iter()
                .map(|m| vec![m.component.to_string(), m.address.to_string()])
                .collect(),
        );
    }
    Ok(())
}
