//! The upgrade pipeline: the ordered catalogue of deployment and
//! configuration steps the runner drives. Every step is idempotent against
//! the working release entry, so a partially failed run can simply be rerun.

mod configure_guardian;
mod deploy_collector;
mod deploy_oracle;
mod transfer_ownership;

use alloy_primitives::{keccak256, Address, Bytes};
use rollout_core::runner::{Step, StepContext};
use rollout_core::types::Component;
use rollout_core::Result;

pub use configure_guardian::ConfigureGuardian;
pub use deploy_collector::DeployCollector;
pub use deploy_oracle::DeployOracle;
pub use transfer_ownership::TransferOwnership;

/// The full pipeline, in execution order. `--only` filters this list but
/// never reorders it.
pub fn catalogue() -> Vec<Box<dyn Step>> {
    vec![
        Box::new(DeployOracle),
        Box::new(DeployCollector),
        Box::new(ConfigureGuardian),
        Box::new(TransferOwnership),
    ]
}

/// ABI-encode a single-address call: 4-byte selector, then the address
/// left-padded to a 32-byte word.
pub(crate) fn call_with_address(signature: &str, address: Address) -> Bytes {
    let selector = keccak256(signature.as_bytes());
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&selector[..4]);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(address.as_slice());
    Bytes::from(data)
}

/// Deploy `component` from its compiled artifact unless the working entry
/// already records an address for it.
///
/// Returns the component's address, or `None` in a dry run where the
/// component is not yet deployed (there is no address to configure against,
/// so callers log what would follow and return).
pub(crate) fn ensure_deployed(
    ctx: &mut StepContext<'_>,
    component: Component,
) -> Result<Option<Address>> {
    if let Some(existing) = ctx.entry.component(component).and_then(|v| v.as_one()) {
        tracing::debug!(%component, address = %existing, "already deployed");
        return Ok(Some(existing));
    }

    let artifact = ctx.artifacts.load(component)?;
    if !ctx.run.execute {
        tracing::info!(%component, "dry-run: would deploy");
        return Ok(None);
    }

    let address = ctx.chain.deploy(&artifact.bytecode)?;
    tracing::info!(%component, %address, "deployed");
    ctx.entry.set_component(component, address);
    Ok(Some(address))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
