use super::call_with_address;
use rollout_core::proposal::{ProposalRequest, ProposalResult};
use rollout_core::runner::{Step, StepContext};
use rollout_core::types::Component;
use rollout_core::Result;
use serde_json::json;

/// Hands the address provider to its long-term owner. Gated on the
/// `transfer_ownership` toggle so routine upgrade runs never move ownership
/// by accident.
pub struct TransferOwnership;

impl Step for TransferOwnership {
    fn name(&self) -> &'static str {
        "transfer-ownership"
    }

    fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        if !ctx.run.address_book.toggle("transfer_ownership") {
            tracing::info!("transfer_ownership toggle off, skipping");
            return Ok(());
        }

        let Some(provider) = ctx
            .entry
            .component(Component::AddressProvider)
            .and_then(|v| v.as_one())
        else {
            tracing::warn!("no address provider recorded, skipping ownership transfer");
            return Ok(());
        };

        if ctx.entry.config_value("owner").is_some() {
            tracing::debug!("ownership already transferred");
            return Ok(());
        }

        let new_owner = ctx.run.address_book.require("new_owner")?;
        let result = ctx.queue.propose(
            ProposalRequest {
                target: provider,
                data: call_with_address("transferOwnership(address)", new_owner),
                description: format!("address provider {provider}: transfer ownership to {new_owner}"),
            },
            ctx.chain,
        )?;
        if result != ProposalResult::DryRun {
            ctx.entry.set_config("owner", json!(new_owner));
        }
        Ok(())
    }
}
