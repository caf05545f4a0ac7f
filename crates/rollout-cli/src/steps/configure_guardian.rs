use super::{call_with_address, DeployCollector};
use rollout_core::proposal::{ProposalRequest, ProposalResult};
use rollout_core::runner::{Step, StepContext};
use rollout_core::types::Component;
use rollout_core::Result;
use serde_json::json;

/// Points the address provider's guardian role at the configured operator
/// account. Runs the collector deployment first as a prerequisite, since the
/// guardian handover assumes the full privileged surface exists.
pub struct ConfigureGuardian;

impl Step for ConfigureGuardian {
    fn name(&self) -> &'static str {
        "configure-guardian"
    }

    fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        DeployCollector.run(ctx)?;

        let Some(provider) = ctx
            .entry
            .component(Component::AddressProvider)
            .and_then(|v| v.as_one())
        else {
            tracing::warn!("no address provider recorded, skipping guardian setup");
            return Ok(());
        };

        if ctx.entry.config_value("guardian").is_some() {
            tracing::debug!("guardian already configured");
            return Ok(());
        }

        let guardian = ctx.run.address_book.require("guardian")?;
        let result = ctx.queue.propose(
            ProposalRequest {
                target: provider,
                data: call_with_address("setGuardian(address)", guardian),
                description: format!("address provider {provider}: set guardian to {guardian}"),
            },
            ctx.chain,
        )?;
        if result != ProposalResult::DryRun {
            ctx.entry.set_config("guardian", json!(guardian));
        }
        Ok(())
    }
}
