use super::{call_with_address, ensure_deployed};
use rollout_core::proposal::{ProposalRequest, ProposalResult};
use rollout_core::runner::{Step, StepContext};
use rollout_core::types::Component;
use rollout_core::Result;
use serde_json::json;

/// Deploys the price oracle and wires its fallback source.
///
/// The fallback is recorded under the `oracle_fallback` config key only once
/// a proposal actually left the building, so a dry run leaves the entry
/// untouched and a rerun after execution skips the wiring.
pub struct DeployOracle;

impl Step for DeployOracle {
    fn name(&self) -> &'static str {
        "deploy-oracle"
    }

    fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        let Some(oracle) = ensure_deployed(ctx, Component::Oracle)? else {
            tracing::info!("dry-run: would wire fallback after deployment");
            return Ok(());
        };

        if ctx.entry.config_value("oracle_fallback").is_some() {
            tracing::debug!("fallback already wired");
            return Ok(());
        }

        let Some(fallback) = ctx.run.address_book.get("fallback_oracle") else {
            tracing::warn!("address_book.fallback_oracle not set, skipping fallback wiring");
            return Ok(());
        };

        let result = ctx.queue.propose(
            ProposalRequest {
                target: oracle,
                data: call_with_address("setFallbackOracle(address)", fallback),
                description: format!("oracle {oracle}: set fallback to {fallback}"),
            },
            ctx.chain,
        )?;
        if result != ProposalResult::DryRun {
            ctx.entry.set_config("oracle_fallback", json!(fallback));
        }
        Ok(())
    }
}
