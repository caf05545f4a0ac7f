use super::ensure_deployed;
use rollout_core::runner::{Step, StepContext};
use rollout_core::types::Component;
use rollout_core::Result;

/// Deploys the fee collector. No configuration of its own; the guardian step
/// depends on this one having run.
pub struct DeployCollector;

impl Step for DeployCollector {
    fn name(&self) -> &'static str {
        "deploy-collector"
    }

    fn run(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        ensure_deployed(ctx, Component::Collector)?;
        Ok(())
    }
}
