//! The sequential job runner: loads the ledger, seeds the working release
//! entry, drives each step in order, and flushes the ledger exactly once no
//! matter how the run ends.

use crate::artifacts::ArtifactStore;
use crate::chain::ChainClient;
use crate::config::RunConfig;
use crate::custody::NonceOptions;
use crate::error::{Result, RolloutError};
use crate::ledger::{ReleaseEntry, VersionLedger};
use crate::proposal::{AuditEntry, ProposalQueue};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One idempotent unit of deployment or configuration work.
///
/// A step reads and mutates the working release entry through the context it
/// is handed and may queue proposals; it must be safe to run twice: if the
/// entry already shows its component deployed it only performs still-missing
/// configuration. A step may invoke another step as a prerequisite, but the
/// runner itself never reorders or parallelizes.
pub trait Step {
    fn name(&self) -> &'static str;
    fn run(&self, ctx: &mut StepContext<'_>) -> Result<()>;
}

/// Borrowed handles for a single step invocation. Steps must not retain any
/// of these past their own `run` call; the working entry is owned by the run.
pub struct StepContext<'a> {
    pub run: &'a RunConfig,
    pub entry: &'a mut ReleaseEntry,
    pub queue: &'a mut ProposalQueue,
    pub chain: &'a dyn ChainClient,
    pub artifacts: &'a ArtifactStore,
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub step: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub tag: String,
    pub completed: Vec<String>,
    /// Steps excluded by the `--only` allow-list, in original order.
    pub skipped: Vec<String>,
    pub failure: Option<StepFailure>,
    pub audit: Vec<AuditEntry>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

// ---------------------------------------------------------------------------
// JobRunner
// ---------------------------------------------------------------------------

pub struct JobRunner<'a> {
    cfg: &'a RunConfig,
    chain: &'a dyn ChainClient,
    artifacts: &'a ArtifactStore,
}

impl<'a> JobRunner<'a> {
    pub fn new(cfg: &'a RunConfig, chain: &'a dyn ChainClient, artifacts: &'a ArtifactStore) -> Self {
        Self {
            cfg,
            chain,
            artifacts,
        }
    }

    /// Run the pipeline against `new_tag`, seeding it from `prior_tag` (or
    /// the newest ledger entry when omitted).
    ///
    /// A missing or corrupt ledger aborts before any step runs. Once steps
    /// begin, the first failure stops iteration but the ledger is still
    /// persisted with every mutation made so far: a crash mid-pipeline never
    /// rolls back prior successful steps and never loses deployed addresses.
    pub fn run(
        &self,
        steps: &[Box<dyn Step>],
        selection: Option<&[String]>,
        prior_tag: Option<&str>,
        new_tag: &str,
        nonce_options: NonceOptions,
    ) -> Result<RunResult> {
        let mut ledger = VersionLedger::load(&self.cfg.ledger_path)?;

        let prior = match prior_tag {
            Some(tag) => tag.to_string(),
            None => ledger
                .latest()
                .map(|(tag, _)| tag.to_string())
                .ok_or_else(|| RolloutError::ReleaseNotFound("(empty ledger)".to_string()))?,
        };
        ledger.begin_release(&prior, new_tag)?;

        if let Some(names) = selection {
            for name in names {
                if !steps.iter().any(|s| s.name() == name) {
                    tracing::warn!(step = %name, "selected step does not exist");
                }
            }
        }

        let mut queue = ProposalQueue::new(self.cfg, nonce_options);
        let mut completed = Vec::new();
        let mut skipped = Vec::new();
        let mut failure = None;

        {
            let entry = ledger.entry_mut(new_tag).expect("working entry exists");
            for step in steps {
                let name = step.name();
                if selection.is_some_and(|names| !names.iter().any(|n| n == name)) {
                    skipped.push(name.to_string());
                    continue;
                }

                tracing::info!(step = name, "running");
                let mut ctx = StepContext {
                    run: self.cfg,
                    entry: &mut *entry,
                    queue: &mut queue,
                    chain: self.chain,
                    artifacts: self.artifacts,
                };
                match step.run(&mut ctx) {
                    Ok(()) => completed.push(name.to_string()),
                    Err(e) => {
                        failure = Some(StepFailure {
                            step: name.to_string(),
                            error: RolloutError::StepFailed {
                                step: name.to_string(),
                                source: Box::new(e),
                            }
                            .to_string(),
                        });
                        break;
                    }
                }
            }
        }

        // The central failure-tolerance contract: persist exactly once, on
        // every exit path past the load.
        ledger.save(&self.cfg.ledger_path)?;

        let result = RunResult {
            tag: new_tag.to_string(),
            completed,
            skipped,
            failure,
            audit: queue.audit().to_vec(),
        };

        match &result.failure {
            Some(f) => tracing::error!(step = %f.step, error = %f.error, "run aborted"),
            None => tracing::info!(tag = %result.tag, steps = result.completed.len(), "run complete"),
        }
        for entry in &result.audit {
            match entry.nonce {
                Some(n) => tracing::info!(seq = entry.sequence, nonce = n, desc = %entry.description, "proposal"),
                None => tracing::info!(seq = entry.sequence, desc = %entry.description, "proposal (no nonce)"),
            }
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
