use crate::output::{print_json, print_table};
use crate::steps;
use anyhow::Context;
use rollout_core::{
    artifacts::ArtifactStore,
    chain::RpcClient,
    config::RunConfig,
    custody::NonceOptions,
    runner::{JobRunner, RunResult},
};
use std::path::Path;

pub struct RunArgs {
    pub tag: String,
    pub from: Option<String>,
    pub execute: bool,
    pub only: Option<Vec<String>>,
    pub nonce: Option<u64>,
    pub restart_from_confirmed: bool,
}

pub fn run(config_path: &Path, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let mut cfg = RunConfig::load(config_path).context("failed to load run configuration")?;
    cfg.execute = args.execute;

    for warning in cfg.validate() {
        tracing::warn!("{warning}");
    }
    if !cfg.execute {
        tracing::info!("dry-run mode: nothing will be deployed or submitted");
    }

    let chain = RpcClient::new(cfg.rpc_url.clone(), cfg.deployer);
    let artifacts = ArtifactStore::new(&cfg.artifacts_dir);
    let nonce_options = NonceOptions {
        explicit: args.nonce,
        restart_from_confirmed: args.restart_from_confirmed,
    };

    let catalogue = steps::catalogue();
    let result = JobRunner::new(&cfg, &chain, &artifacts)
        .run(
            &catalogue,
            args.only.as_deref(),
            args.from.as_deref(),
            &args.tag,
            nonce_options,
        )
        .context("upgrade run failed before any step could execute")?;

    report(&result, json)?;

    if let Some(failure) = &result.failure {
        // The ledger has already been persisted with all partial state.
        anyhow::bail!("{} (remaining steps skipped)", failure.error);
    }
    Ok(())
}

fn report(result: &RunResult, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(result);
    }

    println!("release: {}", result.tag);
    println!(
        "steps:   {} completed, {} skipped",
        result.completed.len(),
        result.skipped.len()
    );
    if !result.audit.is_empty() {
        println!();
        print_table(
            &["#", "nonce", "proposal"],
            result
                .audit
                .iter()
                .map(|e| {
                    vec![
                        e.sequence.to_string(),
                        e.nonce.map_or_else(|| "-".to_string(), |n| n.to_string()),
                        e.description.clone(),
                    ]
                })
                .collect(),
        );
    }
    if let Some(failure) = &result.failure {
        println!();
        println!("FAILED at step '{}': {}", failure.step, failure.error);
    }
    Ok(())
}
