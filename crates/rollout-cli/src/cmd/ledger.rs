use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use rollout_core::{config::RunConfig, ledger::VersionLedger};
use std::path::Path;

#[derive(Subcommand)]
pub enum LedgerSubcommand {
    /// List all release tags
    List,
    /// Show one release entry in full
    Show {
        #[arg(long)]
        tag: String,
    },
}

pub fn run(config_path: &Path, subcommand: LedgerSubcommand, json: bool) -> anyhow::Result<()> {
    let cfg = RunConfig::load(config_path).context("failed to load run configuration")?;
    let ledger = VersionLedger::load(&cfg.ledger_path).context("failed to load ledger")?;

    match subcommand {
        LedgerSubcommand::List => {
            if json {
                let tags: Vec<&str> = ledger.tags().collect();
                print_json(&tags)?;
            } else {
                print_table(
                    &["tag", "network", "components", "updated"],
                    ledger
                        .tags()
                        .filter_map(|tag| ledger.entry(tag).map(|e| (tag, e)))
                        .map(|(tag, entry)| {
                            vec![
                                tag.to_string(),
                                entry.network.name.clone(),
                                entry.components.len().to_string(),
                                entry.last_updated.to_rfc3339(),
                            ]
                        })
                        .collect(),
                );
            }
        }
        LedgerSubcommand::Show { tag } => {
            let entry = ledger
                .entry(&tag)
                .with_context(|| format!("release '{tag}' not found in ledger"))?;
            print_json(entry)?;
        }
    }
    Ok(())
}
