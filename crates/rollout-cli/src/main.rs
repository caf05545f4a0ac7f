mod cmd;
mod output;
mod root;
mod steps;

use clap::{Parser, Subcommand};
use cmd::ledger::LedgerSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "rollout",
    about = "Release/upgrade orchestrator: run deployment pipelines, queue multisig proposals, check bytecode drift",
    version,
    propagate_version = true
)]
struct Cli {
    /// Run configuration file (default: auto-detect rollout.yaml upward from cwd)
    #[arg(long, global = true, env = "ROLLOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upgrade pipeline against a release tag
    Run {
        /// Release tag to build (created or resumed)
        #[arg(long)]
        tag: String,

        /// Prior tag to clone from (default: newest ledger entry)
        #[arg(long)]
        from: Option<String>,

        /// Actually deploy and submit proposals (default: dry-run)
        #[arg(long)]
        execute: bool,

        /// Comma-separated allow-list of step names (original order is kept)
        #[arg(long, value_delimiter = ',')]
        only: Option<Vec<String>>,

        /// Explicit multisig nonce override (resume a stuck run)
        #[arg(long)]
        nonce: Option<u64>,

        /// Discard the pending proposal queue and allocate from the last
        /// confirmed nonce
        #[arg(long)]
        restart_from_confirmed: bool,
    },

    /// Inspect the version ledger
    Ledger {
        #[command(subcommand)]
        subcommand: LedgerSubcommand,
    },

    /// Compare deployed bytecode against compiled artifacts for a release
    Verify {
        /// Release tag to check (default: newest ledger entry)
        #[arg(long)]
        tag: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Run {
            tag,
            from,
            execute,
            only,
            nonce,
            restart_from_confirmed,
        } => cmd::run::run(
            &config_path,
            cmd::run::RunArgs {
                tag,
                from,
                execute,
                only,
                nonce,
                restart_from_confirmed,
            },
            cli.json,
        ),
        Commands::Ledger { subcommand } => cmd::ledger::run(&config_path, subcommand, cli.json),
        Commands::Verify { tag } => cmd::verify::run(&config_path, tag.as_deref(), cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
