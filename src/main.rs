//! migration-verifier: check a source-to-target chain migration from the command line.
//!
//! ## Commands
//!
//! - **chain-compat**: `mutate()` plus seven typed reads on a compatibility contract
//! - **erc20**: token transfer to a fresh address, then `balanceOf` on both chains
//! - **suite**: both of the above, concurrently
//! - **reconcile-tx**: verify a transaction already mined on the source
//! - **wait**: only wait for the target to ingest a source block
//!
//! ## Example Usage
//!
//! ```bash
//! migration-verifier chain-compat --contract 0x5fbd... --sender 0xf39f...
//! migration-verifier --json erc20 --token 0xe7f1... --sender 0xf39f... --balance-slot 0
//! RUST_LOG=debug migration-verifier wait --source-height 1200
//! ```
//!
//! Logs go to stderr; stdout carries only the report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use migration_verifier::VerifierConfig;

mod cli;

use cli::{
    reconcile::ReconcileTxCmd,
    scenario::{ChainCompatCmd, Erc20Cmd, SuiteCmd},
    wait::WaitCmd,
};

#[derive(Parser)]
#[command(
    name = "migration-verifier",
    author,
    version,
    about = "Verify that a chain migration preserved state and behavior"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file (endpoints, polling, timeouts)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output the report as JSON instead of PASS/FAIL lines
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the chain-compatibility scenario
    ChainCompat(ChainCompatCmd),

    /// Run the ERC20 transfer scenario
    Erc20(Erc20Cmd),

    /// Run chain-compat and erc20 concurrently
    Suite(SuiteCmd),

    /// Verify an already-mined source transaction
    ReconcileTx(ReconcileTxCmd),

    /// Wait for the target chain to ingest a source block
    Wait(WaitCmd),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli {
        command,
        config,
        json,
        verbose,
    } = Cli::parse();
    init_logging(verbose);

    let config = VerifierConfig::load(config.as_deref())?;

    match command {
        Commands::ChainCompat(cmd) => cmd.execute(&config, json).await,
        Commands::Erc20(cmd) => cmd.execute(&config, json).await,
        Commands::Suite(cmd) => cmd.execute(&config, json).await,
        Commands::ReconcileTx(cmd) => cmd.execute(&config, json).await,
        Commands::Wait(cmd) => cmd.execute(&config, json).await,
    }
}
