use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use migration_state_fetcher::{CheckpointMonitor, IngestionCriterion};
use migration_verifier::{ChainClients, VerifierConfig};
use migration_verifier_types::{BlockCheckpoint, H256};

#[derive(Parser, Debug)]
pub struct WaitCmd {
    /// Source block height that must be ingested
    #[arg(long)]
    source_height: u64,

    /// Wait for this transaction's receipt on the target instead of the tip margin
    #[arg(long)]
    tx_hash: Option<H256>,
}

#[derive(Serialize)]
struct WaitOutput {
    source_height: u64,
    criterion: IngestionCriterion,
    checkpoint: BlockCheckpoint,
}

impl WaitCmd {
    pub async fn execute(&self, config: &VerifierConfig, json: bool) -> Result<()> {
        let clients = ChainClients::connect(config);
        let monitor = CheckpointMonitor::new(clients.target, config.checkpoint.poll_config())
            .with_margin(config.checkpoint.margin_blocks)
            .with_source(clients.source);

        let (criterion, tx_hash) = match self.tx_hash {
            Some(hash) => (IngestionCriterion::Receipt, hash),
            None => (IngestionCriterion::TipMargin, H256::default()),
        };
        let deadline = monitor.poll_config().deadline_from_now();
        let checkpoint = monitor
            .await_with(criterion, self.source_height, &tx_hash, deadline)
            .await?;

        if json {
            let out = WaitOutput {
                source_height: self.source_height,
                criterion,
                checkpoint,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("serialize checkpoint")?
            );
        } else {
            println!(
                "Target reached block {} ({}) for source block {}",
                checkpoint.height, checkpoint.hash, self.source_height
            );
        }
        Ok(())
    }
}
