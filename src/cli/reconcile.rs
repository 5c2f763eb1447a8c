use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

use migration_state_fetcher::StateDiffFetcher;

use migration_verifier::catalog::mined_transaction;
use migration_verifier::{ChainClients, NamedCall, VerifierConfig};
use migration_verifier_types::{Address, Bytes, TransactionRequest, H256};

use super::{build_driver, emit};

#[derive(Parser, Debug)]
pub struct ReconcileTxCmd {
    /// Eth hash of the mined source transaction
    #[arg(long)]
    tx_hash: H256,

    /// Recipient of the transaction (replayed on the target)
    #[arg(long)]
    to: Address,

    /// Sender of the transaction
    #[arg(long)]
    from: Option<Address>,

    /// Call data of the transaction
    #[arg(long, value_name = "HEX", default_value = "0x")]
    data: Bytes,

    /// Extra read-only call data to compare on both chains (repeatable)
    #[arg(long = "read", value_name = "HEX")]
    reads: Vec<Bytes>,

    /// Write the source replay trace of the transaction to this file
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,
}

impl ReconcileTxCmd {
    pub async fn execute(&self, config: &VerifierConfig, json: bool) -> Result<()> {
        let mut request = TransactionRequest::call(self.to, self.data.clone());
        request.from = self.from;

        let calls = self
            .reads
            .iter()
            .map(|data| NamedCall {
                description: format!("eth_call {}", data),
                request: TransactionRequest {
                    from: self.from,
                    ..TransactionRequest::call(self.to, data.clone())
                },
            })
            .collect();

        let driver = build_driver(config, false);
        let report = driver
            .run(&mined_transaction(self.tx_hash, request, calls))
            .await;

        if let Some(path) = &self.replay {
            match report.source_native_tx {
                Some(native_hash) => write_replay(config, &native_hash, path).await?,
                None => warn!(tx = %self.tx_hash, "no native hash resolved, skipping replay trace"),
            }
        }
        emit(&[report], json)
    }
}

async fn write_replay(config: &VerifierConfig, native_hash: &H256, path: &PathBuf) -> Result<()> {
    let clients = ChainClients::connect(config);
    let fetcher = StateDiffFetcher::new(clients.source, clients.source_native, clients.target);
    let trace = fetcher.debug_replay(native_hash).await?;
    let body = serde_json::to_string_pretty(&trace).context("serialize replay trace")?;
    std::fs::write(path, body)
        .with_context(|| format!("Failed to write replay trace {}", path.display()))?;
    info!(tx = %native_hash, path = %path.display(), "wrote source replay trace");
    Ok(())
}
