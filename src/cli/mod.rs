//! Subcommands of the migration-verifier binary.

pub mod reconcile;
pub mod scenario;
pub mod wait;

use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use migration_verifier::{
    print_report, ChainClients, NodeSignedSubmitter, RawSubmitter, ScenarioDriver,
    TransactionSubmitter, VerificationReport, VerifierConfig,
};

/// A driver whose submitter matches how the transaction is signed.
pub fn build_driver(config: &VerifierConfig, presigned: bool) -> ScenarioDriver {
    let clients = ChainClients::connect(config);
    let submitter: Arc<dyn TransactionSubmitter> = if presigned {
        Arc::new(RawSubmitter::new(clients.source.clone()))
    } else {
        Arc::new(NodeSignedSubmitter::new(clients.source.clone()))
    };
    ScenarioDriver::new(clients, submitter, config)
}

/// Print reports and turn any failed run into an error exit.
pub fn emit(reports: &[VerificationReport], json: bool) -> Result<()> {
    if json {
        let out = if reports.len() == 1 {
            serde_json::to_string_pretty(&reports[0])
        } else {
            serde_json::to_string_pretty(reports)
        };
        println!("{}", out.context("serialize verification report")?);
    } else {
        for (i, report) in reports.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_report(report);
        }
    }

    let failed: Vec<String> = reports
        .iter()
        .filter_map(|r| r.to_result().err().map(|e| format!("{}: {}", r.scenario, e)))
        .collect();
    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("verification failed: {}", failed.join("; ")))
    }
}
