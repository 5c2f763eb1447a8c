//! Scenario driver: one migration-verification run as a state machine.
//!
//! ```text
//! Submitting -> AwaitingCheckpoint -> FetchingDiffs -> Reconciling -> AssertingEquivalence
//!                                                                        -> Passed | Failed
//! ```
//!
//! Errors end the run in `Failed` with the error as its cause. Failed
//! assertions never end a run early; every check executes and the report
//! carries the full failure surface.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use migration_state_fetcher::{
    retry_until_some, CheckpointMonitor, IngestionCriterion, PollConfig, StateDiffFetcher,
};
use migration_transport::{connect, EthApi, RpcClient};
use migration_verifier_types::{
    Address, AssertionCategory, BlockTag, Bytes, EquivalenceAssertion, RetryConfig,
    TargetStorageDiff, TransactionReceipt, TransactionRequest, VerifyError, VerifyResult, H256,
};

use crate::config::VerifierConfig;
use crate::oracle::EquivalenceOracle;
use crate::reconciler::{assert_slot_written, reconcile_live, reconcile_transaction};
use crate::report::VerificationReport;
use crate::submit::{submit_and_confirm, MutatingTransaction, TransactionSubmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Submitting,
    AwaitingCheckpoint,
    FetchingDiffs,
    Reconciling,
    AssertingEquivalence,
    Passed,
    Failed,
}

impl ScenarioState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScenarioState::Passed | ScenarioState::Failed)
    }
}

impl fmt::Display for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScenarioState::Submitting => "submitting",
            ScenarioState::AwaitingCheckpoint => "awaiting-checkpoint",
            ScenarioState::FetchingDiffs => "fetching-diffs",
            ScenarioState::Reconciling => "reconciling",
            ScenarioState::AssertingEquivalence => "asserting-equivalence",
            ScenarioState::Passed => "PASSED",
            ScenarioState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// The three RPC clients a run talks to.
#[derive(Clone)]
pub struct ChainClients {
    pub source: Arc<dyn RpcClient>,
    /// Serves the source's custom state-change method.
    pub source_native: Arc<dyn RpcClient>,
    pub target: Arc<dyn RpcClient>,
}

impl ChainClients {
    pub fn connect(config: &VerifierConfig) -> Self {
        let timeout = config.http_timeout();
        Self {
            source: connect(config.source.clone(), timeout),
            source_native: connect(config.source_native_endpoint().clone(), timeout),
            target: connect(config.target.clone(), timeout),
        }
    }
}

/// Where the transaction under test comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSource {
    /// Submit this transaction on the source chain first.
    Submit(MutatingTransaction),
    /// Verify a transaction already mined on the source; `request` is its
    /// call, replayed on the target for the storage diff.
    Mined {
        tx_hash: H256,
        request: TransactionRequest,
    },
}

impl TransactionSource {
    pub fn request(&self) -> &TransactionRequest {
        match self {
            TransactionSource::Submit(tx) => &tx.request,
            TransactionSource::Mined { request, .. } => request,
        }
    }
}

/// A read-only call compared on both chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedCall {
    pub description: String,
    pub request: TransactionRequest,
}

/// A slot the mutating transaction is expected to write on both chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedSlot {
    pub description: String,
    pub address: Address,
    pub key: H256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioPlan {
    pub name: String,
    pub transaction: TransactionSource,
    /// Contract whose code must exist on the target; defaults to the tx recipient.
    pub contract: Option<Address>,
    pub calls: Vec<NamedCall>,
    /// Accounts balance-checked in addition to the sender.
    pub balance_accounts: Vec<Address>,
    pub watched_slots: Vec<WatchedSlot>,
}

pub struct ScenarioDriver {
    clients: ChainClients,
    submitter: Arc<dyn TransactionSubmitter>,
    monitor: CheckpointMonitor,
    fetcher: StateDiffFetcher,
    oracle: EquivalenceOracle,
    criterion: IngestionCriterion,
    source_diff_retry: RetryConfig,
    confirmation_poll: PollConfig,
    run_timeout: Duration,
}

fn transition(report: &mut VerificationReport, state: ScenarioState) {
    info!(scenario = %report.scenario, from = %report.state, to = %state, "scenario state transition");
    report.state = state;
    report.transitions.push(state);
}

impl ScenarioDriver {
    pub fn new(
        clients: ChainClients,
        submitter: Arc<dyn TransactionSubmitter>,
        config: &VerifierConfig,
    ) -> Self {
        let monitor = CheckpointMonitor::new(clients.target.clone(), config.checkpoint.poll_config())
            .with_margin(config.checkpoint.margin_blocks)
            .with_source(clients.source.clone());
        let fetcher = StateDiffFetcher::new(
            clients.source.clone(),
            clients.source_native.clone(),
            clients.target.clone(),
        );
        let oracle = EquivalenceOracle::new(clients.source.clone(), clients.target.clone());
        Self {
            clients,
            submitter,
            monitor,
            fetcher,
            oracle,
            criterion: config.checkpoint.mode,
            source_diff_retry: config.source_diff_retry,
            confirmation_poll: config.confirmation_poll(),
            run_timeout: config.run_timeout(),
        }
    }

    /// Execute `plan` to a terminal state. Never returns early with an error:
    /// the outcome, including any fatal cause, is in the report.
    pub async fn run(&self, plan: &ScenarioPlan) -> VerificationReport {
        let mut report = VerificationReport::new(
            plan.name.clone(),
            self.clients.source.endpoint().to_string(),
            self.clients.target.endpoint().to_string(),
        );
        report.transitions.push(ScenarioState::Submitting);

        let deadline = Instant::now() + self.run_timeout;
        let outcome =
            tokio::time::timeout_at(deadline, self.execute(plan, deadline, &mut report)).await;
        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(_) => Some(VerifyError::Timeout {
                waiting_for: format!("{} run ({})", plan.name, report.state),
                waited: self.run_timeout,
                last_observed_tip: report.target_checkpoint.map(|cp| cp.height),
            }),
        };
        if let Some(e) = &error {
            warn!(scenario = %plan.name, state = %report.state, kind = e.kind(), error = %e, "run aborted");
        }

        report.finish(error);
        info!(
            scenario = %plan.name,
            state = %report.state,
            passed = report.passed,
            failed = report.failed,
            "run finished"
        );
        report
    }

    async fn execute(
        &self,
        plan: &ScenarioPlan,
        deadline: Instant,
        report: &mut VerificationReport,
    ) -> VerifyResult<()> {
        let receipt = self.submit(plan, deadline).await?;
        let tx_hash = receipt.transaction_hash;
        report.source_tx = Some(tx_hash);
        report.source_block = Some(receipt.checkpoint());

        transition(report, ScenarioState::AwaitingCheckpoint);
        let checkpoint = self
            .monitor
            .await_with(self.criterion, receipt.block_number, &tx_hash, deadline)
            .await?;
        report.target_checkpoint = Some(checkpoint);

        transition(report, ScenarioState::FetchingDiffs);
        let native_hash = retry_until_some(
            &self.source_diff_retry,
            &format!("source-native hash of {}", tx_hash),
            || self.fetcher.resolve_native_tx_hash(&tx_hash),
        )
        .await?;
        report.source_native_tx = Some(native_hash);

        let block_hash = receipt.block_hash.to_hex();
        let source_diff = retry_until_some(
            &self.source_diff_retry,
            &format!("source state changes of block {}", block_hash),
            || self.fetcher.fetch_source_diff(&block_hash),
        )
        .await?;

        let at_block = receipt.block_number.saturating_sub(1);
        let target_diff = match self
            .fetcher
            .fetch_target_diff(plan.transaction.request(), at_block)
            .await?
        {
            Some(diff) => diff,
            None => {
                report.coverage_notes.push(format!(
                    "target returned no storage diff for the simulated call at block {}",
                    at_block
                ));
                TargetStorageDiff::default()
            }
        };

        transition(report, ScenarioState::Reconciling);
        match source_diff.find_transaction(&native_hash) {
            Some(source_tx) => {
                report
                    .assertions
                    .extend(reconcile_transaction(source_tx, &target_diff));
                for slot in &plan.watched_slots {
                    report.assertions.push(assert_slot_written(
                        &slot.description,
                        source_tx,
                        &target_diff,
                        &slot.address,
                        &slot.key,
                    ));
                }
            }
            None => {
                warn!(tx = %native_hash, block = %block_hash, "source transaction missing from block state changes");
                report.assertions.push(EquivalenceAssertion::verdict(
                    AssertionCategory::StorageDiff,
                    format!("source tx {} present in state changes of block {}", native_hash, block_hash),
                    Bytes::from(native_hash),
                    Bytes::default(),
                    false,
                ));
            }
        }

        let live = reconcile_live(&source_diff, self.clients.target.as_ref(), BlockTag::Latest).await?;
        report.assertions.extend(live.assertions);
        if !live.unverifiable.is_empty() {
            report.coverage_notes.push(format!(
                "{} source events carry no address and were not compared",
                live.unverifiable.len()
            ));
        }
        report.unverifiable.extend(live.unverifiable);

        transition(report, ScenarioState::AssertingEquivalence);
        report
            .assertions
            .push(self.oracle.assert_receipt_present(&tx_hash).await?);

        let request = plan.transaction.request();
        if let Some(contract) = plan.contract.or(receipt.to).or(request.to) {
            report
                .assertions
                .push(self.oracle.assert_code_present(&contract).await?);
        }

        let mut accounts: Vec<Address> = Vec::new();
        for account in receipt
            .from
            .iter()
            .chain(request.from.iter())
            .chain(plan.balance_accounts.iter())
        {
            if !accounts.contains(account) {
                accounts.push(*account);
            }
        }
        for account in &accounts {
            report
                .assertions
                .push(self.oracle.assert_equal_balance(account).await?);
        }

        for call in &plan.calls {
            report
                .assertions
                .push(self.oracle.assert_equal_call(&call.description, &call.request).await?);
        }
        Ok(())
    }

    async fn submit(&self, plan: &ScenarioPlan, deadline: Instant) -> VerifyResult<TransactionReceipt> {
        match &plan.transaction {
            TransactionSource::Submit(tx) => {
                submit_and_confirm(self.submitter.as_ref(), tx, &self.confirmation_poll, deadline)
                    .await
            }
            TransactionSource::Mined { tx_hash, .. } => {
                let receipt = self
                    .clients
                    .source
                    .transaction_receipt(tx_hash)
                    .await?
                    .ok_or_else(|| {
                        VerifyError::Precondition(format!("transaction {} is not mined on source", tx_hash))
                    })?;
                if !receipt.succeeded() {
                    return Err(VerifyError::Precondition(format!(
                        "transaction {} reverted in block {}",
                        tx_hash, receipt.block_number
                    )));
                }
                Ok(receipt)
            }
        }
    }
}

/// Run independent scenarios side by side. Each pair owns its driver; only
/// the remote chains are shared.
pub async fn run_concurrently(runs: &[(ScenarioDriver, ScenarioPlan)]) -> Vec<VerificationReport> {
    futures::future::join_all(runs.iter().map(|(driver, plan)| driver.run(plan))).await
}
