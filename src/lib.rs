//! Migration consistency verifier
//!
//! Checks that a migration from a source chain to a target chain preserved
//! storage, balances and contract behavior:
//!
//! - **Reconciliation**: match the source's per-transaction state changes
//!   against the target's simulated storage diff, then re-read every source
//!   write from live target storage ([`reconciler`])
//! - **Equivalence**: identical read-only calls and balance queries on both
//!   chains ([`oracle`])
//! - **Scenarios**: submit, wait for the target checkpoint, fetch diffs,
//!   reconcile and assert, as one state machine ([`scenario`], [`catalog`])
//!
//! Transport and polling live in the member crates `migration-transport` and
//! `migration-state-fetcher`; the data model in `migration-verifier-types`.

#![allow(clippy::result_large_err)]

pub mod abi;
pub mod catalog;
pub mod config;
pub mod oracle;
pub mod reconciler;
pub mod report;
pub mod scenario;
pub mod submit;

pub use config::{CheckpointConfig, VerifierConfig};
pub use oracle::EquivalenceOracle;
pub use reconciler::{reconcile_live, reconcile_transaction, LiveReconciliation};
pub use report::{print_report, VerificationReport};
pub use scenario::{
    run_concurrently, ChainClients, NamedCall, ScenarioDriver, ScenarioPlan, ScenarioState,
    TransactionSource, WatchedSlot,
};
pub use submit::{
    await_confirmation, MutatingTransaction, NodeSignedSubmitter, RawSubmitter,
    TransactionSubmitter,
};
