//! Verification reports.
//!
//! A report is produced for every run, passed or failed, and can be printed
//! as PASS/FAIL lines or serialized to JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use migration_verifier_types::{
    failed_assertions, BlockCheckpoint, EquivalenceAssertion, UnverifiableEvent, VerifyError, H256,
};

use crate::scenario::ScenarioState;

/// Always attached: the target diff comes from re-sending the call, not from
/// a protocol-level link to the source transaction.
pub const SIMULATED_CALL_NOTE: &str = "target storage diff is derived by re-simulating the call data \
on the target; it is not cryptographically linked to the source transaction";

/// The error that ended a run early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: String,
    pub message: String,
}

impl From<&VerifyError> for RunError {
    fn from(e: &VerifyError) -> Self {
        Self {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub scenario: String,
    pub ok: bool,
    pub state: ScenarioState,
    /// Every state the run entered, in order.
    pub transitions: Vec<ScenarioState>,
    pub passed: usize,
    pub failed: usize,
    pub source_endpoint: String,
    pub target_endpoint: String,
    pub source_tx: Option<H256>,
    pub source_native_tx: Option<H256>,
    pub source_block: Option<BlockCheckpoint>,
    pub target_checkpoint: Option<BlockCheckpoint>,
    pub assertions: Vec<EquivalenceAssertion>,
    pub unverifiable: Vec<UnverifiableEvent>,
    pub coverage_notes: Vec<String>,
    pub error: Option<RunError>,
    /// The typed error behind `error`, kept for callers in this process.
    #[serde(skip)]
    pub cause: Option<VerifyError>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl VerificationReport {
    pub fn new(scenario: impl Into<String>, source_endpoint: String, target_endpoint: String) -> Self {
        Self {
            scenario: scenario.into(),
            ok: false,
            state: ScenarioState::Submitting,
            transitions: Vec::new(),
            passed: 0,
            failed: 0,
            source_endpoint,
            target_endpoint,
            source_tx: None,
            source_native_tx: None,
            source_block: None,
            target_checkpoint: None,
            assertions: Vec::new(),
            unverifiable: Vec::new(),
            coverage_notes: vec![SIMULATED_CALL_NOTE.to_string()],
            error: None,
            cause: None,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn failed_assertions(&self) -> Vec<&EquivalenceAssertion> {
        failed_assertions(&self.assertions)
    }

    /// Recompute counts and the terminal state.
    pub fn finish(&mut self, error: Option<VerifyError>) {
        self.error = error.as_ref().map(RunError::from);
        self.cause = error;
        self.failed = self.failed_assertions().len();
        self.passed = self.assertions.len() - self.failed;
        self.ok = self.error.is_none() && self.failed == 0;
        self.state = if self.ok {
            ScenarioState::Passed
        } else {
            ScenarioState::Failed
        };
        self.transitions.push(self.state);
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }

    /// `Err` when the run did not pass: the run's own error, or a mismatch count.
    pub fn to_result(&self) -> Result<(), VerifyError> {
        if let Some(err) = &self.cause {
            return Err(err.clone());
        }
        if self.failed > 0 {
            return Err(VerifyError::ConsistencyMismatch {
                failed: self.failed,
                total: self.assertions.len(),
            });
        }
        Ok(())
    }
}

pub fn print_report(report: &VerificationReport) {
    println!("migration-verifier: {}", report.scenario);
    println!("  source: {}", report.source_endpoint);
    println!("  target: {}", report.target_endpoint);
    if let Some(tx) = &report.source_tx {
        println!("  source tx: {}", tx);
    }
    if let Some(cp) = &report.source_block {
        println!("  source block: {} ({})", cp.height, cp.hash);
    }
    if let Some(cp) = &report.target_checkpoint {
        println!("  target checkpoint: {} ({})", cp.height, cp.hash);
    }
    println!();

    for assertion in &report.assertions {
        println!("{}", assertion);
    }

    if !report.unverifiable.is_empty() {
        println!();
        println!("Unverifiable events ({}):", report.unverifiable.len());
        for event in &report.unverifiable {
            println!("  - {}", event);
        }
    }

    if !report.coverage_notes.is_empty() {
        println!();
        println!("Coverage notes:");
        for note in &report.coverage_notes {
            println!("  - {}", note);
        }
    }

    if let Some(err) = &report.error {
        println!();
        println!("[ERROR] {}: {}", err.kind, err.message);
    }

    println!();
    println!(
        "Summary: {} ({} passed, {} failed, {}ms)",
        report.state, report.passed, report.failed, report.duration_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_verifier_types::{AssertionCategory, Bytes};

    fn report() -> VerificationReport {
        VerificationReport::new("unit", "source (a)".into(), "target (b)".into())
    }

    #[test]
    fn test_finish_passes_only_without_failures() {
        let mut r = report();
        r.assertions.push(EquivalenceAssertion::compare(
            AssertionCategory::Call,
            "same",
            Bytes::new(vec![1]),
            Bytes::new(vec![1]),
        ));
        r.finish(None);
        assert!(r.ok);
        assert_eq!(r.state, ScenarioState::Passed);
        assert!(r.to_result().is_ok());

        let mut r = report();
        r.assertions.push(EquivalenceAssertion::compare(
            AssertionCategory::Call,
            "differs",
            Bytes::new(vec![1]),
            Bytes::new(vec![2]),
        ));
        r.finish(None);
        assert_eq!(r.state, ScenarioState::Failed);
        assert!(matches!(
            r.to_result(),
            Err(VerifyError::ConsistencyMismatch { failed: 1, total: 1 })
        ));
    }

    #[test]
    fn test_error_fails_run_and_serializes() {
        let mut r = report();
        r.finish(Some(VerifyError::InvalidArgument("bad hash".into())));
        assert!(matches!(r.to_result(), Err(VerifyError::InvalidArgument(_))));
        assert!(!r.ok);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["error"]["kind"], "invalid_argument");
        assert_eq!(json["coverage_notes"][0], SIMULATED_CALL_NOTE);
    }
}
