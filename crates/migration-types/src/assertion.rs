//! Pass/fail comparisons between source and target observations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::primitives::{Bytes, H256};

/// What kind of evidence an assertion compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionCategory {
    /// Target debug-call diff slot found in the source transaction's events.
    StorageDiff,
    /// Source event value re-read from live target storage.
    LiveStorage,
    /// Read-only call executed on both chains.
    Call,
    /// Native balance on both chains.
    Balance,
    /// Target returned a receipt for the source transaction.
    Receipt,
    /// Target holds code at the contract address.
    Code,
}

impl fmt::Display for AssertionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssertionCategory::StorageDiff => "storage-diff",
            AssertionCategory::LiveStorage => "live-storage",
            AssertionCategory::Call => "call",
            AssertionCategory::Balance => "balance",
            AssertionCategory::Receipt => "receipt",
            AssertionCategory::Code => "code",
        };
        f.write_str(s)
    }
}

/// A single comparison between a source observation and a target observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquivalenceAssertion {
    pub category: AssertionCategory,
    pub description: String,
    pub expected: Bytes,
    pub actual: Bytes,
    pub passed: bool,
}

impl EquivalenceAssertion {
    /// Byte-for-byte equality check.
    pub fn compare(
        category: AssertionCategory,
        description: impl Into<String>,
        expected: impl Into<Bytes>,
        actual: impl Into<Bytes>,
    ) -> Self {
        let expected = expected.into();
        let actual = actual.into();
        let passed = expected == actual;
        Self {
            category,
            description: description.into(),
            expected,
            actual,
            passed,
        }
    }

    /// Records an explicit verdict where equality of the two byte strings is not
    /// the criterion (existence checks).
    pub fn verdict(
        category: AssertionCategory,
        description: impl Into<String>,
        expected: impl Into<Bytes>,
        actual: impl Into<Bytes>,
        passed: bool,
    ) -> Self {
        Self {
            category,
            description: description.into(),
            expected: expected.into(),
            actual: actual.into(),
            passed,
        }
    }
}

impl fmt::Display for EquivalenceAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "PASS" } else { "FAIL" };
        write!(f, "[{}] {}: {}", status, self.category, self.description)?;
        if !self.passed {
            write!(f, " (expected {}, actual {})", self.expected, self.actual)?;
        }
        Ok(())
    }
}

/// A source event that cannot be checked against the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnverifiableEvent {
    pub tx_hash: H256,
    pub event_id: u64,
    pub key: H256,
    pub reason: String,
}

impl fmt::Display for UnverifiableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tx {} event #{} key {}: {}",
            self.tx_hash, self.event_id, self.key, self.reason
        )
    }
}

pub fn failed_assertions(assertions: &[EquivalenceAssertion]) -> Vec<&EquivalenceAssertion> {
    assertions.iter().filter(|a| !a.passed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_sets_passed() {
        let ok = EquivalenceAssertion::compare(
            AssertionCategory::Call,
            "getBool()",
            vec![1u8],
            vec![1u8],
        );
        assert!(ok.passed);
        let bad = EquivalenceAssertion::compare(
            AssertionCategory::Call,
            "getBool()",
            vec![1u8],
            vec![0u8],
        );
        assert!(!bad.passed);
        assert_eq!(
            bad.to_string(),
            "[FAIL] call: getBool() (expected 0x01, actual 0x00)"
        );
        assert_eq!(failed_assertions(&[ok, bad]).len(), 1);
    }
}
