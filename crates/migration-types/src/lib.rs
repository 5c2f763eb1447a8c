//! Shared types for the migration-verifier workspace.
//!
//! This crate holds the data model every other crate speaks:
//!
//! - [`primitives`]: hex-encoded [`Address`], [`H256`] and [`Bytes`]
//! - [`chain`]: endpoints, checkpoints, requests and receipts
//! - [`state_change`]: the source chain's per-block state-change record
//! - [`target_diff`]: the target chain's simulated storage diff
//! - [`assertion`]: pass/fail comparisons consumed by reporting
//! - [`error`]: the [`VerifyError`] taxonomy

pub mod assertion;
pub mod chain;
pub mod env_utils;
pub mod error;
pub mod primitives;
pub mod state_change;
pub mod target_diff;

pub use assertion::{failed_assertions, AssertionCategory, EquivalenceAssertion, UnverifiableEvent};
pub use chain::{
    BlockCheckpoint, BlockHeader, BlockTag, ChainEndpoint, ChainRole, TransactionReceipt,
    TransactionRequest,
};
pub use env_utils::{env_duration_ms, env_string, env_var, env_var_or};
pub use error::{RpcError, VerifyError, VerifyResult, METHOD_NOT_FOUND};
pub use primitives::{Address, Bytes, ParseHexError, H256};
pub use state_change::{
    BlockStateChange, EventKind, SmtStat, StateChangeEvent, TransactionChange, TransactionKind,
};
pub use target_diff::{AccountStorageDiff, TargetStorageDiff};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for bounded retry with exponential backoff.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Number of retry attempts after the first try.
    pub retries: usize,
    /// Initial backoff duration between retries.
    #[serde(with = "millis")]
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    #[serde(with = "millis")]
    pub max_backoff: Duration,
}

impl RetryConfig {
    pub fn new(retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    /// Backoff before retry number `attempt` (1-based), doubling up to the cap.
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(4000),
        }
    }
}

/// Serde adapter storing a [`Duration`] as integer milliseconds.
pub mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
