//! Checkpoint polling and state-diff retrieval for migration verification.
//!
//! This crate provides [`CheckpointMonitor`], which waits for the target chain
//! to ingest a source block, and [`StateDiffFetcher`], which retrieves the
//! source's per-block state changes and the target's simulated storage diff.
//!
//! # Example
//!
//! ```ignore
//! use migration_state_fetcher::{CheckpointMonitor, PollConfig, StateDiffFetcher};
//!
//! let monitor = CheckpointMonitor::new(target.clone(), PollConfig::default());
//! let checkpoint = monitor.await_ingestion(receipt.block_number).await?;
//!
//! let fetcher = StateDiffFetcher::new(source, source_native, target);
//! let source_diff = fetcher.fetch_source_diff(&receipt.block_hash.to_hex()).await?;
//! ```

pub mod checkpoint;
pub mod diff;
pub mod wait;

pub use checkpoint::{CheckpointMonitor, IngestionCriterion};
pub use diff::{
    call_extension, StateDiffFetcher, DEBUG_CALL_METHOD, DEBUG_REPLAY_METHOD,
    HASH_CORRELATION_METHOD, STATE_CHANGES_METHOD,
};
pub use wait::{retry_until_some, wait_until, BackoffStrategy, PollConfig, PollStatus};
