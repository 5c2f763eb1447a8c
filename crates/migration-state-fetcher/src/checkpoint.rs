//! Checkpoint monitor: decides when the target chain has ingested a source block.
//!
//! Two criteria are available. [`IngestionCriterion::TipMargin`] waits until the
//! target tip is strictly above `source_height + margin_blocks`; it needs only
//! `eth_blockNumber` but can be fooled by unrelated target blocks.
//! [`IngestionCriterion::Receipt`] waits until the target returns a receipt for
//! the source transaction hash, which proves the transaction itself landed, and
//! should be preferred when the target indexes migrated transactions.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::info;

use migration_transport::{EthApi, RpcClient};
use migration_verifier_types::{BlockCheckpoint, BlockTag, VerifyResult, H256};

use crate::wait::{wait_until, PollConfig, PollStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionCriterion {
    #[default]
    TipMargin,
    Receipt,
}

pub struct CheckpointMonitor {
    target: Arc<dyn RpcClient>,
    /// Only used to log the source tip alongside the target tip.
    source: Option<Arc<dyn RpcClient>>,
    poll: PollConfig,
    margin_blocks: u64,
}

impl CheckpointMonitor {
    /// Lag of the target's block production behind the source event.
    pub const DEFAULT_MARGIN_BLOCKS: u64 = 1;

    pub fn new(target: Arc<dyn RpcClient>, poll: PollConfig) -> Self {
        Self {
            target,
            source: None,
            poll,
            margin_blocks: Self::DEFAULT_MARGIN_BLOCKS,
        }
    }

    pub fn with_margin(mut self, margin_blocks: u64) -> Self {
        self.margin_blocks = margin_blocks;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn RpcClient>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    /// Wait, within the configured timeout, until the target tip exceeds
    /// `source_height + margin`.
    pub async fn await_ingestion(&self, source_height: u64) -> VerifyResult<BlockCheckpoint> {
        self.await_ingestion_until(source_height, self.poll.deadline_from_now())
            .await
    }

    /// Same as [`await_ingestion`](Self::await_ingestion) with an explicit
    /// deadline, clamped to the configured timeout.
    pub async fn await_ingestion_until(
        &self,
        source_height: u64,
        deadline: Instant,
    ) -> VerifyResult<BlockCheckpoint> {
        let threshold = source_height.saturating_add(self.margin_blocks);
        let deadline = deadline.min(self.poll.deadline_from_now());
        let waiting_for = format!(
            "{} tip > {} (source block {} + margin {})",
            self.target.endpoint().name(),
            threshold,
            source_height,
            self.margin_blocks
        );

        let checkpoint = wait_until(&self.poll, deadline, &waiting_for, || async move {
            let tip = self.target.block_number().await?;
            if tip <= threshold {
                return Ok(PollStatus::Pending {
                    observed: Some(tip),
                });
            }
            match self.target.block_checkpoint(BlockTag::Number(tip)).await? {
                Some(cp) => Ok(PollStatus::Ready(cp)),
                None => Ok(PollStatus::Pending {
                    observed: Some(tip),
                }),
            }
        })
        .await?;

        self.log_tips(&checkpoint).await;
        Ok(checkpoint)
    }

    /// Wait until the target returns a receipt for `tx_hash`.
    pub async fn await_receipt(
        &self,
        tx_hash: &H256,
        deadline: Instant,
    ) -> VerifyResult<BlockCheckpoint> {
        let deadline = deadline.min(self.poll.deadline_from_now());
        let waiting_for = format!(
            "receipt of {} on {}",
            tx_hash,
            self.target.endpoint().name()
        );

        let checkpoint = wait_until(&self.poll, deadline, &waiting_for, || async move {
            if let Some(receipt) = self.target.transaction_receipt(tx_hash).await? {
                return Ok(PollStatus::Ready(receipt.checkpoint()));
            }
            let tip = self.target.block_number().await?;
            Ok(PollStatus::Pending {
                observed: Some(tip),
            })
        })
        .await?;

        self.log_tips(&checkpoint).await;
        Ok(checkpoint)
    }

    /// Dispatch on `criterion`. The receipt criterion needs the source tx hash.
    pub async fn await_with(
        &self,
        criterion: IngestionCriterion,
        source_height: u64,
        tx_hash: &H256,
        deadline: Instant,
    ) -> VerifyResult<BlockCheckpoint> {
        match criterion {
            IngestionCriterion::TipMargin => {
                self.await_ingestion_until(source_height, deadline).await
            }
            IngestionCriterion::Receipt => self.await_receipt(tx_hash, deadline).await,
        }
    }

    async fn log_tips(&self, checkpoint: &BlockCheckpoint) {
        let source_tip = match &self.source {
            Some(source) => source.block_number().await.ok(),
            None => None,
        };
        info!(
            target_tip = checkpoint.height,
            target_hash = %checkpoint.hash,
            ?source_tip,
            "target chain reached checkpoint"
        );
    }
}
