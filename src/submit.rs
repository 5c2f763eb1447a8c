//! Submission of the state-mutating transaction on the source chain.
//!
//! A submission that reverts or never confirms is a precondition failure: the
//! run cannot verify a migration of a transaction that did not happen.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::info;

use migration_state_fetcher::{wait_until, PollConfig, PollStatus};
use migration_transport::{EthApi, RpcClient};
use migration_verifier_types::{
    Bytes, TransactionReceipt, TransactionRequest, VerifyError, VerifyResult, H256,
};

/// The mutating transaction of a scenario.
///
/// `request` is always present since the target simulation replays it;
/// `signed` carries the pre-signed payload for [`RawSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutatingTransaction {
    pub request: TransactionRequest,
    pub signed: Option<Bytes>,
}

impl MutatingTransaction {
    pub fn unsigned(request: TransactionRequest) -> Self {
        Self {
            request,
            signed: None,
        }
    }

    pub fn presigned(request: TransactionRequest, raw: Bytes) -> Self {
        Self {
            request,
            signed: Some(raw),
        }
    }
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Chain client the transaction is sent to and confirmed on.
    fn client(&self) -> &Arc<dyn RpcClient>;

    /// Broadcast `tx` and return its hash.
    async fn submit(&self, tx: &MutatingTransaction) -> VerifyResult<H256>;
}

/// Signs through the node with `eth_sendTransaction`.
pub struct NodeSignedSubmitter {
    client: Arc<dyn RpcClient>,
}

impl NodeSignedSubmitter {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TransactionSubmitter for NodeSignedSubmitter {
    fn client(&self) -> &Arc<dyn RpcClient> {
        &self.client
    }

    async fn submit(&self, tx: &MutatingTransaction) -> VerifyResult<H256> {
        if tx.request.from.is_none() {
            return Err(VerifyError::InvalidArgument(
                "node-signed transaction needs a sender".to_string(),
            ));
        }
        self.client.send_transaction(&tx.request).await
    }
}

/// Broadcasts a pre-signed payload with `eth_sendRawTransaction`.
pub struct RawSubmitter {
    client: Arc<dyn RpcClient>,
}

impl RawSubmitter {
    pub fn new(client: Arc<dyn RpcClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TransactionSubmitter for RawSubmitter {
    fn client(&self) -> &Arc<dyn RpcClient> {
        &self.client
    }

    async fn submit(&self, tx: &MutatingTransaction) -> VerifyResult<H256> {
        let raw = tx.signed.as_ref().ok_or_else(|| {
            VerifyError::InvalidArgument("raw submission without a signed payload".to_string())
        })?;
        self.client.send_raw_transaction(raw).await
    }
}

/// Poll for the receipt of `tx_hash` until `deadline`, clamped to the poll timeout.
///
/// A timeout or a `status == 0` receipt is a [`VerifyError::Precondition`].
pub async fn await_confirmation(
    client: &dyn RpcClient,
    tx_hash: &H256,
    poll: &PollConfig,
    deadline: Instant,
) -> VerifyResult<TransactionReceipt> {
    let deadline = deadline.min(poll.deadline_from_now());
    let waiting_for = format!("confirmation of {} on {}", tx_hash, client.endpoint().name());
    let receipt = wait_until(poll, deadline, &waiting_for, || async move {
        Ok(match client.transaction_receipt(tx_hash).await? {
            Some(receipt) => PollStatus::Ready(receipt),
            None => PollStatus::Pending { observed: None },
        })
    })
    .await
    .map_err(|e| {
        if e.is_timeout() {
            VerifyError::Precondition(e.to_string())
        } else {
            e
        }
    })?;

    if !receipt.succeeded() {
        return Err(VerifyError::Precondition(format!(
            "transaction {} reverted in block {}",
            tx_hash, receipt.block_number
        )));
    }
    info!(
        tx = %tx_hash,
        block = receipt.block_number,
        block_hash = %receipt.block_hash,
        "source transaction confirmed"
    );
    Ok(receipt)
}

/// Submit `tx` and wait for a successful receipt.
pub async fn submit_and_confirm(
    submitter: &dyn TransactionSubmitter,
    tx: &MutatingTransaction,
    poll: &PollConfig,
    deadline: Instant,
) -> VerifyResult<TransactionReceipt> {
    let tx_hash = submitter.submit(tx).await?;
    info!(tx = %tx_hash, endpoint = %submitter.client().endpoint(), "submitted source transaction");
    await_confirmation(submitter.client().as_ref(), &tx_hash, poll, deadline).await
}
