//! Retrieval of the two diff records a reconciliation compares.
//!
//! All methods here are read-only. The custom methods are capability
//! extensions: an endpoint that does not implement one yields
//! `UnsupportedOperation`, which is never confused with a `null` result.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use migration_transport::eth::decode;
use migration_transport::RpcClient;
use migration_verifier_types::primitives::format_quantity;
use migration_verifier_types::{
    BlockStateChange, TargetStorageDiff, TransactionRequest, VerifyError, VerifyResult, H256,
};

/// Source native RPC: per-block state-change record.
pub const STATE_CHANGES_METHOD: &str = "gw_state_changes_by_block";
/// Source web3 RPC: eth tx hash to source-native tx hash.
pub const HASH_CORRELATION_METHOD: &str = "poly_getGwTxHashByEthTxHash";
/// Source web3 RPC: replay trace of a native transaction.
pub const DEBUG_REPLAY_METHOD: &str = "gw_debug_replay_transaction";
/// Target RPC: storage diff of a simulated call.
pub const DEBUG_CALL_METHOD: &str = "debug_call";

/// Call a custom method, mapping "method not found" to `UnsupportedOperation`.
pub async fn call_extension(
    client: &dyn RpcClient,
    method: &str,
    params: Vec<Value>,
) -> VerifyResult<Value> {
    client.call(method, params).await.map_err(|e| {
        if e.is_method_not_found() {
            VerifyError::UnsupportedOperation {
                method: method.to_string(),
                endpoint: client.endpoint().to_string(),
                cause: e,
            }
        } else {
            VerifyError::Rpc(e)
        }
    })
}

pub fn parse_hash(what: &str, s: &str) -> VerifyResult<H256> {
    s.parse::<H256>()
        .map_err(|e| VerifyError::InvalidArgument(format!("{}: {}", what, e)))
}

pub struct StateDiffFetcher {
    /// Web3-compatible source RPC (hash correlation, replay).
    source_web3: Arc<dyn RpcClient>,
    /// Source RPC serving the state-change extension.
    source_native: Arc<dyn RpcClient>,
    target: Arc<dyn RpcClient>,
}

impl StateDiffFetcher {
    pub fn new(
        source_web3: Arc<dyn RpcClient>,
        source_native: Arc<dyn RpcClient>,
        target: Arc<dyn RpcClient>,
    ) -> Self {
        Self {
            source_web3,
            source_native,
            target,
        }
    }

    /// Source state changes for the block `block_hash`.
    ///
    /// `Ok(None)` means the record is not materialized yet; callers retry.
    pub async fn fetch_source_diff(&self, block_hash: &str) -> VerifyResult<Option<BlockStateChange>> {
        let hash = parse_hash("block hash", block_hash)?;
        let raw = call_extension(
            self.source_native.as_ref(),
            STATE_CHANGES_METHOD,
            vec![json!(hash.to_hex())],
        )
        .await?;
        let diff: Option<BlockStateChange> = decode(STATE_CHANGES_METHOD, raw)?;
        if let Some(d) = &diff {
            debug!(
                block = %hash,
                transactions = d.transactions.len(),
                updated_kvs = d.stat.updated_kv_count,
                "fetched source state changes"
            );
        }
        Ok(diff)
    }

    /// Storage diff of `call` simulated on the target at height `at_block`.
    ///
    /// Usually `at_block` is the migrated block's height minus one, so the diff
    /// reflects exactly the one transaction. `Ok(None)` is the target's explicit
    /// null; an empty diff is `Some` with no slots.
    pub async fn fetch_target_diff(
        &self,
        call: &TransactionRequest,
        at_block: u64,
    ) -> VerifyResult<Option<TargetStorageDiff>> {
        let request = serde_json::to_value(call)
            .map_err(|e| VerifyError::InvalidArgument(format!("call request: {}", e)))?;
        let raw = call_extension(
            self.target.as_ref(),
            DEBUG_CALL_METHOD,
            vec![request, json!(format_quantity(at_block))],
        )
        .await?;
        let diff: Option<TargetStorageDiff> = decode(DEBUG_CALL_METHOD, raw)?;
        if let Some(d) = &diff {
            debug!(at_block, slots = d.slot_count(), "fetched target storage diff");
        }
        Ok(diff)
    }

    /// Source-native hash of the eth transaction `eth_tx_hash`, if indexed yet.
    pub async fn resolve_native_tx_hash(&self, eth_tx_hash: &H256) -> VerifyResult<Option<H256>> {
        let raw = call_extension(
            self.source_web3.as_ref(),
            HASH_CORRELATION_METHOD,
            vec![json!(eth_tx_hash.to_hex())],
        )
        .await?;
        decode(HASH_CORRELATION_METHOD, raw)
    }

    /// Raw replay trace of a source-native transaction, for diagnostics.
    pub async fn debug_replay(&self, native_tx_hash: &H256) -> VerifyResult<Value> {
        call_extension(
            self.source_web3.as_ref(),
            DEBUG_REPLAY_METHOD,
            vec![json!(native_tx_hash.to_hex())],
        )
        .await
    }
}
