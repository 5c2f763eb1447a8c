//! Typed wrappers over the standard `eth_*` methods.
//!
//! Implemented for every [`RpcClient`], including `dyn RpcClient`, so callers
//! holding an `Arc<dyn RpcClient>` get the typed API for free.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use migration_verifier_types::primitives::{parse_quantity, quantity_bytes};
use migration_verifier_types::{
    Address, BlockCheckpoint, BlockHeader, BlockTag, Bytes, TransactionReceipt,
    TransactionRequest, VerifyError, VerifyResult, H256,
};

use crate::client::RpcClient;

/// Decode a raw result into `T`, mapping failures to `MalformedResponse`.
pub fn decode<T: DeserializeOwned>(method: &str, value: Value) -> VerifyResult<T> {
    serde_json::from_value(value).map_err(|e| VerifyError::malformed(method, e))
}

fn as_str<'a>(method: &str, value: &'a Value) -> VerifyResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| VerifyError::malformed(method, format!("expected hex string, got {}", value)))
}

fn to_param<T: serde::Serialize>(method: &str, v: &T) -> VerifyResult<Value> {
    serde_json::to_value(v).map_err(|e| VerifyError::InvalidArgument(format!("{}: {}", method, e)))
}

#[async_trait]
pub trait EthApi: RpcClient {
    /// `eth_blockNumber`
    async fn block_number(&self) -> VerifyResult<u64> {
        const METHOD: &str = "eth_blockNumber";
        let v = self.call(METHOD, vec![]).await?;
        parse_quantity(as_str(METHOD, &v)?).map_err(|e| VerifyError::malformed(METHOD, e))
    }

    /// `eth_getBlockByNumber` without transaction bodies.
    async fn block_checkpoint(&self, tag: BlockTag) -> VerifyResult<Option<BlockCheckpoint>> {
        const METHOD: &str = "eth_getBlockByNumber";
        let v = self.call(METHOD, vec![tag.to_param(), json!(false)]).await?;
        let header: Option<BlockHeader> = decode(METHOD, v)?;
        Ok(header.map(BlockCheckpoint::from))
    }

    /// `eth_call`
    async fn eth_call(&self, request: &TransactionRequest, tag: BlockTag) -> VerifyResult<Bytes> {
        const METHOD: &str = "eth_call";
        let v = self
            .call(METHOD, vec![to_param(METHOD, request)?, tag.to_param()])
            .await?;
        decode(METHOD, v)
    }

    /// `eth_getStorageAt`
    async fn storage_at(&self, address: &Address, key: &H256, tag: BlockTag) -> VerifyResult<H256> {
        const METHOD: &str = "eth_getStorageAt";
        let v = self
            .call(
                METHOD,
                vec![json!(address.to_hex()), json!(key.to_hex()), tag.to_param()],
            )
            .await?;
        decode(METHOD, v)
    }

    /// `eth_getBalance`, as canonical big-endian bytes.
    async fn balance(&self, address: &Address, tag: BlockTag) -> VerifyResult<Bytes> {
        const METHOD: &str = "eth_getBalance";
        let v = self
            .call(METHOD, vec![json!(address.to_hex()), tag.to_param()])
            .await?;
        quantity_bytes(as_str(METHOD, &v)?).map_err(|e| VerifyError::malformed(METHOD, e))
    }

    /// `eth_getCode`
    async fn code(&self, address: &Address, tag: BlockTag) -> VerifyResult<Bytes> {
        const METHOD: &str = "eth_getCode";
        let v = self
            .call(METHOD, vec![json!(address.to_hex()), tag.to_param()])
            .await?;
        decode(METHOD, v)
    }

    /// `eth_getTransactionReceipt`; `None` while the transaction is pending or unknown.
    async fn transaction_receipt(&self, tx_hash: &H256) -> VerifyResult<Option<TransactionReceipt>> {
        const METHOD: &str = "eth_getTransactionReceipt";
        let v = self.call(METHOD, vec![json!(tx_hash.to_hex())]).await?;
        decode(METHOD, v)
    }

    /// `eth_sendTransaction`, signed by an account the node manages.
    async fn send_transaction(&self, request: &TransactionRequest) -> VerifyResult<H256> {
        const METHOD: &str = "eth_sendTransaction";
        let v = self.call(METHOD, vec![to_param(METHOD, request)?]).await?;
        decode(METHOD, v)
    }

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: &Bytes) -> VerifyResult<H256> {
        const METHOD: &str = "eth_sendRawTransaction";
        let v = self.call(METHOD, vec![json!(raw.to_hex())]).await?;
        decode(METHOD, v)
    }
}

impl<T: RpcClient + ?Sized> EthApi for T {}
