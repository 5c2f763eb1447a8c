//! Chain identities, checkpoints and the eth-style request/receipt shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::primitives::{format_quantity, quantity, Address, Bytes, H256};

/// Which side of the migration an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRole {
    Source,
    Target,
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainRole::Source => f.write_str("source"),
            ChainRole::Target => f.write_str("target"),
        }
    }
}

/// An RPC address plus the role it plays. Built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEndpoint {
    pub role: ChainRole,
    /// Human-readable name used in logs and reports.
    #[serde(default)]
    pub label: String,
    pub url: String,
}

impl ChainEndpoint {
    pub fn new(role: ChainRole, label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            role,
            label: label.into(),
            url: url.into(),
        }
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::new(ChainRole::Source, "source", url)
    }

    pub fn target(url: impl Into<String>) -> Self {
        Self::new(ChainRole::Target, "target", url)
    }

    pub fn name(&self) -> &str {
        if self.label.is_empty() {
            match self.role {
                ChainRole::Source => "source",
                ChainRole::Target => "target",
            }
        } else {
            &self.label
        }
    }
}

impl fmt::Display for ChainEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.url)
    }
}

/// An observed block on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCheckpoint {
    pub height: u64,
    pub hash: H256,
}

/// Block selector for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
    #[default]
    Latest,
    Number(u64),
}

impl BlockTag {
    pub fn to_param(self) -> Value {
        match self {
            BlockTag::Latest => Value::String("latest".to_string()),
            BlockTag::Number(n) => Value::String(format_quantity(n)),
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Latest => f.write_str("latest"),
            BlockTag::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Call or transaction request in eth JSON-RPC shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Bytes::is_empty")]
    pub data: Bytes,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "quantity::opt"
    )]
    pub value: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "quantity::opt"
    )]
    pub gas: Option<u64>,
}

impl TransactionRequest {
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to: Some(to),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }
}

/// The subset of an eth transaction receipt the verifier reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: H256,
    pub block_hash: H256,
    #[serde(with = "quantity")]
    pub block_number: u64,
    #[serde(default, with = "quantity::opt")]
    pub status: Option<u64>,
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub contract_address: Option<Address>,
}

impl TransactionReceipt {
    /// Pre-Byzantium receipts carry no status; treat them as successful.
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }

    pub fn checkpoint(&self) -> BlockCheckpoint {
        BlockCheckpoint {
            height: self.block_number,
            hash: self.block_hash,
        }
    }
}

/// Header fields of `eth_getBlockByNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockHeader {
    #[serde(with = "quantity")]
    pub number: u64,
    pub hash: H256,
}

impl From<BlockHeader> for BlockCheckpoint {
    fn from(h: BlockHeader) -> Self {
        BlockCheckpoint {
            height: h.number,
            hash: h.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_request_wire_shape() {
        let to: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let req = TransactionRequest::call(to, vec![0xde, 0xad]).with_gas(21000);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "to": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                "data": "0xdead",
                "gas": "0x5208"
            })
        );
    }

    #[test]
    fn test_receipt_decoding() {
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockHash": format!("0x{}", "22".repeat(32)),
            "blockNumber": "0x10",
            "status": "0x0",
            "from": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
            "to": null,
            "contractAddress": null,
            "logs": []
        });
        let receipt: TransactionReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert!(!receipt.succeeded());
        assert_eq!(receipt.checkpoint().height, 16);
        assert!(receipt.to.is_none());
    }

    #[test]
    fn test_block_tag_param() {
        assert_eq!(BlockTag::Latest.to_param(), json!("latest"));
        assert_eq!(BlockTag::Number(31).to_param(), json!("0x1f"));
    }
}
