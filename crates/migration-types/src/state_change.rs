//! Source-chain state-change records.
//!
//! Mirrors the payload of the source node's state-changes-by-block method. Kinds
//! are closed enumerations: an unrecognized `type` string fails deserialization
//! instead of silently falling out of every comparison.

use serde::{Deserialize, Serialize};

use crate::primitives::{Address, Bytes, H256};

/// Kind of a single state-change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AccountState,
    AccountNonce,
    Log,
    Create,
    Destroy,
}

/// Kind of a source transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "meta")]
    Meta,
    #[serde(rename = "sudt")]
    Sudt,
    #[serde(rename = "addressRegistry", alias = "address_registry")]
    AddressRegistry,
    #[serde(rename = "eth")]
    Eth,
    #[serde(rename = "deposit")]
    Deposit,
    #[serde(rename = "withdrawal")]
    Withdrawal,
}

impl TransactionKind {
    /// Only eth transactions have a storage analogue on the target chain.
    pub fn has_target_storage(self) -> bool {
        matches!(self, TransactionKind::Eth)
    }
}

/// One atomic effect of a transaction on the source state tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub id: u64,
    /// Absent for internal state that has no contract address.
    #[serde(default)]
    pub address: Option<Address>,
    pub key: H256,
    /// Raw value; storage writes are a single word, other kinds may be longer.
    pub value: Bytes,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl StateChangeEvent {
    pub fn is_account_state(&self) -> bool {
        self.kind == EventKind::AccountState
    }

    /// The value as a storage word, if it fits in one.
    pub fn value_word(&self) -> Option<H256> {
        H256::from_word(self.value.as_slice())
    }

    /// Whether this event records `address.storage[key] = value`.
    pub fn writes(&self, address: &Address, key: &H256, value: &H256) -> bool {
        self.is_account_state()
            && self.address.as_ref() == Some(address)
            && &self.key == key
            && self.value_word().as_ref() == Some(value)
    }
}

/// All events produced by one source transaction, in causal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChange {
    pub tx_hash: H256,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub events: Vec<StateChangeEvent>,
}

impl TransactionChange {
    pub fn account_state_events(&self) -> impl Iterator<Item = &StateChangeEvent> {
        self.events.iter().filter(|e| e.is_account_state())
    }

    /// Last value written to `address.storage[key]` within this transaction.
    pub fn last_write(&self, address: &Address, key: &H256) -> Option<&StateChangeEvent> {
        self.events.iter().rev().find(|e| {
            e.is_account_state() && e.address.as_ref() == Some(address) && &e.key == key
        })
    }
}

/// Sparse-merkle-tree update statistics reported with a block diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmtStat {
    #[serde(rename = "update_kvs", alias = "updated_kv_count")]
    pub updated_kv_count: u64,
    #[serde(rename = "update_milliseconds", alias = "update_duration_ms")]
    pub update_duration_ms: u64,
}

/// The source chain's canonical diff for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStateChange {
    #[serde(rename = "smt_stat", alias = "stat")]
    pub stat: SmtStat,
    pub transactions: Vec<TransactionChange>,
}

impl BlockStateChange {
    pub fn find_transaction(&self, tx_hash: &H256) -> Option<&TransactionChange> {
        self.transactions.iter().find(|tx| &tx.tx_hash == tx_hash)
    }

    pub fn comparable_transactions(&self) -> impl Iterator<Item = &TransactionChange> {
        self.transactions
            .iter()
            .filter(|tx| tx.kind.has_target_storage())
    }

    pub fn event_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.events.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn word(b: u8) -> String {
        format!("0x{:064x}", b)
    }

    #[test]
    fn test_block_state_change_wire_decoding() {
        let raw = json!({
            "smt_stat": { "update_kvs": 7, "update_milliseconds": 3 },
            "transactions": [
                {
                    "tx_hash": word(0xaa),
                    "type": "addressRegistry",
                    "events": []
                },
                {
                    "tx_hash": word(0xbb),
                    "type": "eth",
                    "events": [
                        { "id": 0, "address": null, "key": word(1), "value": word(2), "type": "account_nonce" },
                        { "id": 1, "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3", "key": word(0), "value": word(100), "type": "account_state" }
                    ]
                }
            ]
        });
        let diff: BlockStateChange = serde_json::from_value(raw).unwrap();
        assert_eq!(diff.stat.updated_kv_count, 7);
        assert_eq!(diff.transactions[0].kind, TransactionKind::AddressRegistry);
        assert_eq!(diff.comparable_transactions().count(), 1);
        assert_eq!(diff.event_count(), 2);

        let tx = diff.find_transaction(&word(0xbb).parse().unwrap()).unwrap();
        assert_eq!(tx.account_state_events().count(), 1);
    }

    #[test]
    fn test_unknown_kind_fails_fast() {
        let raw = json!({
            "tx_hash": word(1),
            "type": "polyjuice",
            "events": []
        });
        assert!(serde_json::from_value::<TransactionChange>(raw).is_err());

        let raw = json!({ "id": 0, "address": null, "key": word(1), "value": word(2), "type": "storage" });
        assert!(serde_json::from_value::<StateChangeEvent>(raw).is_err());
    }

    #[test]
    fn test_writes_and_last_write() {
        let addr: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let key = H256::from_word(&[1]).unwrap();
        let ev = |id, v: u8| StateChangeEvent {
            id,
            address: Some(addr),
            key,
            value: Bytes::new(vec![v]),
            kind: EventKind::AccountState,
        };
        let tx = TransactionChange {
            tx_hash: H256::default(),
            kind: TransactionKind::Eth,
            events: vec![ev(0, 5), ev(1, 9)],
        };
        assert!(tx.events[0].writes(&addr, &key, &H256::from_word(&[5]).unwrap()));
        assert_eq!(tx.last_write(&addr, &key).map(|e| e.id), Some(1));
    }
}
