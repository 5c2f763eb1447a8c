//! Target-chain storage diffs produced by a debug call simulation.
//!
//! The target reports one entry per touched account, keyed by the kind of
//! touch (`modify` or `create`). Unlike [`BlockStateChange`](crate::BlockStateChange)
//! there is no ordering guarantee between entries, so consumers must treat the
//! diff as a set of `(address, key, value)` triples.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::primitives::{Address, H256};

/// Storage slots written for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStorageDiff {
    pub address: Address,
    #[serde(alias = "storage", default)]
    pub modified_storage: BTreeMap<H256, H256>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireEntry {
    Modify { modify: AccountStorageDiff },
    Create { create: AccountStorageDiff },
    Flat(AccountStorageDiff),
}

impl From<WireEntry> for AccountStorageDiff {
    fn from(e: WireEntry) -> Self {
        match e {
            WireEntry::Modify { modify } => modify,
            WireEntry::Create { create } => create,
            WireEntry::Flat(diff) => diff,
        }
    }
}

/// Storage diff of a simulated call on the target chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct TargetStorageDiff {
    pub accounts: Vec<AccountStorageDiff>,
}

impl<'de> Deserialize<'de> for TargetStorageDiff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = Vec::<WireEntry>::deserialize(deserializer)?;
        Ok(Self {
            accounts: entries.into_iter().map(AccountStorageDiff::from).collect(),
        })
    }
}

impl TargetStorageDiff {
    pub fn new(accounts: Vec<AccountStorageDiff>) -> Self {
        Self { accounts }
    }

    /// Every written slot. Iteration order is deterministic for a given diff.
    pub fn triples(&self) -> impl Iterator<Item = (&Address, &H256, &H256)> {
        self.accounts.iter().flat_map(|acct| {
            acct.modified_storage
                .iter()
                .map(move |(k, v)| (&acct.address, k, v))
        })
    }

    pub fn slot_count(&self) -> usize {
        self.accounts.iter().map(|a| a.modified_storage.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slot_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_modify_entries() {
        let raw = json!([
            {
                "modify": {
                    "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
                    "storage": {
                        "0x0000000000000000000000000000000000000000000000000000000000000000": "0x0000000000000000000000000000000000000000000000000000000000000001",
                        "0x0000000000000000000000000000000000000000000000000000000000000003": "0x64"
                    }
                }
            },
            {
                "address": "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512",
                "modified_storage": {}
            }
        ]);
        let diff: TargetStorageDiff = serde_json::from_value(raw).unwrap();
        assert_eq!(diff.accounts.len(), 2);
        assert_eq!(diff.slot_count(), 2);
        let values: Vec<u8> = diff.triples().map(|(_, _, v)| v.0[31]).collect();
        assert_eq!(values, vec![1, 0x64]);
    }

    #[test]
    fn test_rejects_unknown_entry_shape() {
        let raw = json!([{ "selfdestruct": { "address": "0x5fbdb2315678afecb367f032d93f642f64180aa3" } }]);
        assert!(serde_json::from_value::<TargetStorageDiff>(raw).is_err());
    }

    #[test]
    fn test_empty_sequence_is_not_null() {
        let diff: Option<TargetStorageDiff> = serde_json::from_value(json!([])).unwrap();
        assert!(diff.as_ref().is_some_and(|d| d.is_empty()));
        let diff: Option<TargetStorageDiff> = serde_json::from_value(json!(null)).unwrap();
        assert!(diff.is_none());
    }
}
