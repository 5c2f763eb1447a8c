//! Reconciliation of source state changes against target storage.
//!
//! Two directions are checked independently:
//!
//! - [`reconcile_transaction`]: every slot in the target's simulated diff must
//!   appear as an `account_state` write in the source transaction (target is a
//!   subset of source).
//! - [`reconcile_live`]: every slot the source block wrote must read back the
//!   same value from live target storage (source is a subset of target).
//!
//! Only eth transactions take part; other kinds are source-internal
//! bookkeeping with no storage analogue on the target.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use migration_transport::{EthApi, RpcClient};
use migration_verifier_types::{
    Address, AssertionCategory, BlockStateChange, BlockTag, Bytes, EquivalenceAssertion,
    StateChangeEvent, TargetStorageDiff, TransactionChange, UnverifiableEvent, VerifyResult, H256,
};

/// Reason recorded for events that carry no contract address.
pub const NO_ADDRESS_REASON: &str = "event has no contract address (internal state)";

/// Target diff ⊆ source transaction.
///
/// Produces one assertion per `(address, key, value)` triple of `target_diff`,
/// in the diff's iteration order, so repeated calls yield identical lists.
/// A non-eth `source_tx` yields no assertions.
pub fn reconcile_transaction(
    source_tx: &TransactionChange,
    target_diff: &TargetStorageDiff,
) -> Vec<EquivalenceAssertion> {
    if !source_tx.kind.has_target_storage() {
        debug!(tx = %source_tx.tx_hash, kind = ?source_tx.kind, "skipping non-eth transaction");
        return Vec::new();
    }

    target_diff
        .triples()
        .map(|(address, key, value)| {
            let found = source_tx.events.iter().any(|e| e.writes(address, key, value));
            let source_value = source_tx
                .last_write(address, key)
                .map(|e| e.value.clone())
                .unwrap_or_default();
            let assertion = EquivalenceAssertion::verdict(
                AssertionCategory::StorageDiff,
                format!(
                    "target write {}[{}] present in source tx {}",
                    address, key, source_tx.tx_hash
                ),
                Bytes::from(*value),
                source_value,
                found,
            );
            if !found {
                warn!(%address, %key, %value, tx = %source_tx.tx_hash, "target write missing from source");
            }
            assertion
        })
        .collect()
}

/// Outcome of the live-storage pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveReconciliation {
    pub assertions: Vec<EquivalenceAssertion>,
    pub unverifiable: Vec<UnverifiableEvent>,
}

/// The final write to one slot across a block.
struct FinalWrite<'a> {
    tx_hash: H256,
    event: &'a StateChangeEvent,
}

/// Source block ⊆ live target storage.
///
/// Slots are read at `tag`. A slot written several times in the block is
/// compared once, against its last write. Events without an address are
/// listed as unverifiable instead of being passed.
pub async fn reconcile_live(
    source_diff: &BlockStateChange,
    target: &dyn RpcClient,
    tag: BlockTag,
) -> VerifyResult<LiveReconciliation> {
    let mut out = LiveReconciliation::default();
    let mut finals: BTreeMap<(Address, H256), FinalWrite<'_>> = BTreeMap::new();

    for tx in source_diff.comparable_transactions() {
        for event in tx.account_state_events() {
            match event.address {
                Some(address) => {
                    finals.insert(
                        (address, event.key),
                        FinalWrite {
                            tx_hash: tx.tx_hash,
                            event,
                        },
                    );
                }
                None => out.unverifiable.push(UnverifiableEvent {
                    tx_hash: tx.tx_hash,
                    event_id: event.id,
                    key: event.key,
                    reason: NO_ADDRESS_REASON.to_string(),
                }),
            }
        }
    }

    for ((address, key), write) in &finals {
        let live = target.storage_at(address, key, tag).await?;
        let expected = write
            .event
            .value_word()
            .map(Bytes::from)
            .unwrap_or_else(|| write.event.value.clone());
        let assertion = EquivalenceAssertion::compare(
            AssertionCategory::LiveStorage,
            format!(
                "{}[{}] on target matches source tx {} event #{}",
                address, key, write.tx_hash, write.event.id
            ),
            expected,
            live,
        );
        if !assertion.passed {
            warn!(%address, %key, tx = %write.tx_hash, "live target storage differs from source");
        }
        out.assertions.push(assertion);
    }

    debug!(
        compared = out.assertions.len(),
        unverifiable = out.unverifiable.len(),
        "live storage reconciliation done"
    );
    Ok(out)
}

/// Assert that `address.storage[key]` was written by both diffs with the same value.
pub fn assert_slot_written(
    description: &str,
    source_tx: &TransactionChange,
    target_diff: &TargetStorageDiff,
    address: &Address,
    key: &H256,
) -> EquivalenceAssertion {
    let target_value = target_diff
        .accounts
        .iter()
        .filter(|acct| &acct.address == address)
        .find_map(|acct| acct.modified_storage.get(key))
        .map(|v| Bytes::from(*v))
        .unwrap_or_default();
    let source_value = source_tx
        .last_write(address, key)
        .map(|e| e.value_word().map(Bytes::from).unwrap_or_else(|| e.value.clone()))
        .unwrap_or_default();
    let passed = !source_value.is_empty() && source_value == target_value;
    EquivalenceAssertion::verdict(
        AssertionCategory::StorageDiff,
        format!("{} ({}[{}]) written on both chains", description, address, key),
        source_value,
        target_value,
        passed,
    )
}
