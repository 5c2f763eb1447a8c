//! Built-in verification scenarios.
//!
//! - [`chain_compatibility`]: `mutate()` on a contract exercising the common
//!   storage shapes, followed by seven typed reads.
//! - [`erc20_transfer`]: `transfer(recipient, amount)` on a token, followed by
//!   `balanceOf(recipient)` and checks on both balance slots.

use chrono::Utc;

use migration_verifier_types::{Address, Bytes, TransactionRequest, H256};

use crate::abi::{encode_call, keccak256, mapping_slot, Token};
use crate::scenario::{NamedCall, ScenarioPlan, TransactionSource, WatchedSlot};
use crate::submit::MutatingTransaction;

pub const CHAIN_COMPATIBILITY: &str = "chain-compatibility";
pub const ERC20_TRANSFER: &str = "erc20-transfer";
pub const RECONCILE_TX: &str = "reconcile-tx";

/// Amount moved by the ERC20 scenario unless overridden.
pub const DEFAULT_TRANSFER_AMOUNT: u128 = 100;

/// The seven reads of the chain-compatibility contract.
pub fn chain_compatibility_reads() -> Vec<(&'static str, Vec<Token>)> {
    vec![
        ("getBool()", vec![]),
        ("getInt()", vec![]),
        ("getUint()", vec![]),
        ("getArray(uint256)", vec![Token::Uint(1)]),
        ("getMapping(uint256)", vec![Token::Uint(1)]),
        ("getString()", vec![]),
        ("getBytes32()", vec![]),
    ]
}

fn read_call(contract: Address, sender: Address, signature: &str, args: &[Token]) -> NamedCall {
    NamedCall {
        description: signature.to_string(),
        request: TransactionRequest::call(contract, encode_call(signature, args)).with_from(sender),
    }
}

fn mutating(request: TransactionRequest, signed: Option<Bytes>) -> TransactionSource {
    TransactionSource::Submit(match signed {
        Some(raw) => MutatingTransaction::presigned(request, raw),
        None => MutatingTransaction::unsigned(request),
    })
}

pub fn chain_compatibility(contract: Address, sender: Address, signed: Option<Bytes>) -> ScenarioPlan {
    let request =
        TransactionRequest::call(contract, encode_call("mutate()", &[])).with_from(sender);
    ScenarioPlan {
        name: CHAIN_COMPATIBILITY.to_string(),
        transaction: mutating(request, signed),
        contract: Some(contract),
        calls: chain_compatibility_reads()
            .iter()
            .map(|(sig, args)| read_call(contract, sender, sig, args))
            .collect(),
        balance_accounts: Vec::new(),
        watched_slots: Vec::new(),
    }
}

/// ERC20 transfer scenario.
///
/// With `balance_slot` set (the declaration slot of the token's balance
/// mapping, 0 for the common layout) both balance entries are watched.
pub fn erc20_transfer(
    token: Address,
    sender: Address,
    recipient: Address,
    amount: u128,
    balance_slot: Option<u64>,
    signed: Option<Bytes>,
) -> ScenarioPlan {
    let request = TransactionRequest::call(
        token,
        encode_call(
            "transfer(address,uint256)",
            &[Token::Address(recipient), Token::Uint(amount)],
        ),
    )
    .with_from(sender);

    let watched_slots = balance_slot
        .map(|slot| {
            vec![
                WatchedSlot {
                    description: "recipient token balance".to_string(),
                    address: token,
                    key: mapping_slot(Token::Address(recipient), slot),
                },
                WatchedSlot {
                    description: "sender token balance".to_string(),
                    address: token,
                    key: mapping_slot(Token::Address(sender), slot),
                },
            ]
        })
        .unwrap_or_default();

    ScenarioPlan {
        name: ERC20_TRANSFER.to_string(),
        transaction: mutating(request, signed),
        contract: Some(token),
        calls: vec![read_call(
            token,
            sender,
            "balanceOf(address)",
            &[Token::Address(recipient)],
        )],
        balance_accounts: Vec::new(),
        watched_slots,
    }
}

/// Verify a transaction that is already mined on the source.
pub fn mined_transaction(
    tx_hash: H256,
    request: TransactionRequest,
    calls: Vec<NamedCall>,
) -> ScenarioPlan {
    ScenarioPlan {
        name: RECONCILE_TX.to_string(),
        contract: request.to,
        transaction: TransactionSource::Mined { tx_hash, request },
        calls,
        balance_accounts: Vec::new(),
        watched_slots: Vec::new(),
    }
}

/// An address nobody holds a key for, distinct per call.
pub fn fresh_address(salt: &[u8]) -> Address {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut preimage = now.to_be_bytes().to_vec();
    preimage.extend_from_slice(salt);
    let hash = keccak256(&preimage);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}
