//! Minimal EVM ABI encoding for the verification scenarios.
//!
//! Only static argument types are needed: every argument is a single
//! 32-byte word appended after the 4-byte Keccak-256 selector.

use sha3::{Digest, Keccak256};

use migration_verifier_types::{Address, Bytes, H256};

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// `keccak256(signature)[0..4]`, e.g. `selector("balanceOf(address)")`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// One ABI argument word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Word(H256),
}

impl Token {
    pub fn to_word(self) -> [u8; 32] {
        let mut word = [0u8; 32];
        match self {
            Token::Uint(n) => word[16..].copy_from_slice(&n.to_be_bytes()),
            Token::Address(a) => word[12..].copy_from_slice(a.as_bytes()),
            Token::Word(w) => word = w.0,
        }
        word
    }
}

/// Selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = Vec::with_capacity(4 + 32 * args.len());
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.to_word());
    }
    Bytes::from(data)
}

/// Storage slot of `mapping[key]` for a mapping declared at `slot`.
pub fn mapping_slot(key: Token, slot: u64) -> H256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(&key.to_word());
    preimage[32..].copy_from_slice(&Token::Uint(slot as u128).to_word());
    H256(keccak256(&preimage))
}
