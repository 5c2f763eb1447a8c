//! Hex-encoded chain primitives.
//!
//! Everything that crosses the JSON-RPC boundary is a `0x`-prefixed hex string.
//! These types parse once at the boundary so the rest of the workspace compares
//! bytes, never strings (checksummed and lowercase addresses are the same key).

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Error produced when a hex identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseHexError {
    pub input: String,
    pub reason: String,
}

impl ParseHexError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseHexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid hex value '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParseHexError {}

pub fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode a hex string, tolerating a missing prefix and odd digit counts
/// (quantities such as `0x1` are legal JSON-RPC encodings).
pub fn decode_hex(s: &str) -> Result<Vec<u8>, ParseHexError> {
    let digits = strip_hex_prefix(s);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseHexError::new(s, "non-hex character"));
    }
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        padded.as_str()
    } else {
        digits
    };
    hex::decode(digits).map_err(|e| ParseHexError::new(s, e.to_string()))
}

pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a JSON-RPC quantity (`0x1a`) into a `u64`.
pub fn parse_quantity(s: &str) -> Result<u64, ParseHexError> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() {
        return Err(ParseHexError::new(s, "empty quantity"));
    }
    u64::from_str_radix(digits, 16).map_err(|e| ParseHexError::new(s, e.to_string()))
}

pub fn format_quantity(n: u64) -> String {
    format!("0x{:x}", n)
}

/// Canonical big-endian bytes of an arbitrary-width quantity, leading zeros
/// stripped. Used for balances, which may not fit a machine integer.
pub fn quantity_bytes(s: &str) -> Result<Bytes, ParseHexError> {
    let raw = decode_hex(s)?;
    let first = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
    Ok(Bytes(raw[first..].to_vec()))
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                encode_hex(&self.0)
            }

            pub fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = strip_hex_prefix(s);
                if digits.len() != $len * 2 {
                    return Err(ParseHexError::new(
                        s,
                        format!("expected {} hex digits, got {}", $len * 2, digits.len()),
                    ));
                }
                let bytes = decode_hex(digits)?;
                Self::from_slice(&bytes).ok_or_else(|| ParseHexError::new(s, "wrong length"))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account address.
    Address,
    20
);

fixed_bytes!(
    /// 32-byte hash, storage key or storage word.
    H256,
    32
);

impl H256 {
    /// Left-pad a value of at most 32 bytes into a storage word.
    pub fn from_word(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > Self::LEN {
            return None;
        }
        let mut out = [0u8; 32];
        out[Self::LEN - bytes.len()..].copy_from_slice(bytes);
        Some(Self(out))
    }

    /// Parse a storage word, accepting short encodings such as `0x0`.
    pub fn parse_word(s: &str) -> Result<Self, ParseHexError> {
        let bytes = decode_hex(s)?;
        Self::from_word(&bytes)
            .ok_or_else(|| ParseHexError::new(s, format!("{} bytes exceeds a word", bytes.len())))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ParseVisitor::<Address>::new("a 20-byte hex address"))
    }
}

// Storage words come back from some nodes without leading zeros, so hashes and
// words share the lenient parse; strict length checks live in `FromStr`.
impl<'de> Deserialize<'de> for H256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WordVisitor;

        impl Visitor<'_> for WordVisitor {
            type Value = H256;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a hex word of at most 32 bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<H256, E> {
                H256::parse_word(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(WordVisitor)
    }
}

struct ParseVisitor<T> {
    expecting: &'static str,
    _marker: std::marker::PhantomData<T>,
}

impl<T> ParseVisitor<T> {
    fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T> Visitor<'_> for ParseVisitor<T>
where
    T: FromStr<Err = ParseHexError>,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        v.parse().map_err(E::custom)
    }
}

/// Variable-length byte string (call data, call results, code).
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.0)
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<H256> for Bytes {
    fn from(h: H256) -> Self {
        Self(h.0.to_vec())
    }
}

impl From<Address> for Bytes {
    fn from(a: Address) -> Self {
        Self(a.0.to_vec())
    }
}

impl FromStr for Bytes {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_hex(s).map(Bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", self.to_hex())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(ParseVisitor::<Bytes>::new("a hex byte string"))
    }
}

/// Serde adapter for JSON-RPC quantities, accepting hex strings or plain numbers.
pub mod quantity {
    use super::{format_quantity, parse_quantity};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(n: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_quantity(*n))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        from_value(Value::deserialize(deserializer)?).map_err(de::Error::custom)
    }

    pub(crate) fn from_value(v: Value) -> Result<u64, String> {
        match v {
            Value::String(s) => parse_quantity(&s).map_err(|e| e.to_string()),
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| format!("quantity {} is not a u64", n)),
            other => Err(format!("expected quantity, got {}", other)),
        }
    }

    pub mod opt {
        use super::super::format_quantity;
        use serde::{de, Deserialize, Deserializer, Serializer};
        use serde_json::Value;

        pub fn serialize<S: Serializer>(n: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
            match n {
                Some(n) => serializer.serialize_str(&format_quantity(*n)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u64>, D::Error> {
            match Option::<Value>::deserialize(deserializer)? {
                None | Some(Value::Null) => Ok(None),
                Some(v) => super::from_value(v).map(Some).map_err(de::Error::custom),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parse_is_case_insensitive() {
        let lower: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let mixed: Address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".parse().unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(lower.to_hex(), "0x5fbdb2315678afecb367f032d93f642f64180aa3");
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(err.reason.contains("expected 40 hex digits"));
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_h256_strict_parse_vs_word_parse() {
        assert!("0x1".parse::<H256>().is_err());
        let word = H256::parse_word("0x1").unwrap();
        assert_eq!(word.0[31], 1);
        assert!(word.0[..31].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_h256_deserialize_pads_short_words() {
        let w: H256 = serde_json::from_str("\"0x64\"").unwrap();
        assert_eq!(w, H256::from_word(&[0x64]).unwrap());
        let too_long = format!("\"0x{}\"", "11".repeat(33));
        assert!(serde_json::from_str::<H256>(&too_long).is_err());
    }

    #[test]
    fn test_quantity_helpers() {
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("0x").is_err());
        assert_eq!(format_quantity(255), "0xff");
        assert_eq!(quantity_bytes("0x00ff").unwrap(), Bytes(vec![0xff]));
        assert_eq!(quantity_bytes("0x0").unwrap(), Bytes(vec![]));
    }

    #[test]
    fn test_decode_hex_odd_length() {
        assert_eq!(decode_hex("0xabc").unwrap(), vec![0x0a, 0xbc]);
        assert_eq!(decode_hex("0x").unwrap(), Vec::<u8>::new());
    }
}
