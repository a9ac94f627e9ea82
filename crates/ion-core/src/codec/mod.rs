//! Binary encodings of foreign-chain data and canonical hashing.

pub mod extra;
pub mod header;
pub mod rlp;

pub use extra::{ExtraLayout, IstanbulExtra, TrailingExtra};
pub use header::{decode_header, encode_header, encode_header_form};
pub use rlp::RlpItem;

use alloy_primitives::B256;
use thiserror::Error;
use tiny_keccak::{Hasher, Keccak};

/// Errors raised while decoding untrusted byte strings.
/// Each variant is specific enough to diagnose exactly what went wrong.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("RLP decoding failed: {0}")]
    Rlp(String),

    #[error("Truncated RLP item: need {needed} payload bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("{extra} unexpected trailing bytes after RLP item")]
    TrailingBytes { extra: usize },

    #[error("Expected an RLP list, got a byte string")]
    ExpectedList,

    #[error("Expected an RLP byte string, got a list")]
    ExpectedString,

    #[error("Expected {expected} list items, got {got}")]
    ItemCount { expected: usize, got: usize },

    #[error("Invalid length for {field}: expected {expected} bytes, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Extra-data too short: need at least {required} bytes, got {got}")]
    ExtraTooShort { required: usize, got: usize },

    #[error("Invalid Istanbul extra-data: {reason}")]
    InvalidIstanbulExtra { reason: String },
}

impl From<alloy_rlp::Error> for CodecError {
    fn from(err: alloy_rlp::Error) -> Self {
        CodecError::Rlp(err.to_string())
    }
}

/// Compute keccak256 hash of data.
pub fn keccak256(data: &[u8]) -> B256 {
    keccak256_concat(&[data])
}

/// Compute keccak256 over the concatenation of `parts` without allocating it.
pub fn keccak256_concat(parts: &[&[u8]]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize(&mut output);
    B256::from(output)
}
