use crate::codec::CodecError;
use crate::crypto::signature::SignatureError;
use crate::types::chain::ChainId;
use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Errors returned by relay operations.
///
/// Consensus rejections (`UnauthorizedSigner`, `InsufficientQuorum`,
/// `WrongParent`, ...) are expected outcomes of adversarial input, not faults.
/// Every variant is reported before any chain state is mutated.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unknown chain {chain_id}")]
    UnknownChain { chain_id: ChainId },

    #[error("Chain {chain_id} is already registered")]
    AlreadyRegistered { chain_id: ChainId },

    #[error("Cannot register the relay's own chain id {chain_id}")]
    SelfRegistration { chain_id: ChainId },

    #[error("Block {block_hash} has already been accepted")]
    DuplicateBlock { block_hash: B256 },

    #[error("Unknown block {block_hash}")]
    UnknownBlock { block_hash: B256 },

    #[error("Malformed encoding: {0}")]
    MalformedEncoding(#[from] CodecError),

    #[error("Invalid signature: {0}")]
    InvalidSignature(#[from] SignatureError),

    #[error("Signer {signer} is not in the current validator set")]
    UnauthorizedSigner { signer: Address },

    #[error("Proposer {proposer} is not in the current validator set")]
    UnauthorizedProposer { proposer: Address },

    #[error("Signer {signer} is inside the recent-signer window")]
    RecentlySigned { signer: Address },

    #[error("Insufficient quorum: got {got}, need at least {required}")]
    InsufficientQuorum { got: u128, required: u128 },

    #[error("Wrong parent: chain head is {expected}, header extends {got}")]
    WrongParent { expected: B256, got: B256 },

    #[error("Invalid block number: expected {expected}, got {got}")]
    InvalidBlockNumber { expected: u64, got: u64 },

    #[error("Validators root mismatch: expected {expected}, got {got}")]
    ValidatorsRootMismatch { expected: B256, got: B256 },

    #[error("Malformed seal: {reason}")]
    MalformedSeal { reason: String },

    #[error("Signed and unsigned headers disagree: {reason}")]
    HeaderMismatch { reason: String },

    #[error("Invalid validator set: {reason}")]
    InvalidValidatorSet { reason: String },

    #[error("Empty input: {what}")]
    EmptyInput { what: &'static str },

    #[error("Batch of {len} headers exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Batch shape mismatch: {reason}")]
    BatchShapeMismatch { reason: String },
}
