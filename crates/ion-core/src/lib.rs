//! # Ion Core
//!
//! Pure Rust verification logic for a cross-chain relay.
//!
//! This crate contains **no networking code** and **no WASM dependencies**.
//! A relay instance tracks the header chains of registered foreign chains,
//! checks every submitted header against that chain's validator set, and
//! answers inclusion-proof queries against roots it has already accepted.
//!
//! ## Trust Model
//!
//! - **Consensus verification** (`consensus` module): Clique single-signer
//!   rotation, IBFT commit quorums and Tendermint voting-power majorities.
//!   Trusts that the registered genesis validator set is honest and that
//!   transitions are signed by the set being replaced.
//!
//! - **Proof verification** (`proofs` module): sorted-pair Merkle paths and
//!   Merkle-Patricia trie proofs. Zero trust assumptions beyond the root
//!   being checked against.
//!
//! ## Usage
//!
//! ```ignore
//! use ion_core::{ChainRegistry, RelayConfig, Scheme, ValidatorSet};
//!
//! let mut registry = ChainRegistry::new(RelayConfig::default())?;
//! registry.register_chain(chain_id, Scheme::Ibft, validators, genesis_hash, None)?;
//! let accepted = registry.submit_block(chain_id, &unsigned, &signed, &seal, None)?;
//! ```

pub mod codec;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod proofs;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types for convenience
pub use codec::{keccak256, CodecError};
pub use config::{ConfigError, RelayConfig};
pub use consensus::{validators::ValidatorTracker, ConsensusEngine, Verdict};
pub use crypto::signature::{recover_signer, SignatureError};
pub use error::RelayError;
pub use proofs::{
    merkle::{MerkleError, MerklePath, MerkleTree, PathNode},
    patricia::verify_proof as verify_patricia_proof,
};
pub use registry::{
    BlockStore, BlockSubmission, ChainRegistry, EventSink, MemoryBlockStore, RelayEvent,
};
pub use types::{
    chain::{ChainId, HeaderMeta, Scheme, TrieKind},
    header::BlockHeader,
    validator::{Validator, ValidatorSet},
};
