use alloy_primitives::{Address, Bloom, Bytes, B256, B64, U256};
use serde::{Deserialize, Serialize};

/// A foreign-chain block header in the legacy fifteen-field Ethereum layout.
///
/// Clique, IBFT and Tendermint-style EVM chains all use this layout and differ
/// only in how they pack consensus data into `extra_data` (see `codec::extra`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: B256,
    pub ommers_hash: B256,
    /// Clique reuses this field as the target of a validator vote.
    pub beneficiary: Address,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: B256,
    /// Clique reuses this field as the vote direction.
    pub nonce: B64,
}

impl BlockHeader {
    /// Number of RLP fields in the encoded header.
    pub const FIELD_COUNT: usize = 15;

    /// Return a copy of this header with `extra_data` replaced.
    pub fn with_extra(&self, extra_data: Bytes) -> Self {
        Self {
            extra_data,
            ..self.clone()
        }
    }
}
