use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Opaque 32-byte identifier of a registered foreign chain.
pub type ChainId = B256;

/// Consensus scheme of a foreign chain. Fixed at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Proof-of-authority with a single rotating signer per block.
    Clique,
    /// Istanbul BFT: proposer seal plus a quorum of commit seals.
    Ibft,
    /// Voting-power weighted commit signatures.
    Tendermint,
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::Clique => "clique",
            Scheme::Ibft => "ibft",
            Scheme::Tendermint => "tendermint",
        }
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clique" => Ok(Scheme::Clique),
            "ibft" | "istanbul" => Ok(Scheme::Ibft),
            "tendermint" => Ok(Scheme::Tendermint),
            other => Err(format!("unknown consensus scheme: {}", other)),
        }
    }
}

/// Metadata retained for every accepted header.
///
/// The trie roots are kept so that inclusion proofs can later be checked
/// against a block the relay has verified, never against a caller-supplied root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMeta {
    pub number: u64,
    pub parent_hash: B256,
    pub state_root: B256,
    pub transactions_root: B256,
    pub receipts_root: B256,
    /// Root of the validator set that was current once this block was applied.
    pub validators_root: B256,
    pub timestamp: u64,
}

impl HeaderMeta {
    /// Metadata for the genesis anchor supplied at registration.
    pub fn genesis(validators_root: B256) -> Self {
        Self {
            number: 0,
            parent_hash: B256::ZERO,
            state_root: B256::ZERO,
            transactions_root: B256::ZERO,
            receipts_root: B256::ZERO,
            validators_root,
            timestamp: 0,
        }
    }

    pub fn trie_root(&self, trie: TrieKind) -> B256 {
        match trie {
            TrieKind::State => self.state_root,
            TrieKind::Transactions => self.transactions_root,
            TrieKind::Receipts => self.receipts_root,
        }
    }
}

/// Which root of an accepted header a Patricia proof is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrieKind {
    State,
    Transactions,
    Receipts,
}

impl std::str::FromStr for TrieKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "state" => Ok(TrieKind::State),
            "tx" | "transactions" => Ok(TrieKind::Transactions),
            "receipt" | "receipts" => Ok(TrieKind::Receipts),
            other => Err(format!("unknown trie kind: {}", other)),
        }
    }
}
