pub mod clique;
pub mod ibft;
pub mod seal;
pub mod tendermint;
pub mod validators;

pub use clique::Clique;
pub use ibft::Ibft;
pub use seal::*;
pub use tendermint::Tendermint;
pub use validators::{ValidatorTracker, Vote, VoteOutcome};

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::types::chain::Scheme;
use crate::types::header::BlockHeader;
use crate::types::validator::ValidatorSet;
use alloy_primitives::{Address, B256};

/// A decoded submission ready for consensus checks.
///
/// By the time an engine sees it, the registry has confirmed that the
/// unsigned encoding is the unsigned form of `header` and that `block_hash`
/// is the hash of its signed form.
#[derive(Clone, Copy, Debug)]
pub struct SealedHeader<'a> {
    pub header: &'a BlockHeader,
    /// Hash of the unsigned form: the proposer seal's preimage.
    pub unsigned_hash: B256,
    /// Hash of the signed form: the block's identity and the commit preimage.
    pub block_hash: B256,
    /// The scheme-specific seal argument.
    pub seal: &'a [u8],
    /// An optional validator set the submitter claims takes over.
    pub candidate: Option<&'a ValidatorSet>,
}

/// The outcome of a successful consensus check. Nothing has been applied yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// The proposer (Clique: the sealer) recovered from the header.
    pub proposer: Address,
    /// Commit signers in seal order. Clique has none beyond the proposer.
    pub signers: Vec<Address>,
    /// A Clique vote cast by the header.
    pub vote: Option<Vote>,
    /// The header is a Clique epoch checkpoint.
    pub checkpoint: bool,
    /// A validator set that replaces the current one once the block is accepted.
    pub next_validators: Option<ValidatorSet>,
}

impl Verdict {
    fn sealed_by(proposer: Address) -> Self {
        Self {
            proposer,
            signers: Vec::new(),
            vote: None,
            checkpoint: false,
            next_validators: None,
        }
    }
}

/// Per-chain consensus rules, one variant per supported scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusEngine {
    Clique(Clique),
    Ibft(Ibft),
    Tendermint(Tendermint),
}

impl ConsensusEngine {
    pub fn new(scheme: Scheme, config: &RelayConfig) -> Self {
        match scheme {
            Scheme::Clique => ConsensusEngine::Clique(Clique::new(
                config.clique_epoch_length,
                config.enforce_recent_signers,
            )),
            Scheme::Ibft => ConsensusEngine::Ibft(Ibft),
            Scheme::Tendermint => ConsensusEngine::Tendermint(Tendermint),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            ConsensusEngine::Clique(_) => Scheme::Clique,
            ConsensusEngine::Ibft(_) => Scheme::Ibft,
            ConsensusEngine::Tendermint(_) => Scheme::Tendermint,
        }
    }

    /// Check a header against the chain's validators without mutating anything.
    pub fn verify(
        &self,
        sealed: &SealedHeader<'_>,
        validators: &ValidatorTracker,
    ) -> Result<Verdict, RelayError> {
        match self {
            ConsensusEngine::Clique(engine) => engine.verify(sealed, validators.current()),
            ConsensusEngine::Ibft(engine) => engine.verify(sealed, validators.current()),
            ConsensusEngine::Tendermint(engine) => engine.verify(sealed, validators.current()),
        }
    }

    /// Apply an accepted verdict: record the sealer, apply any vote and move
    /// to the next validator set. Returns the outcome of a Clique vote.
    pub fn commit(
        &mut self,
        verdict: &Verdict,
        validators: &mut ValidatorTracker,
    ) -> Result<Option<VoteOutcome>, RelayError> {
        match self {
            ConsensusEngine::Clique(engine) => engine.commit(verdict, validators),
            ConsensusEngine::Ibft(_) | ConsensusEngine::Tendermint(_) => {
                if let Some(next) = &verdict.next_validators {
                    validators.transition(next.clone());
                }
                Ok(None)
            }
        }
    }
}
