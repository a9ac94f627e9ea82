//! Clique proof-of-authority.
//!
//! Each block carries one seal from an authorized signer in its extra-data.
//! Signers take turns: a signer that sealed one of the last `floor(n/2)`
//! blocks must wait. Validator changes are voted in through the header's
//! beneficiary (target) and nonce (direction) fields, and every epoch
//! checkpoint restates the full signer list and resets the pending votes.

use super::validators::{ValidatorTracker, Vote, VoteOutcome};
use super::{SealedHeader, Verdict};
use crate::codec::extra::TrailingExtra;
use crate::crypto::signature::recover_signer;
use crate::error::RelayError;
use crate::types::header::BlockHeader;
use crate::types::validator::ValidatorSet;
use alloy_primitives::{Address, B64};
use std::collections::VecDeque;

/// Nonce of a vote to authorize the beneficiary.
pub const NONCE_AUTH: B64 = B64::new([0xff; 8]);

/// Nonce of a vote to drop the beneficiary (also used when not voting).
pub const NONCE_DROP: B64 = B64::ZERO;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clique {
    epoch_length: u64,
    enforce_recent_signers: bool,
    /// Sealers of the most recent blocks, oldest first.
    recent: VecDeque<Address>,
}

impl Clique {
    pub fn new(epoch_length: u64, enforce_recent_signers: bool) -> Self {
        Self {
            epoch_length,
            enforce_recent_signers,
            recent: VecDeque::new(),
        }
    }

    pub fn is_checkpoint(&self, number: u64) -> bool {
        self.epoch_length != 0 && number % self.epoch_length == 0
    }

    /// Whether `signer` sealed one of the last `window` accepted blocks.
    pub fn signed_recently(&self, signer: &Address, window: usize) -> bool {
        self.recent.iter().rev().take(window).any(|s| s == signer)
    }

    pub fn recent_signers(&self) -> impl Iterator<Item = &Address> {
        self.recent.iter()
    }

    pub fn verify(
        &self,
        sealed: &SealedHeader<'_>,
        current: &ValidatorSet,
    ) -> Result<Verdict, RelayError> {
        let header = sealed.header;

        if !sealed.seal.is_empty() {
            return Err(RelayError::MalformedSeal {
                reason: "clique headers carry their seal in extra-data".into(),
            });
        }
        if sealed.candidate.is_some() {
            return Err(RelayError::InvalidValidatorSet {
                reason: "clique validator changes are voted in, not submitted".into(),
            });
        }

        // 1. Recover the sealer and check its turn
        let extra = TrailingExtra::parse(&header.extra_data)?;
        let signer = recover_signer(&sealed.unsigned_hash, extra.seal)?;
        if !current.contains(&signer) {
            return Err(RelayError::UnauthorizedSigner { signer });
        }
        if self.enforce_recent_signers && self.signed_recently(&signer, current.recent_window()) {
            return Err(RelayError::RecentlySigned { signer });
        }

        // 2. Checkpoints restate the signer list, other blocks may vote
        let mut verdict = Verdict::sealed_by(signer);
        verdict.signers.push(signer);
        if self.is_checkpoint(header.number) {
            if header.beneficiary != Address::ZERO || header.nonce != NONCE_DROP {
                return Err(RelayError::MalformedSeal {
                    reason: "checkpoint block must not cast a vote".into(),
                });
            }
            let listed = ValidatorSet::from_addresses(extra.body_addresses()?)?;
            if listed.address_root() != current.address_root() {
                return Err(RelayError::ValidatorsRootMismatch {
                    expected: current.address_root(),
                    got: listed.address_root(),
                });
            }
            verdict.checkpoint = true;
        } else {
            if !extra.body.is_empty() {
                return Err(RelayError::MalformedSeal {
                    reason: "signer list outside a checkpoint block".into(),
                });
            }
            verdict.vote = parse_vote(header, signer)?;
        }

        Ok(verdict)
    }

    pub fn commit(
        &mut self,
        verdict: &Verdict,
        validators: &mut ValidatorTracker,
    ) -> Result<Option<VoteOutcome>, RelayError> {
        if verdict.checkpoint {
            validators.clear_votes();
        }
        let outcome = match &verdict.vote {
            Some(vote) => Some(validators.apply_vote(vote)?),
            None => None,
        };

        self.recent.push_back(verdict.proposer);
        let window = validators.current().recent_window();
        while self.recent.len() > window {
            self.recent.pop_front();
        }
        Ok(outcome)
    }
}

/// Read the vote encoded in a non-checkpoint header, if any.
fn parse_vote(header: &BlockHeader, proposer: Address) -> Result<Option<Vote>, RelayError> {
    let authorize = if header.nonce == NONCE_AUTH {
        true
    } else if header.nonce == NONCE_DROP {
        false
    } else {
        return Err(RelayError::MalformedSeal {
            reason: format!("invalid vote nonce {}", header.nonce),
        });
    };

    if header.beneficiary == Address::ZERO {
        return Ok(None);
    }
    Ok(Some(Vote {
        proposer,
        target: header.beneficiary,
        authorize,
    }))
}
