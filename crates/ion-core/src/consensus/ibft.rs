//! Istanbul BFT.
//!
//! The proposer seals `keccak256(unsigned_hash)` into the Istanbul
//! extra-data; at least `floor(n/2) + 1` validators then sign a commit over
//! the block hash. The validator list in the extra-data names the set for
//! the following blocks.

use super::seal::{commit_digest, parse_commit_seals, tally_commits};
use super::{SealedHeader, Verdict};
use crate::codec::extra::IstanbulExtra;
use crate::codec::keccak256;
use crate::crypto::signature::recover_signer;
use crate::error::RelayError;
use crate::types::validator::ValidatorSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Ibft;

impl Ibft {
    pub fn verify(
        &self,
        sealed: &SealedHeader<'_>,
        current: &ValidatorSet,
    ) -> Result<Verdict, RelayError> {
        let extra = IstanbulExtra::parse(&sealed.header.extra_data)?;

        // 1. Proposer seal
        let proposal_hash = keccak256(sealed.unsigned_hash.as_slice());
        let proposer = recover_signer(&proposal_hash, &extra.seal)?;
        if !current.contains(&proposer) {
            return Err(RelayError::UnauthorizedSigner { signer: proposer });
        }

        // 2. Commit quorum
        let commits = parse_commit_seals(sealed.seal, false)?;
        let tally = tally_commits(&commits, current, &commit_digest(&sealed.block_hash))?;
        let required = current.threshold();
        if tally.signers.len() < required {
            return Err(RelayError::InsufficientQuorum {
                got: tally.signers.len() as u128,
                required: required as u128,
            });
        }

        // 3. The header's validator list takes over for the next block
        let listed = ValidatorSet::from_addresses(extra.validators.iter().copied())?;
        if let Some(candidate) = sealed.candidate {
            if candidate.address_root() != listed.address_root() {
                return Err(RelayError::ValidatorsRootMismatch {
                    expected: listed.address_root(),
                    got: candidate.address_root(),
                });
            }
        }

        let mut verdict = Verdict::sealed_by(proposer);
        verdict.signers = tally.signers;
        if listed != *current {
            verdict.next_validators = Some(listed);
        }
        Ok(verdict)
    }
}
