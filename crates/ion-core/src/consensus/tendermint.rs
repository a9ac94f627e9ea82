//! Tendermint-style weighted commits.
//!
//! The proposer seals the unsigned header in trailing extra-data whose body
//! is the 32-byte weighted root of the set that signs the next block.
//! Commit signatures must carry a strict majority of voting power:
//! `2 * signed > total`.

use super::seal::{commit_digest, parse_commit_seals, tally_commits};
use super::{SealedHeader, Verdict};
use crate::codec::extra::TrailingExtra;
use crate::codec::CodecError;
use crate::crypto::signature::recover_signer;
use crate::error::RelayError;
use crate::types::validator::ValidatorSet;
use alloy_primitives::B256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tendermint;

impl Tendermint {
    pub fn verify(
        &self,
        sealed: &SealedHeader<'_>,
        current: &ValidatorSet,
    ) -> Result<Verdict, RelayError> {
        let extra = TrailingExtra::parse(&sealed.header.extra_data)?;

        // 1. Proposer seal
        let proposer = recover_signer(&sealed.unsigned_hash, extra.seal)?;
        if !current.contains(&proposer) {
            return Err(RelayError::UnauthorizedSigner { signer: proposer });
        }

        // 2. Voting-power majority
        let commits = parse_commit_seals(sealed.seal, true)?;
        let tally = tally_commits(&commits, current, &commit_digest(&sealed.block_hash))?;
        if tally.power * 2 <= current.total_power() {
            return Err(RelayError::InsufficientQuorum {
                got: tally.power,
                required: current.power_quorum(),
            });
        }

        // 3. Commitment to the next set
        let commitment = validators_commitment(extra.body)?;
        let next_validators = match sealed.candidate {
            Some(candidate) => {
                if candidate.weighted_root() != commitment {
                    return Err(RelayError::ValidatorsRootMismatch {
                        expected: commitment,
                        got: candidate.weighted_root(),
                    });
                }
                (candidate != current).then(|| candidate.clone())
            }
            None => {
                let current_root = current.weighted_root();
                if current_root != commitment {
                    return Err(RelayError::ValidatorsRootMismatch {
                        expected: commitment,
                        got: current_root,
                    });
                }
                None
            }
        };

        let mut verdict = Verdict::sealed_by(proposer);
        verdict.signers = tally.signers;
        verdict.next_validators = next_validators;
        Ok(verdict)
    }
}

fn validators_commitment(body: &[u8]) -> Result<B256, CodecError> {
    B256::try_from(body).map_err(|_| CodecError::InvalidLength {
        field: "validators root commitment",
        expected: 32,
        got: body.len(),
    })
}
