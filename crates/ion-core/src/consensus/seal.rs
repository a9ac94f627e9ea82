//! Commit seals carried in the `seal` argument of IBFT and Tendermint
//! submissions.
//!
//! The argument is an RLP list with one entry per committing validator:
//! `[address, signature]` for IBFT and `[address, power, signature]` for
//! Tendermint. Every signature covers `keccak256(block_hash || 0x02)`.

use crate::codec::keccak256_concat;
use crate::codec::rlp::decode_list;
use crate::crypto::signature::{recover_signer, SIGNATURE_LEN};
use crate::error::RelayError;
use crate::types::validator::ValidatorSet;
use alloy_primitives::{Address, B256};
use alloy_rlp::{BufMut, Encodable, Header};
use std::collections::HashSet;

/// Message-type byte appended to the block hash before commit signing.
pub const COMMIT_MSG_TYPE: u8 = 0x02;

/// Digest a validator signs to commit to `block_hash`.
pub fn commit_digest(block_hash: &B256) -> B256 {
    keccak256_concat(&[block_hash.as_slice(), &[COMMIT_MSG_TYPE][..]])
}

/// One validator's commit signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSeal {
    /// The address the submitter claims produced the signature.
    pub validator: Address,
    /// Claimed voting power. Present only for weighted (Tendermint) seals.
    pub power: Option<u64>,
    pub signature: [u8; SIGNATURE_LEN],
}

impl CommitSeal {
    fn payload_length(&self) -> usize {
        self.validator.length()
            + self.power.map_or(0, |p| p.length())
            + self.signature[..].length()
    }
}

impl Encodable for CommitSeal {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.validator.encode(out);
        if let Some(power) = self.power {
            power.encode(out);
        }
        self.signature[..].encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.payload_length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

/// Encode commit seals as the `seal` argument of a submission.
pub fn encode_commit_seals(seals: &[CommitSeal]) -> Vec<u8> {
    let mut out = Vec::new();
    alloy_rlp::encode_list::<_, CommitSeal>(seals, &mut out);
    out
}

/// Parse the `seal` argument. `weighted` selects the three-field form.
pub fn parse_commit_seals(seal: &[u8], weighted: bool) -> Result<Vec<CommitSeal>, RelayError> {
    if seal.is_empty() {
        return Err(RelayError::MalformedSeal {
            reason: "missing commit seals".into(),
        });
    }

    let fields_per_entry = if weighted { 3 } else { 2 };
    decode_list(seal)?
        .iter()
        .map(|entry| {
            let fields = entry.items()?;
            if fields.len() != fields_per_entry {
                return Err(RelayError::MalformedSeal {
                    reason: format!(
                        "commit seal has {} fields, expected {}",
                        fields.len(),
                        fields_per_entry
                    ),
                });
            }
            let power = if weighted {
                Some(fields[1].decode::<u64>()?)
            } else {
                None
            };
            Ok(CommitSeal {
                validator: fields[0].address("commit seal validator")?,
                power,
                signature: fields[fields_per_entry - 1]
                    .fixed::<SIGNATURE_LEN>("commit seal signature")?,
            })
        })
        .collect()
}

/// Signers and voting power accumulated from a set of commit seals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitTally {
    /// Recovered signers in seal order.
    pub signers: Vec<Address>,
    pub power: u128,
}

/// Recover every commit signature over `digest` and check it against `set`.
///
/// Each recovered signer must equal the claimed address, belong to the set,
/// appear once, and (for weighted seals) claim exactly its recorded power.
pub fn tally_commits(
    commits: &[CommitSeal],
    set: &ValidatorSet,
    digest: &B256,
) -> Result<CommitTally, RelayError> {
    let mut seen = HashSet::with_capacity(commits.len());
    let mut tally = CommitTally::default();

    for commit in commits {
        let signer = recover_signer(digest, &commit.signature)?;
        if signer != commit.validator {
            return Err(RelayError::UnauthorizedSigner { signer });
        }
        let Some(power) = set.power_of(&signer) else {
            return Err(RelayError::UnauthorizedSigner { signer });
        };
        if let Some(claimed) = commit.power {
            if claimed != power {
                return Err(RelayError::MalformedSeal {
                    reason: format!(
                        "{} claims voting power {}, recorded {}",
                        signer, claimed, power
                    ),
                });
            }
        }
        if !seen.insert(signer) {
            return Err(RelayError::MalformedSeal {
                reason: format!("duplicate commit from {}", signer),
            });
        }
        tally.signers.push(signer);
        tally.power += power as u128;
    }

    Ok(tally)
}
