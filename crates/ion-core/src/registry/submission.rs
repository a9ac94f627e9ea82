use crate::error::RelayError;
use crate::types::validator::ValidatorSet;
use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

/// One header submission: the unsigned and signed encodings, the
/// scheme-specific seal argument and an optional candidate validator set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSubmission {
    pub unsigned: Bytes,
    pub signed: Bytes,
    #[serde(default)]
    pub seal: Bytes,
    #[serde(default)]
    pub candidate: Option<ValidatorSet>,
}

impl BlockSubmission {
    pub fn new(unsigned: impl Into<Bytes>, signed: impl Into<Bytes>) -> Self {
        Self {
            unsigned: unsigned.into(),
            signed: signed.into(),
            ..Default::default()
        }
    }

    pub fn with_seal(mut self, seal: impl Into<Bytes>) -> Self {
        self.seal = seal.into();
        self
    }

    pub fn with_candidate(mut self, candidate: ValidatorSet) -> Self {
        self.candidate = Some(candidate);
        self
    }

    /// Split concatenated header encodings into submissions.
    ///
    /// `offsets` holds the end offset of each header in both buffers. The
    /// resulting submissions carry no seal argument, which suits schemes that
    /// keep the whole seal in the header.
    pub fn split_batch(
        unsigned: &[u8],
        signed: &[u8],
        offsets: &BatchOffsets,
    ) -> Result<Vec<Self>, RelayError> {
        if offsets.unsigned.is_empty() && offsets.signed.is_empty() {
            return Err(RelayError::EmptyInput { what: "batch offsets" });
        }
        if offsets.unsigned.len() != offsets.signed.len() {
            return Err(RelayError::BatchShapeMismatch {
                reason: format!(
                    "{} unsigned offsets but {} signed offsets",
                    offsets.unsigned.len(),
                    offsets.signed.len()
                ),
            });
        }

        let unsigned_parts = split_at_ends(unsigned, &offsets.unsigned, "unsigned")?;
        let signed_parts = split_at_ends(signed, &offsets.signed, "signed")?;
        Ok(unsigned_parts
            .into_iter()
            .zip(signed_parts)
            .map(|(u, s)| Self::new(Bytes::copy_from_slice(u), Bytes::copy_from_slice(s)))
            .collect())
    }
}

/// End offsets of each header within the concatenated batch buffers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOffsets {
    pub unsigned: Vec<usize>,
    pub signed: Vec<usize>,
}

fn split_at_ends<'a>(
    buffer: &'a [u8],
    ends: &[usize],
    which: &str,
) -> Result<Vec<&'a [u8]>, RelayError> {
    let mut parts = Vec::with_capacity(ends.len());
    let mut start = 0usize;
    for &end in ends {
        if end <= start || end > buffer.len() {
            return Err(RelayError::BatchShapeMismatch {
                reason: format!(
                    "{} offset {} is out of order or past the buffer ({} bytes)",
                    which,
                    end,
                    buffer.len()
                ),
            });
        }
        parts.push(&buffer[start..end]);
        start = end;
    }
    if start != buffer.len() {
        return Err(RelayError::BatchShapeMismatch {
            reason: format!(
                "{} buffer has {} bytes after the last offset",
                which,
                buffer.len() - start
            ),
        });
    }
    Ok(parts)
}
