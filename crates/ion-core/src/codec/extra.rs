//! Consensus data packed into a header's `extra_data` field.
//!
//! Two layouts are supported:
//!
//! - **Trailing** (Clique, Tendermint): `vanity(32) || body || seal(65)`.
//!   The unsigned form drops the final 65 bytes.
//! - **Istanbul** (IBFT): `vanity(32) || RLP([validators, seal, committedSeals])`.
//!   The signed form keeps the proposer seal and empties the committed seals;
//!   the unsigned form empties both.

use super::rlp::{decode_list, RlpItem};
use super::CodecError;
use crate::types::chain::Scheme;
use alloy_primitives::{Address, Bytes};
use alloy_rlp::{BufMut, Encodable, Header};

/// Length of the free-form vanity prefix.
pub const VANITY_LEN: usize = 32;

/// Length of a recoverable secp256k1 signature `r || s || v`.
pub const SEAL_LEN: usize = 65;

/// How a scheme lays out consensus data in `extra_data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtraLayout {
    Trailing,
    Istanbul,
}

impl From<Scheme> for ExtraLayout {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Clique | Scheme::Tendermint => ExtraLayout::Trailing,
            Scheme::Ibft => ExtraLayout::Istanbul,
        }
    }
}

impl ExtraLayout {
    /// The extra-data of the unsigned form of a header.
    pub fn unsigned_extra(&self, extra: &[u8]) -> Result<Bytes, CodecError> {
        match self {
            ExtraLayout::Trailing => {
                let parts = TrailingExtra::parse(extra)?;
                Ok(Bytes::copy_from_slice(&extra[..extra.len() - parts.seal.len()]))
            }
            ExtraLayout::Istanbul => {
                let mut parsed = IstanbulExtra::parse(extra)?;
                parsed.seal = Bytes::new();
                parsed.committed_seals.clear();
                Ok(parsed.to_bytes())
            }
        }
    }

    /// The extra-data of the signed (block-hash) form of a header.
    pub fn signed_extra(&self, extra: &[u8]) -> Result<Bytes, CodecError> {
        match self {
            ExtraLayout::Trailing => {
                TrailingExtra::parse(extra)?;
                Ok(Bytes::copy_from_slice(extra))
            }
            ExtraLayout::Istanbul => {
                let mut parsed = IstanbulExtra::parse(extra)?;
                parsed.committed_seals.clear();
                Ok(parsed.to_bytes())
            }
        }
    }
}

/// Borrowed view of trailing-layout extra-data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrailingExtra<'a> {
    pub vanity: &'a [u8],
    /// Clique: empty or a checkpoint signer list. Tendermint: a validators root.
    pub body: &'a [u8],
    pub seal: &'a [u8],
}

impl<'a> TrailingExtra<'a> {
    pub fn parse(extra: &'a [u8]) -> Result<Self, CodecError> {
        let required = VANITY_LEN + SEAL_LEN;
        if extra.len() < required {
            return Err(CodecError::ExtraTooShort {
                required,
                got: extra.len(),
            });
        }
        let seal_start = extra.len() - SEAL_LEN;
        Ok(Self {
            vanity: &extra[..VANITY_LEN],
            body: &extra[VANITY_LEN..seal_start],
            seal: &extra[seal_start..],
        })
    }

    /// Interpret the body as a list of 20-byte addresses.
    pub fn body_addresses(&self) -> Result<Vec<Address>, CodecError> {
        if self.body.len() % 20 != 0 {
            return Err(CodecError::InvalidLength {
                field: "extra-data signer list",
                expected: self.body.len() - self.body.len() % 20,
                got: self.body.len(),
            });
        }
        Ok(self.body.chunks_exact(20).map(Address::from_slice).collect())
    }
}

/// Build trailing-layout extra-data.
pub fn build_trailing_extra(vanity: &[u8; VANITY_LEN], body: &[u8], seal: &[u8; SEAL_LEN]) -> Bytes {
    let mut out = Vec::with_capacity(VANITY_LEN + body.len() + SEAL_LEN);
    out.extend_from_slice(vanity);
    out.extend_from_slice(body);
    out.extend_from_slice(seal);
    out.into()
}

/// Decoded Istanbul extra-data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IstanbulExtra {
    pub vanity: [u8; VANITY_LEN],
    pub validators: Vec<Address>,
    pub seal: Bytes,
    pub committed_seals: Vec<Bytes>,
}

impl IstanbulExtra {
    pub fn parse(extra: &[u8]) -> Result<Self, CodecError> {
        if extra.len() < VANITY_LEN {
            return Err(CodecError::ExtraTooShort {
                required: VANITY_LEN,
                got: extra.len(),
            });
        }
        let mut vanity = [0u8; VANITY_LEN];
        vanity.copy_from_slice(&extra[..VANITY_LEN]);

        let items = decode_list(&extra[VANITY_LEN..])?;
        if items.len() != 3 {
            return Err(CodecError::InvalidIstanbulExtra {
                reason: format!("expected 3 items, got {}", items.len()),
            });
        }

        let validators = items[0]
            .items()?
            .iter()
            .map(|item| item.address("istanbul validator"))
            .collect::<Result<Vec<_>, _>>()?;

        let seal = Bytes::copy_from_slice(items[1].bytes()?);

        let committed_seals = items[2]
            .items()?
            .iter()
            .map(|item: &RlpItem<'_>| item.bytes().map(Bytes::copy_from_slice))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            vanity,
            validators,
            seal,
            committed_seals,
        })
    }

    fn payload_length(&self) -> usize {
        self.validators.length() + self.seal.length() + self.committed_seals.length()
    }

    pub fn encode_into(&self, out: &mut dyn BufMut) {
        out.put_slice(&self.vanity);
        Header {
            list: true,
            payload_length: self.payload_length(),
        }
        .encode(out);
        self.validators.encode(out);
        self.seal.encode(out);
        self.committed_seals.encode(out);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out.into()
    }
}
