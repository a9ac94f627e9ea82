use crate::codec::keccak256;
use crate::error::RelayError;
use crate::types::chain::Scheme;
use alloy_primitives::{Address, B256};
use alloy_rlp::{BufMut, Encodable, Header};
use serde::{Deserialize, Serialize};

/// A single validator and its voting power.
/// Clique and IBFT validators always have power 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub address: Address,
    pub power: u64,
}

impl Validator {
    pub fn new(address: Address, power: u64) -> Self {
        Self { address, power }
    }
}

impl Encodable for Validator {
    fn encode(&self, out: &mut dyn BufMut) {
        Header {
            list: true,
            payload_length: self.address.length() + self.power.length(),
        }
        .encode(out);
        self.address.encode(out);
        self.power.encode(out);
    }

    fn length(&self) -> usize {
        let payload_length = self.address.length() + self.power.length();
        payload_length + alloy_rlp::length_of_length(payload_length)
    }
}

const ABI_WORD: usize = 32;

fn abi_word(value: u64) -> [u8; ABI_WORD] {
    let mut word = [0u8; ABI_WORD];
    word[ABI_WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

/// A non-empty set of validators kept sorted ascending by address bytes.
///
/// Sorting by raw bytes gives the same order as sorting lower-case hex
/// strings, so the derived roots are independent of address checksum casing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Validator>", into = "Vec<Validator>")]
pub struct ValidatorSet {
    validators: Vec<Validator>,
}

impl ValidatorSet {
    /// Build a set, rejecting empty input, duplicate addresses and zero power.
    pub fn new(mut validators: Vec<Validator>) -> Result<Self, RelayError> {
        if validators.is_empty() {
            return Err(RelayError::InvalidValidatorSet {
                reason: "validator set must not be empty".into(),
            });
        }
        validators.sort_by(|a, b| a.address.cmp(&b.address));
        for pair in validators.windows(2) {
            if pair[0].address == pair[1].address {
                return Err(RelayError::InvalidValidatorSet {
                    reason: format!("duplicate validator {}", pair[0].address),
                });
            }
        }
        if let Some(v) = validators.iter().find(|v| v.power == 0) {
            return Err(RelayError::InvalidValidatorSet {
                reason: format!("validator {} has zero voting power", v.address),
            });
        }
        Ok(Self { validators })
    }

    /// Build a set where every validator has power 1.
    pub fn from_addresses<I>(addresses: I) -> Result<Self, RelayError>
    where
        I: IntoIterator<Item = Address>,
    {
        Self::new(
            addresses
                .into_iter()
                .map(|address| Validator::new(address, 1))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Always false: an empty set cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Validator> {
        self.validators.iter()
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.validators.iter().map(|v| v.address).collect()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.position(address).is_some()
    }

    pub fn power_of(&self, address: &Address) -> Option<u64> {
        self.position(address).map(|i| self.validators[i].power)
    }

    fn position(&self, address: &Address) -> Option<usize> {
        self.validators
            .binary_search_by(|v| v.address.cmp(address))
            .ok()
    }

    pub fn total_power(&self) -> u128 {
        self.validators.iter().map(|v| v.power as u128).sum()
    }

    /// Signatures needed for a Clique vote or IBFT commit: `floor(n/2) + 1`.
    pub fn threshold(&self) -> usize {
        self.validators.len() / 2 + 1
    }

    /// Smallest signed power strictly greater than half the total.
    pub fn power_quorum(&self) -> u128 {
        self.total_power() / 2 + 1
    }

    /// Size of the Clique recent-signer window: `floor(n/2)`.
    pub fn recent_window(&self) -> usize {
        self.validators.len() / 2
    }

    /// `keccak256` of the ABI encoding of the sorted addresses as a
    /// dynamic `address[]`: offset word, length word, then one
    /// left-padded word per address.
    pub fn address_root(&self) -> B256 {
        let mut out = Vec::with_capacity(ABI_WORD * (2 + self.validators.len()));
        out.extend_from_slice(&abi_word(ABI_WORD as u64));
        out.extend_from_slice(&abi_word(self.validators.len() as u64));
        for v in &self.validators {
            out.extend_from_slice(&[0u8; ABI_WORD - 20]);
            out.extend_from_slice(v.address.as_slice());
        }
        keccak256(&out)
    }

    /// `keccak256` of the RLP list of `[address, power]` pairs.
    pub fn weighted_root(&self) -> B256 {
        let mut out = Vec::new();
        self.validators.encode(&mut out);
        keccak256(&out)
    }

    /// The root a header of the given scheme commits to.
    pub fn root(&self, scheme: Scheme) -> B256 {
        match scheme {
            Scheme::Clique | Scheme::Ibft => self.address_root(),
            Scheme::Tendermint => self.weighted_root(),
        }
    }

    /// A copy of the set with `address` added at power 1.
    pub fn with_added(&self, address: Address) -> Result<Self, RelayError> {
        let mut validators = self.validators.clone();
        validators.push(Validator::new(address, 1));
        Self::new(validators)
    }

    /// A copy of the set without `address`. Fails if the set would be empty.
    pub fn with_removed(&self, address: &Address) -> Result<Self, RelayError> {
        let validators = self
            .validators
            .iter()
            .filter(|v| v.address != *address)
            .copied()
            .collect();
        Self::new(validators)
    }
}

impl TryFrom<Vec<Validator>> for ValidatorSet {
    type Error = RelayError;

    fn try_from(validators: Vec<Validator>) -> Result<Self, Self::Error> {
        Self::new(validators)
    }
}

impl From<ValidatorSet> for Vec<Validator> {
    fn from(set: ValidatorSet) -> Self {
        set.validators
    }
}
