//! Fixtures and block builders shared by unit tests.

use crate::codec::extra::{build_trailing_extra, IstanbulExtra, SEAL_LEN, VANITY_LEN};
use crate::codec::header::{encode_header, encode_header_form};
use crate::codec::{keccak256, ExtraLayout};
use crate::consensus::clique::{NONCE_AUTH, NONCE_DROP};
use crate::consensus::seal::{commit_digest, encode_commit_seals, CommitSeal};
use crate::crypto::signature::public_key_to_address;
use crate::types::header::BlockHeader;
use alloy_primitives::{Address, Bytes, B256, U256};
use k256::ecdsa::SigningKey;

/// Block 1 of a four-validator Istanbul network, RLP encoded as returned by
/// the node (proposer seal present, committed seals stripped).
pub(crate) const IBFT_BLOCK_1_RLP: &str = concat!(
    "f902b1a0a4db1d14ac6d264cb0b30c6b3a641b634cb78b31747e7533403c3f54b0f78b43a01dcc4de8dec75d",
    "7aab85b567b6ccd41ad312451b948a7413f0a142fd40d493479413ef33419a28f3d7fdc922b8a8696b4a5002",
    "050ba030e982d38e5e6ea77f130d8657649120d22fa240ab3ab2beea1212b534a9d5d6a056e81f171bcc55a6",
    "ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421a056e81f171bcc55a6ff8345e692c0f86e5b48e0",
    "1b996cadc001622fb5e363b421b90100",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "01018347c94c80845c5c598cb8bcd883010814846765746888676f312e31302e34856c696e75780000000000",
    "0000f89af85494287d1058a7ae485552b9d18627570f8a46c4c9249413ef33419a28f3d7fdc922b8a8696b4a",
    "5002050b94f66aa7edb3b19cdf2486689039ad5af7bfae1471941e393c46d7cffc50c66a72067277bd9744a9",
    "6c5cb841e4db88ad7c924cd9c690affd756113bb82209a335eb7af9a3c88f372b36efa914e545de5bc755506",
    "f92b85dc4dafe0aace5d35453a1d29e738e7716f0367d2a900c0a063746963616c2062797a616e74696e6520",
    "6661756c7420746f6c6572616e6365880000000000000000",
    );

/// Deterministic test key with secret `[n; 32]`.
pub(crate) fn test_key(n: u8) -> SigningKey {
    SigningKey::from_slice(&[n; 32]).unwrap()
}

pub(crate) fn address_of(key: &SigningKey) -> Address {
    public_key_to_address(key.verifying_key())
}

/// Sign a 32-byte digest, returning `r || s || v` with `v` in {0, 1}.
pub(crate) fn sign_hash(key: &SigningKey, hash: &B256) -> [u8; 65] {
    let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_slice()).unwrap();
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&signature.to_bytes());
    out[64] = recovery_id.to_byte();
    out
}

/// Encodings handed to `submit_block`.
#[derive(Clone, Debug)]
pub(crate) struct TestBlock {
    pub unsigned: Vec<u8>,
    pub signed: Vec<u8>,
    pub seal: Vec<u8>,
    pub hash: B256,
}

pub(crate) fn base_header(parent: B256, number: u64) -> BlockHeader {
    BlockHeader {
        parent_hash: parent,
        state_root: keccak256(&number.to_be_bytes()),
        transactions_root: B256::repeat_byte(0x01),
        receipts_root: B256::repeat_byte(0x02),
        difficulty: U256::from(2u64),
        number,
        gas_limit: 8_000_000,
        timestamp: number.wrapping_mul(5).wrapping_add(1_600_000_000),
        ..Default::default()
    }
}

/// Seal a trailing-layout header over the hash of its unsigned form.
fn seal_trailing(signer: &SigningKey, mut header: BlockHeader, body: &[u8]) -> (Vec<u8>, Vec<u8>) {
    header.extra_data = build_trailing_extra(&[0u8; VANITY_LEN], body, &[0u8; SEAL_LEN]);
    let unsigned = encode_header_form(&header, false, ExtraLayout::Trailing).unwrap();
    let seal = sign_hash(signer, &keccak256(&unsigned));
    header.extra_data = build_trailing_extra(&[0u8; VANITY_LEN], body, &seal);
    (unsigned, encode_header(&header))
}

/// A Clique header sealed by `signer`, optionally casting a vote.
/// `signers` is the checkpoint signer list (empty off-checkpoint).
pub(crate) fn clique_block(
    signer: &SigningKey,
    parent: B256,
    number: u64,
    signers: &[Address],
    vote: Option<(Address, bool)>,
) -> TestBlock {
    let mut header = base_header(parent, number);
    if let Some((target, authorize)) = vote {
        header.beneficiary = target;
        header.nonce = if authorize { NONCE_AUTH } else { NONCE_DROP };
    }
    seal_clique(signer, header, signers)
}

/// Seal an arbitrary header the Clique way.
pub(crate) fn seal_clique(signer: &SigningKey, header: BlockHeader, signers: &[Address]) -> TestBlock {
    let mut sorted = signers.to_vec();
    sorted.sort();
    let body: Vec<u8> = sorted.iter().flat_map(|a| a.as_slice().to_vec()).collect();
    let (unsigned, signed) = seal_trailing(signer, header, &body);
    TestBlock {
        hash: keccak256(&signed),
        unsigned,
        signed,
        seal: Vec::new(),
    }
}

/// An Istanbul header proposed by `proposer`, listing `validators`, with
/// commit seals from each of `committers`.
pub(crate) fn ibft_block(
    proposer: &SigningKey,
    committers: &[&SigningKey],
    validators: &[Address],
    parent: B256,
    number: u64,
) -> TestBlock {
    let mut header = base_header(parent, number);
    header.beneficiary = address_of(proposer);
    let mut extra = IstanbulExtra {
        vanity: [0u8; VANITY_LEN],
        validators: validators.to_vec(),
        seal: Bytes::new(),
        committed_seals: Vec::new(),
    };
    header.extra_data = extra.to_bytes();
    let unsigned = encode_header(&header);
    let seal = sign_hash(proposer, &keccak256(keccak256(&unsigned).as_slice()));
    extra.seal = Bytes::copy_from_slice(&seal);
    header.extra_data = extra.to_bytes();
    let signed = encode_header(&header);
    let hash = keccak256(&signed);

    let commits: Vec<CommitSeal> = committers
        .iter()
        .map(|key| CommitSeal {
            validator: address_of(key),
            power: None,
            signature: sign_hash(key, &commit_digest(&hash)),
        })
        .collect();

    TestBlock {
        unsigned,
        signed,
        seal: encode_commit_seals(&commits),
        hash,
    }
}

/// A Tendermint header committing to `next_root`, proposed by `proposer`
/// and committed by `committers` with their claimed voting power.
pub(crate) fn tendermint_block(
    proposer: &SigningKey,
    committers: &[(&SigningKey, u64)],
    next_root: B256,
    parent: B256,
    number: u64,
) -> TestBlock {
    let mut header = base_header(parent, number);
    header.beneficiary = address_of(proposer);
    let (unsigned, signed) = seal_trailing(proposer, header, next_root.as_slice());
    let hash = keccak256(&signed);

    let commits: Vec<CommitSeal> = committers
        .iter()
        .map(|(key, power)| CommitSeal {
            validator: address_of(key),
            power: Some(*power),
            signature: sign_hash(key, &commit_digest(&hash)),
        })
        .collect();

    TestBlock {
        unsigned,
        signed,
        seal: encode_commit_seals(&commits),
        hash,
    }
}
