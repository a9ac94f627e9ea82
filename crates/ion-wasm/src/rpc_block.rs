//! Ethereum JSON-RPC block adapter.
//!
//! `eth_getBlockByNumber` returns headers as JSON with hex-string fields.
//! This module parses that shape and rebuilds the binary encodings
//! `ion-core` verifies:
//!
//! - quantities (`number`, `gasLimit`, ...) are `0x`-prefixed minimal hex
//! - hashes, addresses, bloom and extra-data are `0x`-prefixed hex bytes
//! - Istanbul blocks carry their committed seals inside `extraData`; they
//!   are split out into the separate seal argument

use alloy_primitives::{Address, Bloom, Bytes, B256, B64, U256};
use ion_core::codec::{encode_header_form, ExtraLayout, IstanbulExtra};
use ion_core::consensus::{commit_digest, encode_commit_seals, CommitSeal};
use ion_core::crypto::signature::SIGNATURE_LEN;
use ion_core::{keccak256, recover_signer, BlockHeader, BlockSubmission, Scheme};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Hex conversion helpers
// ---------------------------------------------------------------------------

pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| format!("hex decode: {}", e))
}

fn hex_to_array<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let bytes = hex_to_bytes(s)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| format!("expected {} bytes, got {}", N, bytes.len()))
}

pub fn hex_to_b256(s: &str) -> Result<B256, String> {
    hex_to_array::<32>(s).map(B256::from)
}

pub fn hex_to_address(s: &str) -> Result<Address, String> {
    hex_to_array::<20>(s).map(Address::from)
}

/// Parse a JSON-RPC quantity such as `"0x1b4"`.
pub fn parse_quantity(s: &str) -> Result<u64, String> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("quantity {} is missing the 0x prefix", s))?;
    if digits.is_empty() {
        return Err("empty quantity".into());
    }
    u64::from_str_radix(digits, 16).map_err(|e| format!("parse quantity {}: {}", s, e))
}

// ---------------------------------------------------------------------------
// eth_getBlockByNumber result
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Absent for pending blocks.
    #[serde(default)]
    pub hash: Option<String>,
    pub parent_hash: String,
    #[serde(rename = "sha3Uncles")]
    pub ommers_hash: String,
    pub miner: String,
    pub state_root: String,
    pub transactions_root: String,
    pub receipts_root: String,
    pub logs_bloom: String,
    pub difficulty: String,
    pub number: String,
    pub gas_limit: String,
    pub gas_used: String,
    pub timestamp: String,
    pub extra_data: String,
    pub mix_hash: String,
    pub nonce: String,
}

impl RpcBlock {
    pub fn to_header(&self) -> Result<BlockHeader, String> {
        let bloom = hex_to_array::<256>(&self.logs_bloom).map_err(|e| format!("logsBloom: {}", e))?;
        let difficulty_bytes = hex_to_bytes(&pad_even(&self.difficulty))?;
        if difficulty_bytes.len() > 32 {
            return Err(format!("difficulty is {} bytes", difficulty_bytes.len()));
        }

        Ok(BlockHeader {
            parent_hash: hex_to_b256(&self.parent_hash).map_err(|e| format!("parentHash: {}", e))?,
            ommers_hash: hex_to_b256(&self.ommers_hash).map_err(|e| format!("sha3Uncles: {}", e))?,
            beneficiary: hex_to_address(&self.miner).map_err(|e| format!("miner: {}", e))?,
            state_root: hex_to_b256(&self.state_root).map_err(|e| format!("stateRoot: {}", e))?,
            transactions_root: hex_to_b256(&self.transactions_root)
                .map_err(|e| format!("transactionsRoot: {}", e))?,
            receipts_root: hex_to_b256(&self.receipts_root)
                .map_err(|e| format!("receiptsRoot: {}", e))?,
            logs_bloom: Bloom::from(bloom),
            difficulty: U256::from_be_slice(&difficulty_bytes),
            number: parse_quantity(&self.number)?,
            gas_limit: parse_quantity(&self.gas_limit)?,
            gas_used: parse_quantity(&self.gas_used)?,
            timestamp: parse_quantity(&self.timestamp)?,
            extra_data: Bytes::from(hex_to_bytes(&self.extra_data)?),
            mix_hash: hex_to_b256(&self.mix_hash).map_err(|e| format!("mixHash: {}", e))?,
            nonce: B64::from(hex_to_array::<8>(&self.nonce).map_err(|e| format!("nonce: {}", e))?),
        })
    }

    /// Build the submission for a block of a chain running `scheme`.
    ///
    /// If the node reported a block hash it must match the hash of the
    /// rebuilt signed form. For IBFT the committed seals embedded in
    /// `extraData` become the seal argument, each paired with the address
    /// it recovers to. Other schemes get an empty seal argument.
    pub fn to_submission(&self, scheme: Scheme) -> Result<BlockSubmission, String> {
        let header = self.to_header()?;
        let layout = ExtraLayout::from(scheme);
        let signed = encode_header_form(&header, true, layout).map_err(|e| e.to_string())?;
        let unsigned = encode_header_form(&header, false, layout).map_err(|e| e.to_string())?;
        let block_hash = keccak256(&signed);

        if let Some(reported) = &self.hash {
            let reported = hex_to_b256(reported).map_err(|e| format!("hash: {}", e))?;
            if reported != block_hash {
                return Err(format!(
                    "block hash mismatch: node reported {}, header hashes to {}",
                    reported, block_hash
                ));
            }
        }

        let seal = match scheme {
            Scheme::Ibft => committed_seals(&header, &block_hash)?,
            Scheme::Clique | Scheme::Tendermint => Vec::new(),
        };

        Ok(BlockSubmission::new(unsigned, signed).with_seal(seal))
    }
}

/// Quantities use minimal hex, which `hex::decode` needs padded to whole bytes.
fn pad_even(s: &str) -> String {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() % 2 == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    }
}

fn committed_seals(header: &BlockHeader, block_hash: &B256) -> Result<Vec<u8>, String> {
    let extra = IstanbulExtra::parse(&header.extra_data).map_err(|e| e.to_string())?;
    let digest = commit_digest(block_hash);

    let commits = extra
        .committed_seals
        .iter()
        .enumerate()
        .map(|(i, seal)| {
            let signature = <[u8; SIGNATURE_LEN]>::try_from(&seal[..])
                .map_err(|_| format!("committed seal {} is {} bytes", i, seal.len()))?;
            let validator = recover_signer(&digest, &signature)
                .map_err(|e| format!("committed seal {}: {}", i, e))?;
            Ok(CommitSeal {
                validator,
                power: None,
                signature,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(encode_commit_seals(&commits))
}
