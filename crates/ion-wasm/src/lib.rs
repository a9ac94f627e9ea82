//! # Ion WASM
//!
//! WebAssembly bindings for the Ion cross-chain relay.
//! This crate bridges `ion-core`'s pure Rust verification logic to JavaScript
//! via `wasm-bindgen`.
//!
//! ## Architecture
//!
//! - All header, signature and proof verification happens in Rust/WASM
//! - Byte values cross the boundary as `0x`-prefixed hex strings; structured
//!   results come back as JS objects
//! - Raw `eth_getBlockByNumber` JSON is accepted and converted internally
//! - This crate never fetches data; callers hand it what they fetched

mod rpc_block;
mod state;

use alloy_primitives::Address;
use ion_core::registry::BlockAccepted;
use ion_core::{
    BlockSubmission, ChainRegistry, MerklePath, RelayConfig, RelayError, RelayEvent, Scheme,
    TrieKind, Validator, ValidatorSet,
};
use rpc_block::{hex_to_b256, hex_to_bytes, RpcBlock};
use serde::{Deserialize, Serialize};
use state::RelayStats;
use wasm_bindgen::prelude::*;

/// Set up panic hook on WASM initialization.
/// This ensures Rust panics are logged to the browser console with full stack traces.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// The relay as seen from JavaScript: registered chains, their verified
/// header chains and the proof checks that run against them.
#[wasm_bindgen]
pub struct IonRelay {
    registry: ChainRegistry,
    stats: RelayStats,
}

#[wasm_bindgen]
impl IonRelay {
    /// Create a relay. `config_json` is a JSON `RelayConfig`; omitted fields
    /// take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<IonRelay, JsValue> {
        let config = match config_json {
            Some(json) => RelayConfig::from_json(&json).map_err(to_js)?,
            None => RelayConfig::default(),
        };
        let mut registry = ChainRegistry::new(config).map_err(to_js)?;
        registry.subscribe(|event: &RelayEvent| log_event(event));

        log_to_console("[Ion] Relay initialized");
        Ok(IonRelay {
            registry,
            stats: RelayStats::new(),
        })
    }

    /// Register a foreign chain.
    ///
    /// scheme: "clique", "ibft" (or "istanbul") or "tendermint"
    /// validators_json: either `["0x..", ...]` (power 1 each) or
    /// `[{"address": "0x..", "power": 10}, ...]`
    ///
    /// The genesis hash and validator set are the trust anchor: every later
    /// header is checked against what is registered here.
    pub fn register_chain(
        &mut self,
        chain_id: &str,
        scheme: &str,
        validators_json: &str,
        genesis_hash: &str,
    ) -> Result<JsValue, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let scheme: Scheme = scheme.parse().map_err(|e: String| JsValue::from_str(&e))?;
        let validators = parse_validators(validators_json)?;
        let genesis_hash =
            hex_to_b256(genesis_hash).map_err(|e| prefixed("Invalid genesis hash", e))?;

        let event = self
            .registry
            .register_chain(chain_id, scheme, validators, genesis_hash, None)
            .map_err(to_js)?;
        self.stats.chains_registered += 1;
        to_value(&event)
    }

    /// Verify one header and append it to the chain.
    ///
    /// unsigned / signed: hex RLP of the header's two forms
    /// seal: hex seal argument (commit seals; empty for Clique)
    /// candidate_json: optional validator set the header hands over to
    pub fn submit_block(
        &mut self,
        chain_id: &str,
        unsigned: &str,
        signed: &str,
        seal: &str,
        candidate_json: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let unsigned = hex_to_bytes(unsigned).map_err(|e| prefixed("Invalid unsigned header", e))?;
        let signed = hex_to_bytes(signed).map_err(|e| prefixed("Invalid signed header", e))?;
        let seal = hex_to_bytes(seal).map_err(|e| prefixed("Invalid seal", e))?;
        let candidate = candidate_json.as_deref().map(parse_validators).transpose()?;

        let result = self
            .registry
            .submit_block(chain_id, &unsigned, &signed, &seal, candidate.as_ref())
            .map(|accepted| vec![accepted]);
        self.finish_submission(result)
    }

    /// Verify and append a batch atomically.
    ///
    /// submissions_json: `[{"unsigned": "0x..", "signed": "0x..",
    /// "seal": "0x..", "candidate": [...]}, ...]`
    pub fn submit_blocks(&mut self, chain_id: &str, submissions_json: &str) -> Result<JsValue, JsValue> {
        let submissions: Vec<BlockSubmission> = serde_json::from_str(submissions_json)
            .map_err(|e| prefixed("Invalid submissions JSON", e))?;
        self.submit(chain_id, submissions)
    }

    /// Verify and append a block given as raw `eth_getBlockByNumber` JSON.
    ///
    /// For IBFT the commit seals are taken from the block itself. Tendermint
    /// commits live outside the header and must be passed as `seal`.
    pub fn submit_rpc_block(
        &mut self,
        chain_id: &str,
        block_json: &str,
        seal: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let scheme = self.registry.scheme(&id).map_err(to_js)?;
        let block: RpcBlock =
            serde_json::from_str(block_json).map_err(|e| prefixed("Invalid block JSON", e))?;
        let mut submission = block
            .to_submission(scheme)
            .map_err(|e| prefixed("Block conversion", e))?;
        if let Some(seal) = seal {
            submission = submission.with_seal(hex_to_bytes(&seal).map_err(|e| prefixed("Invalid seal", e))?);
        }
        self.submit(chain_id, vec![submission])
    }

    /// Hash of the latest accepted header (the genesis anchor until the
    /// first header is accepted).
    pub fn get_head(&self, chain_id: &str) -> Result<String, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let head = self.registry.get_head(&chain_id).map_err(to_js)?;
        Ok(format!("0x{}", hex::encode(head)))
    }

    /// Metadata of an accepted header: number, parent and trie roots.
    pub fn get_header(&self, chain_id: &str, block_hash: &str) -> Result<JsValue, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let block_hash = hex_to_b256(block_hash).map_err(|e| prefixed("Invalid block hash", e))?;
        let meta = self.registry.get_header(&chain_id, &block_hash).map_err(to_js)?;
        to_value(meta)
    }

    pub fn get_validators_root(&self, chain_id: &str) -> Result<String, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let root = self.registry.get_validators_root(&chain_id).map_err(to_js)?;
        Ok(format!("0x{}", hex::encode(root)))
    }

    /// The current validator set as `[{address, power}]`.
    pub fn current_validators(&self, chain_id: &str) -> Result<JsValue, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let set = self.registry.current_set(&chain_id).map_err(to_js)?;
        to_value(set)
    }

    /// Registered chain ids, ascending.
    pub fn chain_ids(&self) -> Vec<String> {
        self.registry
            .chain_ids()
            .into_iter()
            .map(|id| format!("0x{}", hex::encode(id)))
            .collect()
    }

    /// Check a sorted Merkle path.
    ///
    /// path_json: `[{"side": "left", "hash": "0x.."}, ...]`, leaf upward
    pub fn verify_merkle_proof(
        &mut self,
        leaf: &str,
        path_json: &str,
        root: &str,
    ) -> Result<bool, JsValue> {
        let leaf = hex_to_bytes(leaf).map_err(|e| prefixed("Invalid leaf", e))?;
        let path: MerklePath =
            serde_json::from_str(path_json).map_err(|e| prefixed("Invalid path JSON", e))?;
        let root = hex_to_b256(root).map_err(|e| prefixed("Invalid root", e))?;

        let valid = ChainRegistry::verify_merkle_proof(&leaf, &path, &root);
        self.stats.record_proof(valid);
        Ok(valid)
    }

    /// Check a Patricia proof against a root of an accepted header.
    ///
    /// trie: "state", "transactions" (or "tx") or "receipts"
    ///
    /// IMPORTANT: the root comes from the relay's own record of the header.
    /// The caller cannot substitute a root of its choosing.
    pub fn verify_patricia_proof(
        &mut self,
        chain_id: &str,
        block_hash: &str,
        trie: &str,
        value: &str,
        path: &str,
        parent_nodes: &str,
    ) -> Result<bool, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let block_hash = hex_to_b256(block_hash).map_err(|e| prefixed("Invalid block hash", e))?;
        let trie: TrieKind = trie.parse().map_err(|e: String| JsValue::from_str(&e))?;
        let value = hex_to_bytes(value).map_err(|e| prefixed("Invalid value", e))?;
        let path = hex_to_bytes(path).map_err(|e| prefixed("Invalid path", e))?;
        let nodes = hex_to_bytes(parent_nodes).map_err(|e| prefixed("Invalid parent nodes", e))?;

        let valid = self
            .registry
            .verify_patricia_proof(&chain_id, &block_hash, trie, &value, &path, &nodes)
            .map_err(to_js)?;
        self.stats.record_proof(valid);
        Ok(valid)
    }

    /// Check a Patricia proof against an explicit root.
    pub fn verify_patricia_proof_with_root(
        &mut self,
        value: &str,
        path: &str,
        parent_nodes: &str,
        root: &str,
    ) -> Result<bool, JsValue> {
        let value = hex_to_bytes(value).map_err(|e| prefixed("Invalid value", e))?;
        let path = hex_to_bytes(path).map_err(|e| prefixed("Invalid path", e))?;
        let nodes = hex_to_bytes(parent_nodes).map_err(|e| prefixed("Invalid parent nodes", e))?;
        let root = hex_to_b256(root).map_err(|e| prefixed("Invalid root", e))?;

        let valid = ChainRegistry::verify_patricia_proof_with_root(&value, &path, &nodes, &root);
        self.stats.record_proof(valid);
        Ok(valid)
    }

    /// Diagnostic counters as JSON.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        let response = StatsResponse {
            chains: self.registry.chain_ids().len(),
            stats: self.stats.clone(),
            acceptance_rate: self.stats.acceptance_rate(),
        };
        to_value(&response)
    }
}

// --- Response types ---

#[derive(Serialize, Deserialize)]
struct StatsResponse {
    chains: usize,
    stats: RelayStats,
    acceptance_rate: f64,
}

/// Validator sets arrive either as bare addresses or with voting power.
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidatorsInput {
    Addresses(Vec<Address>),
    Weighted(Vec<Validator>),
}

// --- Private helpers ---

impl IonRelay {
    fn submit(
        &mut self,
        chain_id: &str,
        submissions: Vec<BlockSubmission>,
    ) -> Result<JsValue, JsValue> {
        let chain_id = hex_to_b256(chain_id).map_err(|e| prefixed("Invalid chain id", e))?;
        let result = self.registry.submit_blocks(chain_id, &submissions);
        self.finish_submission(result)
    }

    fn finish_submission(
        &mut self,
        result: Result<Vec<BlockAccepted>, RelayError>,
    ) -> Result<JsValue, JsValue> {
        self.stats.record_submission(&result);

        match result {
            Ok(accepted) => to_value(&accepted),
            Err(e) => {
                log_to_console(&format!("[Ion] Submission rejected: {}", e));
                Err(to_js(e))
            }
        }
    }
}

fn parse_validators(json: &str) -> Result<ValidatorSet, JsValue> {
    let input: ValidatorsInput =
        serde_json::from_str(json).map_err(|e| prefixed("Invalid validators JSON", e))?;
    let set = match input {
        ValidatorsInput::Addresses(addresses) => ValidatorSet::from_addresses(addresses),
        ValidatorsInput::Weighted(validators) => ValidatorSet::new(validators),
    };
    set.map_err(to_js)
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn prefixed(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

// --- Console logging ---

fn log_event(event: &RelayEvent) {
    match serde_json::to_string(event) {
        Ok(json) => log_to_console(&format!("[Ion] {}", json)),
        Err(e) => log_to_console(&format!("[Ion] Unserializable event: {}", e)),
    }
}

fn log_to_console(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}
