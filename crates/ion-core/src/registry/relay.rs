use super::chain::{vote_event, ChainState, Staged};
use super::events::{BlockAccepted, EventSink, RelayEvent};
use super::store::BlockStore;
use super::submission::{BatchOffsets, BlockSubmission};
use crate::config::{ConfigError, RelayConfig};
use crate::consensus::{ConsensusEngine, Vote, VoteOutcome};
use crate::error::RelayError;
use crate::proofs::merkle::{self, MerklePath};
use crate::proofs::patricia;
use crate::types::chain::{ChainId, HeaderMeta, Scheme, TrieKind};
use crate::types::validator::ValidatorSet;
use alloy_primitives::{Address, B256};
use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The relay: every registered foreign chain, its accepted headers and its
/// validator sets.
///
/// Mutating operations take `&mut self` and either apply completely or leave
/// the registry untouched. Events are delivered to subscribers only after a
/// change has been committed.
pub struct ChainRegistry {
    config: RelayConfig,
    chains: HashMap<ChainId, ChainState>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl fmt::Debug for ChainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRegistry")
            .field("config", &self.config)
            .field("chains", &self.chains.len())
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl ChainRegistry {
    pub fn new(config: RelayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            chains: HashMap::new(),
            sinks: Vec::new(),
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Deliver every future event to `sink`.
    pub fn subscribe(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Deliver every future event to the returned channel.
    pub fn subscribe_channel(&mut self) -> Receiver<RelayEvent> {
        let (tx, rx) = channel();
        self.subscribe(tx);
        rx
    }

    fn emit(&mut self, events: &[RelayEvent]) {
        for event in events {
            for sink in self.sinks.iter_mut() {
                sink.emit(event);
            }
        }
    }

    fn chain(&self, chain_id: &ChainId) -> Result<&ChainState, RelayError> {
        self.chains
            .get(chain_id)
            .ok_or(RelayError::UnknownChain { chain_id: *chain_id })
    }

    // --- Registration ---

    /// Register a foreign chain anchored at `genesis_hash`, trusting
    /// `validators` as its initial set.
    ///
    /// `storage`, if given, receives the signed encoding of every header
    /// accepted for this chain.
    pub fn register_chain(
        &mut self,
        chain_id: ChainId,
        scheme: Scheme,
        validators: ValidatorSet,
        genesis_hash: B256,
        storage: Option<Arc<dyn BlockStore>>,
    ) -> Result<RelayEvent, RelayError> {
        if chain_id == self.config.home_chain_id {
            warn!("Refusing to register the home chain {}", chain_id);
            return Err(RelayError::SelfRegistration { chain_id });
        }
        if self.chains.contains_key(&chain_id) {
            return Err(RelayError::AlreadyRegistered { chain_id });
        }

        let engine = ConsensusEngine::new(scheme, &self.config);
        let state = ChainState::new(engine, validators, genesis_hash, storage);
        let event = RelayEvent::ChainRegistered {
            chain_id,
            scheme,
            genesis_hash,
            validators_root: state.validators_root(),
        };
        info!(
            "Registered {} chain {}: genesis={}, validators={}",
            scheme.name(),
            chain_id,
            genesis_hash,
            state.validators().current().len()
        );
        self.chains.insert(chain_id, state);
        self.emit(std::slice::from_ref(&event));
        Ok(event)
    }

    // --- Submission ---

    /// Verify one header and append it to the chain.
    ///
    /// `unsigned` and `signed` are the two RLP forms of the same header,
    /// `seal` is the scheme's seal argument (empty for Clique) and
    /// `candidate` an optional validator set the header hands over to.
    pub fn submit_block(
        &mut self,
        chain_id: ChainId,
        unsigned: &[u8],
        signed: &[u8],
        seal: &[u8],
        candidate: Option<&ValidatorSet>,
    ) -> Result<BlockAccepted, RelayError> {
        let chain = self.chain(&chain_id)?;
        let mut staged = chain.stage();
        let accepted = staged
            .submit(chain, chain_id, unsigned, signed, seal, candidate)
            .inspect_err(|e| warn!("Rejected header for {}: {}", chain_id, e))?;

        self.commit(chain_id, staged);
        Ok(accepted)
    }

    /// Verify and append a sequence of headers atomically: if any header is
    /// rejected, none are applied and the error names the first failure.
    pub fn submit_blocks(
        &mut self,
        chain_id: ChainId,
        submissions: &[BlockSubmission],
    ) -> Result<Vec<BlockAccepted>, RelayError> {
        if submissions.is_empty() {
            return Err(RelayError::EmptyInput { what: "batch" });
        }
        if submissions.len() > self.config.max_batch_len {
            return Err(RelayError::BatchTooLarge {
                len: submissions.len(),
                max: self.config.max_batch_len,
            });
        }

        let chain = self.chain(&chain_id)?;
        let mut staged = chain.stage();
        let mut accepted = Vec::with_capacity(submissions.len());
        for (index, submission) in submissions.iter().enumerate() {
            let block = staged
                .submit(
                    chain,
                    chain_id,
                    &submission.unsigned,
                    &submission.signed,
                    &submission.seal,
                    submission.candidate.as_ref(),
                )
                .inspect_err(|e| {
                    warn!(
                        "Rejected batch for {} at header {} of {}: {}",
                        chain_id,
                        index,
                        submissions.len(),
                        e
                    )
                })?;
            accepted.push(block);
        }

        self.commit(chain_id, staged);
        Ok(accepted)
    }

    /// `submit_blocks` over concatenated encodings split at `offsets`.
    pub fn submit_block_batch(
        &mut self,
        chain_id: ChainId,
        unsigned: &[u8],
        signed: &[u8],
        offsets: &BatchOffsets,
    ) -> Result<Vec<BlockAccepted>, RelayError> {
        let submissions = BlockSubmission::split_batch(unsigned, signed, offsets)?;
        self.submit_blocks(chain_id, &submissions)
    }

    fn commit(&mut self, chain_id: ChainId, staged: Staged) {
        let Some(chain) = self.chains.get_mut(&chain_id) else {
            return;
        };
        let (blocks, events) = chain.apply(staged);
        if let Some(storage) = chain.storage() {
            for block in &blocks {
                storage.add_block(&chain_id, &block.hash, &block.signed);
            }
        }
        if let Some(last) = blocks.last() {
            info!(
                "Accepted {} header(s) for {}: head={}, number={}",
                blocks.len(),
                chain_id,
                last.hash,
                last.meta.number
            );
        }
        self.emit(&events);
    }

    // --- Validator votes ---

    /// Cast a vote to add (`authorize`) or remove `target` on behalf of
    /// `proposer`, a current validator of the chain.
    pub fn apply_vote(
        &mut self,
        chain_id: ChainId,
        proposer: Address,
        target: Address,
        authorize: bool,
    ) -> Result<VoteOutcome, RelayError> {
        let chain = self.chain(&chain_id)?;
        let scheme = chain.scheme();
        let previous_root = chain.validators_root();
        let mut validators = chain.validators().clone();

        let vote = Vote {
            proposer,
            target,
            authorize,
        };
        let outcome = validators.apply_vote(&vote)?;
        debug!(
            "Vote on {} by {} to {} {}: {:?}",
            chain_id,
            proposer,
            if authorize { "add" } else { "remove" },
            target,
            outcome
        );

        let mut events: Vec<RelayEvent> =
            vote_event(chain_id, None, &vote, outcome, &validators).into_iter().collect();
        let validators_root = validators.current().root(scheme);
        if validators_root != previous_root {
            info!(
                "Validator {} {} on {} by vote",
                target,
                if authorize { "added" } else { "removed" },
                chain_id
            );
            events.push(RelayEvent::ValidatorsChanged {
                chain_id,
                block_hash: None,
                previous_root,
                validators_root,
            });
        }

        if let Some(chain) = self.chains.get_mut(&chain_id) {
            chain.set_validators(validators);
        }
        self.emit(&events);
        Ok(outcome)
    }

    // --- Queries ---

    pub fn is_registered(&self, chain_id: &ChainId) -> bool {
        self.chains.contains_key(chain_id)
    }

    /// Registered chain ids in ascending order.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.chains.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn chain_state(&self, chain_id: &ChainId) -> Option<&ChainState> {
        self.chains.get(chain_id)
    }

    pub fn scheme(&self, chain_id: &ChainId) -> Result<Scheme, RelayError> {
        Ok(self.chain(chain_id)?.scheme())
    }

    pub fn get_head(&self, chain_id: &ChainId) -> Result<B256, RelayError> {
        Ok(self.chain(chain_id)?.head())
    }

    pub fn get_header(
        &self,
        chain_id: &ChainId,
        block_hash: &B256,
    ) -> Result<&HeaderMeta, RelayError> {
        self.chain(chain_id)?
            .header(block_hash)
            .ok_or(RelayError::UnknownBlock {
                block_hash: *block_hash,
            })
    }

    /// Root of the current validator set under the chain's scheme.
    pub fn get_validators_root(&self, chain_id: &ChainId) -> Result<B256, RelayError> {
        Ok(self.chain(chain_id)?.validators_root())
    }

    pub fn current_set(&self, chain_id: &ChainId) -> Result<&ValidatorSet, RelayError> {
        Ok(self.chain(chain_id)?.validators().current())
    }

    /// The set replaced by the most recent transition (the initial set if
    /// none has happened).
    pub fn previous_set(&self, chain_id: &ChainId) -> Result<&ValidatorSet, RelayError> {
        Ok(self.chain(chain_id)?.validators().previous())
    }

    // --- Proofs ---

    /// Check a Patricia proof against the `trie` root of an accepted header.
    ///
    /// An unknown chain or block is an error; a proof that does not hold is
    /// `Ok(false)`.
    pub fn verify_patricia_proof(
        &self,
        chain_id: &ChainId,
        block_hash: &B256,
        trie: TrieKind,
        value: &[u8],
        path: &[u8],
        parent_nodes: &[u8],
    ) -> Result<bool, RelayError> {
        let root = self.get_header(chain_id, block_hash)?.trie_root(trie);
        Ok(Self::verify_patricia_proof_with_root(value, path, parent_nodes, &root))
    }

    pub fn verify_patricia_proof_with_root(
        value: &[u8],
        path: &[u8],
        parent_nodes: &[u8],
        root: &B256,
    ) -> bool {
        patricia::verify_proof(value, path, parent_nodes, root)
    }

    /// Check a sorted Merkle path from `leaf` to `root`.
    pub fn verify_merkle_proof(leaf: &[u8], path: &MerklePath, root: &B256) -> bool {
        merkle::verify(leaf, path, root)
    }
}
