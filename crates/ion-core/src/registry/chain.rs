//! Per-chain relay state and the staging area submissions are checked in.

use super::events::{BlockAccepted, RelayEvent};
use super::store::BlockStore;
use crate::codec::extra::ExtraLayout;
use crate::codec::header::{decode_header, encode_header_form};
use crate::codec::keccak256;
use crate::consensus::{ConsensusEngine, SealedHeader, ValidatorTracker, Vote, VoteOutcome};
use crate::error::RelayError;
use crate::types::chain::{ChainId, HeaderMeta, Scheme};
use crate::types::validator::ValidatorSet;
use alloy_primitives::{Bytes, B256};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything the relay knows about one registered chain.
///
/// Headers form an append-only chain from the genesis anchor to `head`;
/// nothing is ever removed or rewritten.
#[derive(Clone, Debug)]
pub struct ChainState {
    scheme: Scheme,
    genesis_hash: B256,
    head: B256,
    headers: HashMap<B256, HeaderMeta>,
    validators: ValidatorTracker,
    engine: ConsensusEngine,
    storage: Option<Arc<dyn BlockStore>>,
}

impl ChainState {
    pub fn new(
        engine: ConsensusEngine,
        initial: ValidatorSet,
        genesis_hash: B256,
        storage: Option<Arc<dyn BlockStore>>,
    ) -> Self {
        let scheme = engine.scheme();
        let mut headers = HashMap::new();
        headers.insert(genesis_hash, HeaderMeta::genesis(initial.root(scheme)));
        Self {
            scheme,
            genesis_hash,
            head: genesis_hash,
            headers,
            validators: ValidatorTracker::new(initial),
            engine,
            storage,
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn genesis_hash(&self) -> B256 {
        self.genesis_hash
    }

    pub fn head(&self) -> B256 {
        self.head
    }

    pub fn header(&self, block_hash: &B256) -> Option<&HeaderMeta> {
        self.headers.get(block_hash)
    }

    /// Accepted headers, genesis anchor included.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn validators(&self) -> &ValidatorTracker {
        &self.validators
    }

    pub fn engine(&self) -> &ConsensusEngine {
        &self.engine
    }

    pub fn validators_root(&self) -> B256 {
        self.validators.current().root(self.scheme)
    }

    pub(crate) fn storage(&self) -> Option<&Arc<dyn BlockStore>> {
        self.storage.as_ref()
    }

    /// Start a staged copy of the mutable parts of this chain.
    pub(crate) fn stage(&self) -> Staged {
        Staged {
            head: self.head,
            validators: self.validators.clone(),
            engine: self.engine.clone(),
            accepted: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Commit a staged copy. Returns the accepted blocks and the events
    /// describing them, in order.
    pub(crate) fn apply(&mut self, staged: Staged) -> (Vec<AcceptedBlock>, Vec<RelayEvent>) {
        self.head = staged.head;
        self.validators = staged.validators;
        self.engine = staged.engine;
        for block in &staged.accepted {
            self.headers.insert(block.hash, block.meta.clone());
        }
        (staged.accepted, staged.events)
    }

    /// Replace the validator tracker after a standalone vote.
    pub(crate) fn set_validators(&mut self, validators: ValidatorTracker) {
        self.validators = validators;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct AcceptedBlock {
    pub hash: B256,
    pub meta: HeaderMeta,
    pub signed: Bytes,
}

/// Pending changes to a chain. Submissions are checked and applied here
/// and reach the live `ChainState` only through `ChainState::apply`.
#[derive(Debug)]
pub(crate) struct Staged {
    head: B256,
    validators: ValidatorTracker,
    engine: ConsensusEngine,
    accepted: Vec<AcceptedBlock>,
    events: Vec<RelayEvent>,
}

impl Staged {
    fn lookup<'a>(&'a self, chain: &'a ChainState, block_hash: &B256) -> Option<&'a HeaderMeta> {
        self.accepted
            .iter()
            .find(|b| b.hash == *block_hash)
            .map(|b| &b.meta)
            .or_else(|| chain.headers.get(block_hash))
    }

    /// Check one header against the staged state and apply it.
    pub fn submit(
        &mut self,
        chain: &ChainState,
        chain_id: ChainId,
        unsigned: &[u8],
        signed: &[u8],
        seal: &[u8],
        candidate: Option<&ValidatorSet>,
    ) -> Result<BlockAccepted, RelayError> {
        let scheme = chain.scheme;
        let layout = ExtraLayout::from(scheme);

        // 1. Both encodings decode, and describe the same header
        let header = decode_header(signed)?;
        decode_header(unsigned)?;
        if encode_header_form(&header, true, layout)? != signed {
            return Err(RelayError::HeaderMismatch {
                reason: "signed encoding is not the signed form of the header".into(),
            });
        }
        if encode_header_form(&header, false, layout)? != unsigned {
            return Err(RelayError::HeaderMismatch {
                reason: "unsigned encoding is not the unsigned form of the signed header".into(),
            });
        }
        let block_hash = keccak256(signed);

        // 2. Linkage
        if self.lookup(chain, &block_hash).is_some() {
            return Err(RelayError::DuplicateBlock { block_hash });
        }
        if header.parent_hash != self.head {
            return Err(RelayError::WrongParent {
                expected: self.head,
                got: header.parent_hash,
            });
        }
        if self.head != chain.genesis_hash {
            let parent_number = self
                .lookup(chain, &self.head)
                .map(|meta| meta.number)
                .ok_or(RelayError::UnknownBlock {
                    block_hash: self.head,
                })?;
            // A head at u64::MAX has no valid child
            let expected = parent_number
                .checked_add(1)
                .ok_or(RelayError::InvalidBlockNumber {
                    expected: parent_number,
                    got: header.number,
                })?;
            if header.number != expected {
                return Err(RelayError::InvalidBlockNumber {
                    expected,
                    got: header.number,
                });
            }
        }

        // 3. Consensus
        let sealed = SealedHeader {
            header: &header,
            unsigned_hash: keccak256(unsigned),
            block_hash,
            seal,
            candidate,
        };
        let verdict = self.engine.verify(&sealed, &self.validators)?;
        let previous_root = self.validators.current().root(scheme);
        let vote_outcome = self.engine.commit(&verdict, &mut self.validators)?;
        let validators_root = self.validators.current().root(scheme);

        // 4. Record
        if let (Some(vote), Some(outcome)) = (verdict.vote, vote_outcome) {
            let event = vote_event(chain_id, Some(block_hash), &vote, outcome, &self.validators);
            self.events.extend(event);
        }
        if validators_root != previous_root {
            self.events.push(RelayEvent::ValidatorsChanged {
                chain_id,
                block_hash: Some(block_hash),
                previous_root,
                validators_root,
            });
        }

        let accepted = BlockAccepted {
            chain_id,
            block_hash,
            number: header.number,
            proposer: verdict.proposer,
            signers: verdict.signers,
            validators_root,
        };
        self.events.push(RelayEvent::BlockAccepted(accepted.clone()));
        self.accepted.push(AcceptedBlock {
            hash: block_hash,
            meta: HeaderMeta {
                number: header.number,
                parent_hash: header.parent_hash,
                state_root: header.state_root,
                transactions_root: header.transactions_root,
                receipts_root: header.receipts_root,
                validators_root,
                timestamp: header.timestamp,
            },
            signed: Bytes::copy_from_slice(signed),
        });
        self.head = block_hash;

        Ok(accepted)
    }
}

/// The `VoteRecorded` event for a vote outcome, if the vote was recorded.
pub(crate) fn vote_event(
    chain_id: ChainId,
    block_hash: Option<B256>,
    vote: &Vote,
    outcome: VoteOutcome,
    validators: &ValidatorTracker,
) -> Option<RelayEvent> {
    let (tally, applied) = match outcome {
        VoteOutcome::Ignored => return None,
        VoteOutcome::Pending { tally, .. } => (tally, false),
        VoteOutcome::Applied => (validators.tally(&vote.target, vote.authorize), true),
    };
    Some(RelayEvent::VoteRecorded {
        chain_id,
        block_hash,
        proposer: vote.proposer,
        target: vote.target,
        authorize: vote.authorize,
        tally,
        applied,
    })
}
