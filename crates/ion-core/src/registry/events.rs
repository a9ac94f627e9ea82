//! Typed notifications of committed relay state changes.

use crate::types::chain::{ChainId, Scheme};
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

/// Result of accepting one header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockAccepted {
    pub chain_id: ChainId,
    pub block_hash: B256,
    pub number: u64,
    pub proposer: Address,
    /// Commit signers (Clique: the sealer).
    pub signers: Vec<Address>,
    /// Root of the validator set current after this block.
    pub validators_root: B256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RelayEvent {
    ChainRegistered {
        chain_id: ChainId,
        scheme: Scheme,
        genesis_hash: B256,
        validators_root: B256,
    },
    BlockAccepted(BlockAccepted),
    ValidatorsChanged {
        chain_id: ChainId,
        /// The block whose acceptance caused the change, if any.
        block_hash: Option<B256>,
        previous_root: B256,
        validators_root: B256,
    },
    VoteRecorded {
        chain_id: ChainId,
        block_hash: Option<B256>,
        proposer: Address,
        target: Address,
        authorize: bool,
        /// Votes backing the proposal after this one; zero once applied.
        tally: usize,
        applied: bool,
    },
}

impl RelayEvent {
    pub fn chain_id(&self) -> ChainId {
        match self {
            RelayEvent::ChainRegistered { chain_id, .. }
            | RelayEvent::ValidatorsChanged { chain_id, .. }
            | RelayEvent::VoteRecorded { chain_id, .. } => *chain_id,
            RelayEvent::BlockAccepted(accepted) => accepted.chain_id,
        }
    }
}

/// Receiver of relay events. Events arrive only after the state they
/// describe has been committed.
pub trait EventSink: Send {
    fn emit(&mut self, event: &RelayEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&RelayEvent) + Send,
{
    fn emit(&mut self, event: &RelayEvent) {
        self(event)
    }
}

impl EventSink for Sender<RelayEvent> {
    fn emit(&mut self, event: &RelayEvent) {
        // A dropped receiver just stops listening
        let _ = self.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    fn registered() -> RelayEvent {
        RelayEvent::ChainRegistered {
            chain_id: B256::repeat_byte(1),
            scheme: Scheme::Ibft,
            genesis_hash: B256::repeat_byte(2),
            validators_root: B256::repeat_byte(3),
        }
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |event: &RelayEvent| seen.push(event.chain_id());
            sink.emit(&registered());
        }
        assert_eq!(seen, vec![B256::repeat_byte(1)]);
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, rx) = channel();
        tx.emit(&registered());
        drop(tx);
        assert_eq!(rx.iter().collect::<Vec<_>>(), vec![registered()]);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(registered()).unwrap();
        assert_eq!(json["event"], "chainRegistered");
        assert_eq!(json["scheme"], "ibft");
        assert!(json.get("genesisHash").is_some());
    }
}
