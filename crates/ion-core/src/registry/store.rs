use crate::types::chain::ChainId;
use alloy_primitives::{Bytes, B256};
use std::fmt;
use std::sync::Mutex;

/// Downstream storage attached to a chain at registration. Receives the
/// signed encoding of every header once it has been committed.
pub trait BlockStore: Send + Sync + fmt::Debug {
    fn add_block(&self, chain_id: &ChainId, block_hash: &B256, signed_header: &[u8]);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredBlock {
    pub chain_id: ChainId,
    pub block_hash: B256,
    pub signed_header: Bytes,
}

/// In-memory `BlockStore` keeping blocks in arrival order.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: Mutex<Vec<StoredBlock>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn blocks(&self) -> Vec<StoredBlock> {
        self.lock().clone()
    }

    pub fn get(&self, block_hash: &B256) -> Option<Bytes> {
        self.lock()
            .iter()
            .find(|b| b.block_hash == *block_hash)
            .map(|b| b.signed_header.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredBlock>> {
        // The vector is never left half-written, so a poisoned lock is usable
        self.blocks.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BlockStore for MemoryBlockStore {
    fn add_block(&self, chain_id: &ChainId, block_hash: &B256, signed_header: &[u8]) {
        self.lock().push(StoredBlock {
            chain_id: *chain_id,
            block_hash: *block_hash,
            signed_header: Bytes::copy_from_slice(signed_header),
        });
    }
}
