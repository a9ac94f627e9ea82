//! Sorted-pair Merkle accumulator.
//!
//! Leaves are `merkle_hash(item)`, sorted ascending before pairing. Every
//! level with an odd number of nodes is padded with
//! `merkle_hash("merkle-tree-extra")`, including a lone leaf, so a one-item
//! tree has root `H(leaf || extra)`.
//!
//! `merkle_hash` is keccak256 with bit `0x40` of the most significant byte
//! cleared. That bit is free in every node hash; the packed wire form of a
//! path uses it to mark right-hand siblings. [`MerklePath`] keeps the side
//! as an explicit tag and converts to the packed form only at the boundary.

use crate::codec::keccak256_concat;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The reserved bit in byte 0 of every node hash.
pub const RIGHT_SIBLING_FLAG: u8 = 0x40;

/// Item whose hash pads odd-sized levels.
pub const EXTRA_LEAF_ITEM: &[u8] = b"merkle-tree-extra";

#[derive(Debug, Error)]
pub enum MerkleError {
    #[error("Cannot build a Merkle tree from an empty item list")]
    EmptyInput,

    #[error("Leaf {leaf} is not in the tree")]
    LeafNotFound { leaf: B256 },
}

/// keccak256 over the concatenation of `parts` with the reserved bit cleared.
pub fn merkle_hash(parts: &[&[u8]]) -> B256 {
    let mut hash = keccak256_concat(parts);
    hash[0] &= !RIGHT_SIBLING_FLAG;
    hash
}

/// Hash of a leaf item.
pub fn leaf_hash(item: &[u8]) -> B256 {
    merkle_hash(&[item])
}

fn hash_pair(left: &B256, right: &B256) -> B256 {
    merkle_hash(&[left.as_slice(), right.as_slice()])
}

/// The sentinel that pads odd-sized levels.
pub fn extra_leaf() -> B256 {
    leaf_hash(EXTRA_LEAF_ITEM)
}

/// One sibling on the way from a leaf to the root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "hash", rename_all = "lowercase")]
pub enum PathNode {
    /// Sibling is the left operand: `H(sibling || node)`.
    Left(B256),
    /// Sibling is the right operand: `H(node || sibling)`.
    Right(B256),
}

impl PathNode {
    pub fn hash(&self) -> B256 {
        match self {
            PathNode::Left(h) | PathNode::Right(h) => *h,
        }
    }

    fn combine(&self, node: &B256) -> B256 {
        match self {
            PathNode::Left(sibling) => hash_pair(sibling, node),
            PathNode::Right(sibling) => hash_pair(node, sibling),
        }
    }
}

/// Ordered siblings from leaf to root.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerklePath(pub Vec<PathNode>);

impl MerklePath {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathNode> {
        self.0.iter()
    }

    /// Encode as bare hashes, marking right siblings with the reserved bit.
    pub fn to_packed(&self) -> Vec<B256> {
        self.0
            .iter()
            .map(|node| match node {
                PathNode::Left(h) => *h,
                PathNode::Right(h) => {
                    let mut packed = *h;
                    packed[0] |= RIGHT_SIBLING_FLAG;
                    packed
                }
            })
            .collect()
    }

    /// Decode the packed form: a set reserved bit means a right sibling.
    pub fn from_packed(packed: &[B256]) -> Self {
        Self(
            packed
                .iter()
                .map(|h| {
                    if h[0] & RIGHT_SIBLING_FLAG != 0 {
                        let mut hash = *h;
                        hash[0] &= !RIGHT_SIBLING_FLAG;
                        PathNode::Right(hash)
                    } else {
                        PathNode::Left(*h)
                    }
                })
                .collect(),
        )
    }
}

/// A fully materialised tree: `levels[0]` are the sorted leaves, the last
/// level holds only the root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<B256>>,
}

impl MerkleTree {
    /// Build a tree over `items`. Input order does not matter and duplicate
    /// items are kept.
    pub fn build<I, T>(items: I) -> Result<Self, MerkleError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut leaves: Vec<B256> = items.into_iter().map(|i| leaf_hash(i.as_ref())).collect();
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        leaves.sort();

        let extra = extra_leaf();
        let mut levels = vec![leaves];
        loop {
            let level = levels.last_mut().ok_or(MerkleError::EmptyInput)?;
            if level.len() % 2 != 0 {
                level.push(extra);
            }
            let next: Vec<B256> = level
                .chunks_exact(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            let done = next.len() == 1;
            levels.push(next);
            if done {
                break;
            }
        }
        Ok(Self { levels })
    }

    pub fn root(&self) -> B256 {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or_default()
    }

    pub fn levels(&self) -> &[Vec<B256>] {
        &self.levels
    }

    /// Sorted leaf hashes, including the padding sentinel if one was added.
    pub fn leaves(&self) -> &[B256] {
        &self.levels[0]
    }

    /// Path for the leaf hashed from `item`.
    pub fn path(&self, item: &[u8]) -> Result<MerklePath, MerkleError> {
        self.path_for_leaf(&leaf_hash(item))
    }

    /// Path for an already-hashed leaf.
    pub fn path_for_leaf(&self, leaf: &B256) -> Result<MerklePath, MerkleError> {
        let mut index = self.levels[0]
            .iter()
            .position(|h| h == leaf)
            .ok_or(MerkleError::LeafNotFound { leaf: *leaf })?;

        let mut path = Vec::with_capacity(self.levels.len() - 1);
        for level in &self.levels[..self.levels.len() - 1] {
            if index % 2 == 0 {
                path.push(PathNode::Right(level[index + 1]));
            } else {
                path.push(PathNode::Left(level[index - 1]));
            }
            index /= 2;
        }
        Ok(MerklePath(path))
    }
}

/// Fold `path` into the hash of `leaf` and compare with `root`.
pub fn verify(leaf: &[u8], path: &MerklePath, root: &B256) -> bool {
    let node = path
        .iter()
        .fold(leaf_hash(leaf), |node, sibling| sibling.combine(&node));
    node == *root
}

/// [`verify`] over the packed wire form of a path.
pub fn verify_packed(leaf: &[u8], packed_path: &[B256], root: &B256) -> bool {
    verify(leaf, &MerklePath::from_packed(packed_path), root)
}
