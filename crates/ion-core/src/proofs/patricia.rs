//! Merkle-Patricia trie inclusion proofs.
//!
//! A proof is the RLP list of RLP-encoded nodes met on the way from the root
//! to the value, root first. Verification is a predicate: any structural
//! problem with the proof yields `false`.

use crate::codec::rlp::{decode_list, RlpItem};
use crate::codec::{keccak256, CodecError};
use alloy_primitives::B256;

/// Where the walk goes next.
enum NodeRef<'a> {
    /// A node of 32 bytes or more, referenced by hash. It is the next entry
    /// of the proof list.
    Hash(B256),
    /// A node shorter than 32 bytes, embedded in its parent.
    Inline(RlpItem<'a>),
}

/// Verify that `value` is stored under key `path` in the trie with root
/// `root`, given the proof nodes `parent_nodes`.
///
/// `path` is the raw key; each byte contributes two nibbles, high first.
/// `value` is compared against the payload of the terminal value item.
pub fn verify_proof(value: &[u8], path: &[u8], parent_nodes: &[u8], root: &B256) -> bool {
    walk(value, path, parent_nodes, root).unwrap_or(false)
}

fn walk(value: &[u8], path: &[u8], parent_nodes: &[u8], root: &B256) -> Result<bool, CodecError> {
    let key = bytes_to_nibbles(path);
    if key.is_empty() {
        return Ok(false);
    }

    let nodes = decode_list(parent_nodes)?;
    let mut next_node = 0usize;
    let mut key_index = 0usize;
    let mut reference = NodeRef::Hash(*root);

    loop {
        let node = match reference {
            NodeRef::Hash(expected) => {
                let Some(node) = nodes.get(next_node) else {
                    return Ok(false);
                };
                next_node += 1;
                if keccak256(node.raw) != expected {
                    return Ok(false);
                }
                *node
            }
            NodeRef::Inline(node) => node,
        };

        let items = node.items()?;
        match items.len() {
            17 => {
                // Branch node: 16 children + value
                if key_index == key.len() {
                    return Ok(matches_value(&items[16], value));
                }
                let child = &items[key[key_index] as usize];
                key_index += 1;
                match child_ref(child) {
                    Some(next) => reference = next,
                    None => return Ok(false),
                }
            }
            2 => {
                // Extension or leaf node
                let Some((prefix, is_leaf)) = decode_compact_path(items[0].bytes()?) else {
                    return Ok(false);
                };
                let remaining = &key[key_index..];
                if !remaining.starts_with(&prefix) {
                    return Ok(false);
                }
                key_index += prefix.len();

                if is_leaf {
                    return Ok(key_index == key.len() && matches_value(&items[1], value));
                }
                if prefix.is_empty() {
                    return Ok(false);
                }
                match child_ref(&items[1]) {
                    Some(next) => reference = next,
                    None => return Ok(false),
                }
            }
            _ => return Ok(false),
        }
    }
}

fn matches_value(item: &RlpItem<'_>, value: &[u8]) -> bool {
    !item.is_list && item.payload == value
}

fn child_ref<'a>(child: &RlpItem<'a>) -> Option<NodeRef<'a>> {
    if child.is_list {
        return Some(NodeRef::Inline(*child));
    }
    B256::try_from(child.payload).ok().map(NodeRef::Hash)
}

// --- Nibble helpers ---

/// Convert bytes to nibbles (4 bits each), high nibble first.
fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(bytes.len() * 2);
    for byte in bytes {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0F);
    }
    nibbles
}

/// Decode compact (hex-prefix) encoding used in trie nodes.
/// Returns (nibbles, is_leaf), or `None` for an invalid flag or padding.
fn decode_compact_path(encoded: &[u8]) -> Option<(Vec<u8>, bool)> {
    let first = *encoded.first()?;
    let flag = first >> 4;
    if flag > 3 {
        return None;
    }
    let is_leaf = flag >= 2;
    let is_odd = flag % 2 == 1;

    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if is_odd {
        nibbles.push(first & 0x0F);
    } else if first & 0x0F != 0 {
        return None;
    }
    nibbles.extend(bytes_to_nibbles(&encoded[1..]));
    Some((nibbles, is_leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const ROOT: [u8; 32] = hex!("da2e968e25198a0a41e4dcdc6fcb03b9d49274b3d44cb35d921e4ebe3fb5c54c");

    const NODES_A: &str = "f83bf839808080808080c8318685746573743180a0207947cf85c03bd3d9f9ff5119267616318dcef0e12de2f8ca02ff2cdc720a978080808080808080";

    const NODES_AB: &str = concat!(
        "f87ff839808080808080c8318685746573743180a0207947cf85c03bd3d9f9ff5119267616318dcef0e12de2",
        "f8ca02ff2cdc720a978080808080808080f8428080c58320616274cc842061626386857465737433a05d495b",
        "d9e35ab0dab60dec18b21acc860829508e7df1064fce1f0b8fa4c0e8b2808080808080808080808080",
    );

    const NODES_ABCD: &str = concat!(
        "f8cbf839808080808080c8318685746573743180a0207947cf85c03bd3d9f9ff5119267616318dcef0e12de2",
        "f8ca02ff2cdc720a978080808080808080f8428080c58320616274cc842061626386857465737433a05d495b",
        "d9e35ab0dab60dec18b21acc860829508e7df1064fce1f0b8fa4c0e8b2808080808080808080808080e58316",
        "1626a06b1a1127b4c489762c8259381ff9ecf51b7ef0c2879b89e72c993edc944f1ccce5808080ca82206486",
        "85746573743480ca822064868574657374358080808080808080808080",
    );

    fn check(value: &str, path: &str, nodes: &str) -> bool {
        verify_proof(
            &hex::decode(value).unwrap(),
            &hex::decode(path).unwrap(),
            &hex::decode(nodes).unwrap(),
            &B256::from(ROOT),
        )
    }

    #[test]
    fn test_fixture_proofs_verify() {
        assert!(check("857465737431", "61", NODES_A));
        assert!(check("74", "826162", NODES_AB));
        assert!(check("857465737433", "83616263", NODES_AB));
        assert!(check("857465737435", "8461626564", NODES_ABCD));
        assert!(check("857465737434", "8461626364", NODES_ABCD));
    }

    #[test]
    fn test_fixture_wrong_values_fail() {
        assert!(!check("857465737432", "61", NODES_A));
        assert!(!check("75", "826163", NODES_AB));
        assert!(!check("857465737434", "83616263", NODES_AB));
        assert!(!check("857465737435", "8461626364", NODES_ABCD));
    }

    #[test]
    fn test_corrupted_final_node_fails() {
        let mut nodes = hex::decode(NODES_ABCD).unwrap();
        let last = nodes.len() - 1;
        nodes[last] = 0x85;
        assert!(!verify_proof(
            &hex!("857465737435"),
            &hex!("8461626564"),
            &nodes,
            &B256::from(ROOT),
        ));
    }

    #[test]
    fn test_wrong_root_fails() {
        let nodes = hex::decode(NODES_A).unwrap();
        assert!(!verify_proof(
            &hex!("857465737431"),
            &hex!("61"),
            &nodes,
            &B256::ZERO,
        ));
    }

    #[test]
    fn test_missing_nodes_fail() {
        // Proof for "abcd" cut short after the first two nodes
        assert!(!check("857465737435", "8461626564", NODES_AB));
    }

    #[test]
    fn test_empty_path_and_garbage_fail() {
        let nodes = hex::decode(NODES_A).unwrap();
        assert!(!verify_proof(&hex!("857465737431"), &[], &nodes, &B256::from(ROOT)));
        assert!(!verify_proof(&hex!("857465737431"), &hex!("61"), &[0xff, 0x00], &B256::from(ROOT)));
        assert!(!verify_proof(&hex!("857465737431"), &hex!("61"), &[], &B256::from(ROOT)));
    }

    #[test]
    fn test_bytes_to_nibbles() {
        assert_eq!(bytes_to_nibbles(&[0xAB, 0xCD]), vec![0xA, 0xB, 0xC, 0xD]);
    }

    #[test]
    fn test_decode_compact_path_even_extension() {
        // 0x00 prefix: even extension
        let (nibbles, is_leaf) = decode_compact_path(&[0x00, 0xAB, 0xCD]).unwrap();
        assert!(!is_leaf);
        assert_eq!(nibbles, vec![0xA, 0xB, 0xC, 0xD]);
    }

    #[test]
    fn test_decode_compact_path_odd_extension() {
        // 0x1X prefix: odd extension, first nibble is X
        let (nibbles, is_leaf) = decode_compact_path(&[0x1A, 0xBC]).unwrap();
        assert!(!is_leaf);
        assert_eq!(nibbles, vec![0xA, 0xB, 0xC]);
    }

    #[test]
    fn test_decode_compact_path_leaves() {
        let (nibbles, is_leaf) = decode_compact_path(&[0x20, 0xAB]).unwrap();
        assert!(is_leaf);
        assert_eq!(nibbles, vec![0xA, 0xB]);

        let (nibbles, is_leaf) = decode_compact_path(&[0x3A, 0xBC]).unwrap();
        assert!(is_leaf);
        assert_eq!(nibbles, vec![0xA, 0xB, 0xC]);
    }

    #[test]
    fn test_decode_compact_path_rejects_bad_flags() {
        assert!(decode_compact_path(&[]).is_none());
        assert!(decode_compact_path(&[0x40]).is_none());
        // Even flag with non-zero padding nibble
        assert!(decode_compact_path(&[0x05, 0xAB]).is_none());
    }
}
