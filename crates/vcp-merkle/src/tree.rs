//! SHA-256 Merkle tree with domain-separated leaves and nodes.
//!
//! ```text
//! leaf_hash(data)    = SHA256(0x00 || data)
//! node_hash(l, r)    = SHA256(0x01 || l || r)
//! ```
//!
//! When a level has an odd number of nodes the last one is promoted to the
//! next level unchanged.  Duplicating it instead would let two different
//! leaf sequences share a root.  Promotion gives the same shape as the
//! RFC 6962 recursive split, so RFC 9162 verifiers accept our proofs.

use sha2::{Digest, Sha256};

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::Event,
};
use vcp_core::canonical::to_canonical_bytes;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash a leaf's bytes with the leaf prefix.
pub fn leaf_hash(data: &[u8]) -> [u8; 32] {
    Sha256::new()
        .chain_update([LEAF_PREFIX])
        .chain_update(data)
        .finalize()
        .into()
}

/// Hash two children into their parent.
pub fn node_hash(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    Sha256::new()
        .chain_update([NODE_PREFIX])
        .chain_update(left)
        .chain_update(right)
        .finalize()
        .into()
}

/// Leaf hash of a sealed event: the full event, security block included,
/// in canonical form.
pub fn event_leaf_hash(event: &Event) -> VcpResult<[u8; 32]> {
    Ok(leaf_hash(&to_canonical_bytes(event)?))
}

/// A fully materialized Merkle tree.  `levels[0]` holds the leaves and the
/// last level holds only the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<[u8; 32]>>,
}

impl MerkleTree {
    /// Build a tree over pre-computed leaf hashes.
    ///
    /// An empty leaf set has no root and is rejected.
    pub fn from_leaf_hashes(leaves: Vec<[u8; 32]>) -> VcpResult<Self> {
        if leaves.is_empty() {
            return Err(VcpError::InvalidInput {
                reason: "cannot build a Merkle tree without leaves".to_string(),
            });
        }

        let mut levels = vec![leaves];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() == 1 {
                break;
            }
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            let mut pairs = current.chunks_exact(2);
            for pair in &mut pairs {
                next.push(node_hash(&pair[0], &pair[1]));
            }
            // Odd node: promote, never duplicate.
            if let [last] = pairs.remainder() {
                next.push(*last);
            }
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> [u8; 32] {
        // Construction guarantees a final level with exactly one node.
        self.levels[self.levels.len() - 1][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn leaves(&self) -> &[[u8; 32]] {
        &self.levels[0]
    }

    /// Sibling hashes from the leaf level up to the root.
    ///
    /// Levels where the node was promoted contribute nothing, so the path
    /// can be shorter than the tree height.
    pub fn audit_path(&self, leaf_index: usize) -> VcpResult<Vec<[u8; 32]>> {
        if leaf_index >= self.leaf_count() {
            return Err(VcpError::InvalidInput {
                reason: format!(
                    "leaf index {} out of range for tree of {} leaves",
                    leaf_index,
                    self.leaf_count()
                ),
            });
        }

        let mut path = Vec::new();
        let mut idx = leaf_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = idx ^ 1;
            if sibling < level.len() {
                path.push(level[sibling]);
            }
            idx /= 2;
        }
        Ok(path)
    }
}
