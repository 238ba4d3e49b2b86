//! Inclusion proof generation and verification.
//!
//! Verification follows RFC 9162 §2.1.3.2.  The verifier needs the tree
//! size to know at which levels the leaf's ancestor was promoted without a
//! sibling; a bare left/right path would work too but is not what
//! third-party transparency-log tooling expects.

use vcp_contracts::{error::VcpResult, merkle::MerkleProof};
use vcp_core::canonical::decode_hash;

use crate::tree::{node_hash, MerkleTree};

impl MerkleTree {
    /// Build the wire proof for the leaf at `leaf_index`.
    pub fn prove(&self, leaf_index: usize) -> VcpResult<MerkleProof> {
        let path = self.audit_path(leaf_index)?;
        Ok(MerkleProof {
            root_hash: hex::encode(self.root()),
            leaf_index: leaf_index as u64,
            tree_size: self.leaf_count() as u64,
            audit_path: path.iter().map(hex::encode).collect(),
            leaf_hash: hex::encode(self.leaves()[leaf_index]),
        })
    }
}

/// Check that `leaf` sits at `leaf_index` in a tree of `tree_size` leaves
/// whose root is `root`.
pub fn verify_inclusion(
    leaf: &[u8; 32],
    leaf_index: u64,
    tree_size: u64,
    audit_path: &[[u8; 32]],
    root: &[u8; 32],
) -> bool {
    if leaf_index >= tree_size {
        return false;
    }

    let mut fnode = leaf_index;
    let mut snode = tree_size - 1;
    let mut running = *leaf;

    for sibling in audit_path {
        if snode == 0 {
            return false;
        }
        if fnode & 1 == 1 || fnode == snode {
            running = node_hash(sibling, &running);
            if fnode & 1 == 0 {
                // Skip the levels where this node was promoted.
                while fnode & 1 == 0 && fnode != 0 {
                    fnode >>= 1;
                    snode >>= 1;
                }
            }
        } else {
            running = node_hash(&running, sibling);
        }
        fnode >>= 1;
        snode >>= 1;
    }

    snode == 0 && running == *root
}

/// Verify a wire proof.  `leaf` is the leaf hash the caller recomputed
/// independently; the proof's own `leaf_hash` must agree with it.
///
/// Malformed hex anywhere in the proof verifies as `false`.
pub fn verify_proof(leaf: &[u8; 32], proof: &MerkleProof) -> bool {
    let Ok(claimed_leaf) = decode_hash(&proof.leaf_hash) else {
        return false;
    };
    if claimed_leaf != *leaf {
        return false;
    }
    let Ok(root) = decode_hash(&proof.root_hash) else {
        return false;
    };
    let path: Result<Vec<[u8; 32]>, _> = proof.audit_path.iter().map(|h| decode_hash(h)).collect();
    let Ok(path) = path else {
        return false;
    };
    verify_inclusion(leaf, proof.leaf_index, proof.tree_size, &path, &root)
}
