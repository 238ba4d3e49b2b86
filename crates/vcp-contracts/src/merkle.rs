//! Merkle inclusion proof as it travels on the wire.

use serde::{Deserialize, Serialize};

/// Everything needed to recompute a batch root from one leaf.
///
/// `tree_size` is part of the proof because odd levels promote their last
/// node without a sibling; the verifier needs it to know where that
/// happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Hex root of the batch the leaf belongs to.
    pub root_hash: String,
    pub leaf_index: u64,
    pub tree_size: u64,
    /// Hex sibling hashes, ordered from the leaf level up to the root.
    pub audit_path: Vec<String>,
    /// Hex leaf hash, `SHA256(0x00 || canonical_json(event))`.
    pub leaf_hash: String,
}
