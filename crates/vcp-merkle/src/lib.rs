//! # vcp-merkle
//!
//! Batches sealed ledger events into SHA-256 Merkle trees and produces
//! per-leaf inclusion proofs.
//!
//! ## Overview
//!
//! A batch is a contiguous slice of the ledger.  Each event becomes one
//! leaf, `SHA256(0x00 || canonical_json(event))`; the batch root is what
//! the anchor coordinator commits externally.  Proofs carry the tree size
//! and verify with the RFC 9162 algorithm, so anyone holding the event and
//! the anchored root can check inclusion without this crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vcp_merkle::{build_batch, verify_proof, event_leaf_hash};
//!
//! let batch = build_batch(0, 0, events.iter())?;
//! let proof = batch.prove(2)?;
//! assert!(verify_proof(&event_leaf_hash(&events[2])?, &proof));
//! ```

pub mod batch;
pub mod proof;
pub mod tree;

pub use batch::{build_batch, BatchPolicy, MerkleBatch};
pub use proof::{verify_inclusion, verify_proof};
pub use tree::{event_leaf_hash, leaf_hash, node_hash, MerkleTree};

// ── Tests ─────────────────────────────────────────────────────────────────────
