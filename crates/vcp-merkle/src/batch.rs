//! Merkle batches: contiguous runs of sealed events committed by one root.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::{Event, EventId},
    merkle::MerkleProof,
};

use crate::tree::{event_leaf_hash, MerkleTree};

/// A sealed batch.  Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleBatch {
    /// Sequential from 0 in sealing order.
    pub batch_id: u64,
    /// Ledger sequence of the batch's first event.
    pub first_sequence: u64,
    /// Event ids in ledger order; position is the leaf index.
    pub event_ids: Vec<EventId>,
    pub sealed_at: DateTime<Utc>,
    tree: MerkleTree,
}

impl MerkleBatch {
    pub fn root(&self) -> [u8; 32] {
        self.tree.root()
    }

    pub fn root_hex(&self) -> String {
        hex::encode(self.tree.root())
    }

    pub fn len(&self) -> usize {
        self.event_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }

    pub fn leaf_hashes(&self) -> &[[u8; 32]] {
        self.tree.leaves()
    }

    /// Ledger sequence one past the batch's last event.
    pub fn end_sequence(&self) -> u64 {
        self.first_sequence + self.event_ids.len() as u64
    }

    /// Leaf index of the event at ledger `sequence`, if this batch holds it.
    pub fn leaf_index_of(&self, sequence: u64) -> Option<usize> {
        (self.first_sequence..self.end_sequence())
            .contains(&sequence)
            .then(|| (sequence - self.first_sequence) as usize)
    }

    pub fn prove(&self, leaf_index: usize) -> VcpResult<MerkleProof> {
        self.tree.prove(leaf_index)
    }
}

/// Hash `events` into a new batch.  The events must be a contiguous slice
/// of the ledger starting at `first_sequence`.
pub fn build_batch<'a, I>(batch_id: u64, first_sequence: u64, events: I) -> VcpResult<MerkleBatch>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut event_ids = Vec::new();
    let mut leaves = Vec::new();
    for event in events {
        event_ids.push(event.id());
        leaves.push(event_leaf_hash(event)?);
    }
    if leaves.is_empty() {
        return Err(VcpError::InvalidInput {
            reason: format!("batch {batch_id} has no events"),
        });
    }

    let tree = MerkleTree::from_leaf_hashes(leaves)?;
    let batch = MerkleBatch {
        batch_id,
        first_sequence,
        event_ids,
        sealed_at: Utc::now(),
        tree,
    };

    info!(
        batch_id,
        first_sequence,
        events = batch.len(),
        root = %batch.root_hex(),
        "merkle batch sealed"
    );
    Ok(batch)
}

/// When to seal the unbatched tail of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Seal once this many events are waiting.  Also the largest batch.
    pub max_events: usize,
    /// Seal once the oldest waiting event is at least this old.
    pub max_age: Duration,
}

impl BatchPolicy {
    pub fn new(max_events: usize, max_age: Duration) -> Self {
        Self {
            max_events: max_events.max(1),
            max_age,
        }
    }

    /// True when the waiting events should be sealed now.
    ///
    /// `oldest_ns` is the timestamp of the oldest unbatched event and
    /// `now_ns` the current clock reading.
    pub fn is_due(&self, unbatched: usize, oldest_ns: u64, now_ns: u64) -> bool {
        if unbatched == 0 {
            return false;
        }
        if unbatched >= self.max_events {
            return true;
        }
        let age = Duration::from_nanos(now_ns.saturating_sub(oldest_ns));
        age >= self.max_age
    }
}
