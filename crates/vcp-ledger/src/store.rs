//! The published, read-mostly side of the ledger.
//!
//! `LedgerView` is what readers see under the store's read lock: the event
//! sequence, its indexes, and the batch registry with per-batch anchor
//! state.  Events are published as whole `Arc<Event>` values, so a reader
//! holding the lock sees either all of an event or none of it.

use std::ops::Range;
use std::sync::Arc;

use vcp_contracts::{
    anchor::AnchorRecord,
    event::{AnchorStatus, Event, EventId, Security, TimestampNs, TraceId},
};
use vcp_merkle::MerkleBatch;

use crate::index::LedgerIndex;

/// A sealed batch and the anchor state shared by all of its events.
#[derive(Debug, Clone)]
pub struct BatchState {
    pub batch: Arc<MerkleBatch>,
    pub status: AnchorStatus,
    /// The current anchoring attempt for this batch's root, if any.
    pub anchor: Option<AnchorRecord>,
}

/// An event together with where it sits in the ledger.
#[derive(Debug, Clone)]
pub struct LocatedEvent {
    pub sequence: u64,
    pub event: Arc<Event>,
    /// The batch holding the event, absent until it is sealed.
    pub batch: Option<BatchState>,
}

impl LocatedEvent {
    pub fn status(&self) -> AnchorStatus {
        self.batch
            .as_ref()
            .map_or(AnchorStatus::Pending, |b| b.status)
    }

    pub fn leaf_index(&self) -> Option<usize> {
        self.batch
            .as_ref()
            .and_then(|b| b.batch.leaf_index_of(self.sequence))
    }
}

#[derive(Debug, Default)]
pub struct LedgerView {
    pub(crate) events: Vec<Arc<Event>>,
    pub(crate) index: LedgerIndex,
    pub(crate) batches: Vec<BatchState>,
}

impl LedgerView {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events in append order.
    pub fn events(&self) -> &[Arc<Event>] {
        &self.events
    }

    pub fn event(&self, sequence: u64) -> Option<&Arc<Event>> {
        self.events.get(sequence as usize)
    }

    pub fn sequence_of(&self, id: &EventId) -> Option<u64> {
        self.index.sequence_of(id)
    }

    pub fn trace_sequences(&self, trace: &TraceId) -> &[u64] {
        self.index.trace(trace)
    }

    pub fn symbol_sequences(&self, symbol: &str) -> &[u64] {
        self.index.symbol(symbol)
    }

    /// Sequence range of events whose timestamp lies in `[start, end]`.
    ///
    /// Timestamps never decrease in append order, so both bounds are found
    /// by binary search.
    pub fn time_range(&self, start: Option<TimestampNs>, end: Option<TimestampNs>) -> Range<usize> {
        let lo = start.map_or(0, |s| self.events.partition_point(|e| e.timestamp() < s));
        let hi = end.map_or(self.events.len(), |e| {
            self.events.partition_point(|ev| ev.timestamp() <= e)
        });
        lo..hi.max(lo)
    }

    /// `event_hash` of the newest event, or the genesis sentinel.
    pub fn tip_hash(&self) -> &str {
        self.events
            .last()
            .map_or(Security::GENESIS_HASH, |e| e.security.event_hash.as_str())
    }

    pub fn batches(&self) -> &[BatchState] {
        &self.batches
    }

    pub fn batch(&self, batch_id: u64) -> Option<&BatchState> {
        self.batches.get(batch_id as usize)
    }

    /// The batch holding ledger `sequence`, if it has been sealed.
    pub fn batch_for(&self, sequence: u64) -> Option<&BatchState> {
        let at = self
            .batches
            .partition_point(|b| b.batch.end_sequence() <= sequence);
        self.batches
            .get(at)
            .filter(|b| b.batch.leaf_index_of(sequence).is_some())
    }

    pub fn status_of(&self, sequence: u64) -> AnchorStatus {
        self.batch_for(sequence)
            .map_or(AnchorStatus::Pending, |b| b.status)
    }

    /// Number of events already assigned to a batch.
    pub fn batched_len(&self) -> u64 {
        self.batches.last().map_or(0, |b| b.batch.end_sequence())
    }

    /// Events not yet covered by an anchored batch.
    pub fn pending_count(&self) -> u64 {
        let anchored: u64 = self
            .batches
            .iter()
            .filter(|b| b.status.is_anchored())
            .map(|b| b.batch.len() as u64)
            .sum();
        self.events.len() as u64 - anchored
    }

    /// The anchor record of the most recently anchored batch.
    pub fn last_anchor(&self) -> Option<&AnchorRecord> {
        self.batches
            .iter()
            .rev()
            .filter(|b| b.status.is_anchored())
            .find_map(|b| b.anchor.as_ref())
    }

    pub(crate) fn locate(&self, sequence: u64) -> Option<LocatedEvent> {
        let event = self.event(sequence)?.clone();
        Some(LocatedEvent {
            sequence,
            event,
            batch: self.batch_for(sequence).cloned(),
        })
    }
}
