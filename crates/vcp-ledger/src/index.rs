//! Secondary indexes over the published event sequence.
//!
//! Maintained under the store's write lock at publish time, so a reader
//! never sees an event without its index entries or the reverse.

use std::collections::HashMap;

use vcp_contracts::event::{Event, EventId, TraceId};

#[derive(Debug, Default)]
pub(crate) struct LedgerIndex {
    by_id: HashMap<EventId, u64>,
    by_trace: HashMap<TraceId, Vec<u64>>,
    by_symbol: HashMap<String, Vec<u64>>,
}

impl LedgerIndex {
    pub(crate) fn insert(&mut self, event: &Event, sequence: u64) {
        self.by_id.insert(event.id(), sequence);
        self.by_trace
            .entry(event.header.trace_id)
            .or_default()
            .push(sequence);
        self.by_symbol
            .entry(event.header.symbol.clone())
            .or_default()
            .push(sequence);
    }

    pub(crate) fn sequence_of(&self, id: &EventId) -> Option<u64> {
        self.by_id.get(id).copied()
    }

    /// Ascending sequences of the events in `trace`.
    pub(crate) fn trace(&self, trace: &TraceId) -> &[u64] {
        self.by_trace.get(trace).map_or(&[], Vec::as_slice)
    }

    /// Ascending sequences of the events for `symbol`.
    pub(crate) fn symbol(&self, symbol: &str) -> &[u64] {
        self.by_symbol.get(symbol).map_or(&[], Vec::as_slice)
    }
}
