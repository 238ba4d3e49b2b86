//! `HashChainLedger`: the single-writer, many-reader event ledger.
//!
//! Two locks, never nested in the other order:
//!
//! - the **writer gate** (`tokio::sync::Mutex`) owns the chain tip, the id
//!   generator and the last timestamp.  An append holds it from the tip
//!   check through signing to publication, so appends are totally ordered
//!   and each one sees the tip its predecessor left.
//! - the **store** (`std::sync::RwLock`) holds the published events,
//!   indexes and batch registry.  Writers take it only for the final push;
//!   readers take it briefly and never across an await.

use std::sync::{Arc, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vcp_contracts::{
    anchor::AnchorRecord,
    error::{VcpError, VcpResult},
    event::{
        AnchorStatus, Event, EventDraft, EventHeader, EventId, HashAlgo, Security, TimestampNs,
        TraceId,
    },
};
use vcp_core::traits::{Clock, EventSigner};
use vcp_merkle::MerkleBatch;

use crate::{
    chain::{hash_event_content, verify_chain, ChainCheckpoint},
    id::IdGenerator,
    store::{BatchState, LedgerView, LocatedEvent},
};

// ── Writer state ──────────────────────────────────────────────────────────────

struct WriterState {
    /// `event_hash` of the last published event, or `GENESIS_HASH`.
    tip: String,
    ids: IdGenerator,
    /// Highest timestamp handed out so far.  The clock is clamped to it.
    last_ts: u64,
}

// ── Ledger ────────────────────────────────────────────────────────────────────

pub struct HashChainLedger {
    gate: Mutex<WriterState>,
    store: RwLock<LedgerView>,
    /// Prefix of the published chain already verified.  Published events
    /// never change, so it only ever moves forward.
    checkpoint: std::sync::Mutex<ChainCheckpoint>,
    clock: Arc<dyn Clock>,
    sign_timeout: Duration,
}

impl HashChainLedger {
    /// An empty ledger.  `sign_timeout` bounds every signer call.
    pub fn new(clock: Arc<dyn Clock>, sign_timeout: Duration) -> Self {
        Self {
            gate: Mutex::new(WriterState {
                tip: Security::GENESIS_HASH.to_string(),
                ids: IdGenerator::new(),
                last_ts: 0,
            }),
            store: RwLock::new(LedgerView::default()),
            checkpoint: std::sync::Mutex::new(ChainCheckpoint::default()),
            clock,
            sign_timeout,
        }
    }

    fn read_store(&self) -> VcpResult<RwLockReadGuard<'_, LedgerView>> {
        self.store.read().map_err(|e| VcpError::InternalFault {
            reason: format!("ledger store lock poisoned: {}", e),
        })
    }

    fn write_store(&self) -> VcpResult<RwLockWriteGuard<'_, LedgerView>> {
        self.store.write().map_err(|e| VcpError::InternalFault {
            reason: format!("ledger store lock poisoned: {}", e),
        })
    }

    fn checkpoint(&self) -> VcpResult<MutexGuard<'_, ChainCheckpoint>> {
        self.checkpoint.lock().map_err(|e| VcpError::InternalFault {
            reason: format!("chain checkpoint lock poisoned: {}", e),
        })
    }

    // ── Append ────────────────────────────────────────────────────────────────

    /// Seal `draft` into a new event and publish it at the end of the chain.
    ///
    /// `expected_prev` makes the append optimistic: when given, it must
    /// equal the current tip or the append fails with `ChainConflict` and
    /// changes nothing.  Nothing is published unless signing succeeds.
    pub async fn append(
        &self,
        draft: EventDraft,
        signer: &dyn EventSigner,
        expected_prev: Option<&str>,
    ) -> VcpResult<Arc<Event>> {
        draft.validate()?;

        let mut writer = self.gate.lock().await;

        if let Some(expected) = expected_prev {
            if expected != writer.tip {
                warn!(expected = %expected, actual = %writer.tip, "append rejected: chain tip moved");
                return Err(VcpError::ChainConflict {
                    expected: expected.to_string(),
                    actual: writer.tip.clone(),
                });
            }
        }

        let now = self.clock.now_ns();
        if now < writer.last_ts {
            debug!(clock_ns = now, clamped_to = writer.last_ts, "clock stepped backwards");
        }
        let timestamp = TimestampNs(now.max(writer.last_ts));
        writer.last_ts = timestamp.0;
        let event_id = writer.ids.next(timestamp.0);

        let header = EventHeader {
            event_id,
            trace_id: draft.trace_id.unwrap_or_else(TraceId::new),
            timestamp_int: timestamp,
            timestamp_iso: timestamp.to_iso(),
            event_type: draft.event_type,
            event_type_code: draft.event_type.code(),
            timestamp_precision: draft.timestamp_precision,
            clock_sync_status: draft.clock_sync_status,
            hash_algo: HashAlgo::Sha256,
            venue_id: draft.venue_id,
            symbol: draft.symbol,
        };
        let payload = draft.payload;

        let digest = hash_event_content(&header, &payload)?;
        let signature = match tokio::time::timeout(self.sign_timeout, signer.sign(&digest)).await {
            Err(_) => {
                warn!(event_id = %event_id, "signer timed out");
                return Err(VcpError::Timeout {
                    operation: "event signing".to_string(),
                    after_ms: self.sign_timeout.as_millis() as u64,
                });
            }
            Ok(Err(e @ VcpError::SignatureFailure { .. })) => return Err(e),
            Ok(Err(other)) => {
                return Err(VcpError::SignatureFailure {
                    reason: other.to_string(),
                })
            }
            Ok(Ok(signature)) => signature,
        };

        let event_hash = hex::encode(digest);
        let event = Arc::new(Event {
            header,
            payload,
            security: Security {
                event_hash: event_hash.clone(),
                prev_hash: writer.tip.clone(),
                signature: hex::encode(signature),
                sign_algo: signer.algorithm(),
                signer_key: signer.public_key_hex(),
            },
        });

        let sequence = {
            let mut store = self.write_store()?;
            let sequence = store.events.len() as u64;
            store.index.insert(&event, sequence);
            store.events.push(Arc::clone(&event));
            sequence
        };
        writer.tip = event_hash;

        debug!(
            event_id = %event.id(),
            sequence,
            event_type = %event.header.event_type,
            symbol = %event.header.symbol,
            "event appended"
        );
        Ok(event)
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// Run `f` against a consistent view of the published ledger.
    ///
    /// `f` runs under the read lock; keep it short and never block in it.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerView) -> R) -> VcpResult<R> {
        let store = self.read_store()?;
        Ok(f(&store))
    }

    pub fn get(&self, id: &EventId) -> VcpResult<Arc<Event>> {
        self.locate(id).map(|located| located.event)
    }

    /// The event, its sequence and its batch state.
    pub fn locate(&self, id: &EventId) -> VcpResult<LocatedEvent> {
        let store = self.read_store()?;
        store
            .sequence_of(id)
            .and_then(|sequence| store.locate(sequence))
            .ok_or_else(|| VcpError::not_found("event", id))
    }

    pub fn len(&self) -> VcpResult<usize> {
        self.read(LedgerView::len)
    }

    pub fn is_empty(&self) -> VcpResult<bool> {
        self.read(LedgerView::is_empty)
    }

    /// `event_hash` of the newest published event, or the genesis sentinel.
    pub fn tip(&self) -> VcpResult<String> {
        self.read(|view| view.tip_hash().to_string())
    }

    /// Events with sequence in `[start, end)`, clipped to the ledger.
    pub fn events_range(&self, start: u64, end: u64) -> VcpResult<Vec<Arc<Event>>> {
        self.read(|view| {
            let len = view.len();
            let lo = (start as usize).min(len);
            let hi = (end as usize).clamp(lo, len);
            view.events()[lo..hi].to_vec()
        })
    }

    /// Every published event, in order.
    pub fn snapshot(&self) -> VcpResult<Vec<Arc<Event>>> {
        self.read(|view| view.events().to_vec())
    }

    /// Recompute every hash, link and signature in the ledger.
    ///
    /// A failure is an integrity violation and is reported, never repaired.
    pub fn verify_integrity(&self) -> VcpResult<()> {
        let events = self.snapshot()?;
        verify_chain(events.iter().map(|e| e.as_ref()))?;
        debug!(events = events.len(), "chain verified");
        Ok(())
    }

    /// Verify only the events published since the last call and advance
    /// the checkpoint past them.  Returns how many events were checked.
    ///
    /// On a violation the checkpoint stays where it was, so every later
    /// call reports the same failure.
    pub fn verify_new(&self) -> VcpResult<u64> {
        let mut checkpoint = self.checkpoint()?;
        let tail = self.read(|view| {
            let from = (checkpoint.verified() as usize).min(view.len());
            view.events()[from..].to_vec()
        })?;
        if tail.is_empty() {
            return Ok(0);
        }
        let next = checkpoint.extend(tail.iter().map(|e| e.as_ref()))?;
        *checkpoint = next;
        debug!(
            checked = tail.len(),
            verified = checkpoint.verified(),
            "chain tail verified"
        );
        Ok(tail.len() as u64)
    }

    /// Number of events covered by [`verify_new`](Self::verify_new) so far.
    pub fn verified_len(&self) -> VcpResult<u64> {
        Ok(self.checkpoint()?.verified())
    }

    // ── Batching ──────────────────────────────────────────────────────────────

    /// The oldest events not yet in any batch, at most `max` of them,
    /// together with the sequence of the first one.
    pub fn unbatched(&self, max: usize) -> VcpResult<(u64, Vec<Arc<Event>>)> {
        self.read(|view| {
            let first = view.batched_len();
            let lo = first as usize;
            let hi = view.len().min(lo.saturating_add(max));
            (first, view.events()[lo..hi].to_vec())
        })
    }

    /// Register a sealed batch.
    ///
    /// The batch must be the next id, start where the previous batch ended
    /// and list exactly the events at those sequences, so every event is
    /// batched exactly once.
    pub fn record_batch(&self, batch: MerkleBatch) -> VcpResult<Arc<MerkleBatch>> {
        let mut store = self.write_store()?;

        let next_id = store.batches.len() as u64;
        if batch.batch_id != next_id {
            return Err(VcpError::InvalidInput {
                reason: format!("batch id {} out of order, expected {}", batch.batch_id, next_id),
            });
        }
        let next_sequence = store.batched_len();
        if batch.first_sequence != next_sequence {
            return Err(VcpError::InvalidInput {
                reason: format!(
                    "batch {} starts at sequence {}, expected {}",
                    batch.batch_id, batch.first_sequence, next_sequence
                ),
            });
        }
        if batch.end_sequence() > store.events.len() as u64 {
            return Err(VcpError::InvalidInput {
                reason: format!("batch {} extends past the ledger tail", batch.batch_id),
            });
        }
        let covers_ledger = batch
            .event_ids
            .iter()
            .zip(&store.events[batch.first_sequence as usize..])
            .all(|(id, event)| *id == event.id());
        if !covers_ledger {
            return Err(VcpError::InvalidInput {
                reason: format!("batch {} does not match the ledger's events", batch.batch_id),
            });
        }

        let batch = Arc::new(batch);
        store.batches.push(BatchState {
            batch: Arc::clone(&batch),
            status: AnchorStatus::Pending,
            anchor: None,
        });
        Ok(batch)
    }

    pub fn batch_state(&self, batch_id: u64) -> VcpResult<BatchState> {
        self.read(|view| view.batch(batch_id).cloned())?
            .ok_or_else(|| VcpError::not_found("batch", batch_id))
    }

    // ── Anchor state ──────────────────────────────────────────────────────────

    fn with_batch<R>(
        &self,
        batch_id: u64,
        f: impl FnOnce(&mut BatchState) -> R,
    ) -> VcpResult<R> {
        let mut store = self.write_store()?;
        let state = store
            .batches
            .get_mut(batch_id as usize)
            .ok_or_else(|| VcpError::not_found("batch", batch_id))?;
        Ok(f(state))
    }

    /// Attach or replace the anchor record without touching the status.
    pub fn set_anchor_record(&self, batch_id: u64, record: AnchorRecord) -> VcpResult<()> {
        self.with_batch(batch_id, |state| state.anchor = Some(record))
    }

    /// Move the batch forward to `status` and store `record`.
    ///
    /// A backward move is ignored and the current status kept, so a late
    /// or repeated observation can never downgrade a batch.  Returns the
    /// status the batch ends up in.
    pub fn advance_anchor(
        &self,
        batch_id: u64,
        status: AnchorStatus,
        record: AnchorRecord,
    ) -> VcpResult<AnchorStatus> {
        self.with_batch(batch_id, |state| {
            if state.status.can_advance_to(status) {
                if state.status != status {
                    info!(
                        batch_id,
                        from = ?state.status,
                        to = ?status,
                        tx_hash = %record.tx_hash,
                        "batch anchor status advanced"
                    );
                }
                state.status = status;
            } else {
                debug!(batch_id, current = ?state.status, observed = ?status, "ignoring backward anchor status");
            }
            state.anchor = Some(record);
            state.status
        })
    }

    /// Explicitly return the batch to `Pending` after its anchoring
    /// transaction was dropped.  `record` is the failed record.
    pub fn revert_anchor(&self, batch_id: u64, record: AnchorRecord) -> VcpResult<()> {
        self.with_batch(batch_id, |state| {
            warn!(
                batch_id,
                from = ?state.status,
                tx_hash = %record.tx_hash,
                "anchor dropped, batch reverted to PENDING"
            );
            state.status = AnchorStatus::Pending;
            state.anchor = Some(record);
        })
    }
}
