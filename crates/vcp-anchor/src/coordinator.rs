//! `AnchorCoordinator`: commits batch roots to the external ledger and
//! tracks them to confirmation.
//!
//! Lifecycle of one batch:
//!
//! ```text
//!   submit ──▶ record PENDING ──poll──▶ Included (< required) ──▶ batch ANCHORED
//!                   │                   Included (≥ required) ──▶ batch VERIFIED
//!                   │                   Pending / Unknown     ──▶ unchanged
//!                   └────────────────── Dropped ──▶ record FAILED, batch PENDING,
//!                                                   root released and resubmitted
//! ```
//!
//! Submission is idempotent per root: while a root has a live record, a
//! second submit returns that record instead of writing again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use vcp_contracts::{
    anchor::{AnchorRecord, AnchorRecordStatus, TxStatus},
    error::{VcpError, VcpResult},
    event::AnchorStatus,
};
use vcp_core::{config::AnchorConfig, traits::AnchorClient};
use vcp_ledger::HashChainLedger;

use crate::retry::{retry_with_backoff, RetryPolicy};

/// Live anchoring attempts, keyed both ways.
#[derive(Debug, Default)]
struct Registry {
    by_root: HashMap<String, AnchorRecord>,
    root_by_tx: HashMap<String, String>,
}

/// What one pass of [`AnchorCoordinator::tick`] did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub submitted: usize,
    pub polled: usize,
    pub failures: usize,
}

pub struct AnchorCoordinator {
    ledger: Arc<HashChainLedger>,
    client: Arc<dyn AnchorClient>,
    retry: RetryPolicy,
    submit_timeout: Duration,
    poll_timeout: Duration,
    confirmations_required: u64,
    registry: Mutex<Registry>,
    /// Serializes submissions so two callers can never both miss the
    /// registry and write the same root twice.
    submit_gate: tokio::sync::Mutex<()>,
}

impl AnchorCoordinator {
    pub fn new(
        ledger: Arc<HashChainLedger>,
        client: Arc<dyn AnchorClient>,
        config: &AnchorConfig,
    ) -> Self {
        Self {
            ledger,
            client,
            retry: RetryPolicy::from_config(config),
            submit_timeout: config.submit_timeout(),
            poll_timeout: config.poll_timeout(),
            confirmations_required: config.confirmations_required.max(1),
            registry: Mutex::new(Registry::default()),
            submit_gate: tokio::sync::Mutex::new(()),
        }
    }

    fn registry(&self) -> VcpResult<MutexGuard<'_, Registry>> {
        self.registry.lock().map_err(|e| VcpError::InternalFault {
            reason: format!("anchor registry lock poisoned: {}", e),
        })
    }

    pub fn network(&self) -> &str {
        self.client.network()
    }

    // ── Submit ────────────────────────────────────────────────────────────────

    /// Commit the root of `batch_id` to the external ledger.
    ///
    /// Returns the existing record if the root already has a live one.
    /// Each attempt is bounded by the submit timeout; retryable failures
    /// back off and retry.  When attempts run out the result is
    /// `AnchoringUnavailable` and the batch is left `PENDING` untouched.
    pub async fn submit(&self, batch_id: u64) -> VcpResult<AnchorRecord> {
        let _gate = self.submit_gate.lock().await;
        self.submit_gated(batch_id).await
    }

    /// Body of [`submit`](Self::submit).  The caller holds `submit_gate`.
    async fn submit_gated(&self, batch_id: u64) -> VcpResult<AnchorRecord> {
        let state = self.ledger.batch_state(batch_id)?;
        let root = state.batch.root_hex();

        let existing = self.registry()?.by_root.get(&root).cloned();
        if let Some(existing) = existing {
            debug!(batch_id, root = %root, tx_hash = %existing.tx_hash, "root already anchored, reusing record");
            return Ok(existing);
        }

        let client = Arc::clone(&self.client);
        let outcome = retry_with_backoff(&self.retry, "anchor submit", self.submit_timeout, || {
            let client = Arc::clone(&client);
            let root = root.clone();
            async move { client.submit(&root).await }
        })
        .await;

        let attempted = match outcome {
            Ok(attempted) => attempted,
            Err((error, attempts)) => {
                warn!(batch_id, root = %root, attempts, error = %error, "anchor submission gave up");
                return Err(VcpError::AnchoringUnavailable {
                    reason: format!("root {root} not accepted after {attempts} attempt(s): {error}"),
                });
            }
        };

        let record = AnchorRecord {
            batch_id,
            root_hash: root.clone(),
            network: self.client.network().to_string(),
            tx_hash: attempted.value,
            status: AnchorRecordStatus::Pending,
            block_number: None,
            confirmations: 0,
            anchored_at: None,
            submitted_at: Utc::now(),
            attempts: attempted.attempts,
        };

        {
            let mut registry = self.registry()?;
            registry
                .root_by_tx
                .insert(record.tx_hash.clone(), root.clone());
            registry.by_root.insert(root, record.clone());
        }
        self.ledger.set_anchor_record(batch_id, record.clone())?;

        info!(
            batch_id,
            root = %record.root_hash,
            tx_hash = %record.tx_hash,
            network = %record.network,
            attempts = record.attempts,
            "batch root submitted"
        );
        Ok(record)
    }

    // ── Poll ──────────────────────────────────────────────────────────────────

    /// Ask the external ledger about `tx_hash` and move the batch forward.
    ///
    /// A poll that times out is a retryable `Timeout` and changes nothing.
    /// State is only written after the external answer is in hand, so a
    /// poll cancelled while waiting leaves the batch as it was.  Writes
    /// happen under `submit_gate`, and only while `tx_hash` is still the
    /// live transaction for its root; an answer about a superseded
    /// transaction returns the current record untouched.
    pub async fn poll_confirmation(&self, tx_hash: &str) -> VcpResult<AnchorRecord> {
        let record = self
            .live_record(tx_hash)?
            .ok_or_else(|| VcpError::not_found("anchor transaction", tx_hash))?;

        let status = tokio::time::timeout(self.poll_timeout, self.client.status(tx_hash))
            .await
            .map_err(|_| VcpError::Timeout {
                operation: "anchor poll".to_string(),
                after_ms: self.poll_timeout.as_millis() as u64,
            })??;

        if matches!(status, TxStatus::Unknown | TxStatus::Pending) {
            debug!(tx_hash, batch_id = record.batch_id, "anchor not yet included");
            return Ok(record);
        }

        let _gate = self.submit_gate.lock().await;
        let record = match self.live_record(tx_hash)? {
            Some(record) => record,
            None => {
                debug!(tx_hash, batch_id = record.batch_id, "anchor transaction superseded");
                return self.current_record(&record);
            }
        };

        match status {
            TxStatus::Unknown | TxStatus::Pending => Ok(record),
            TxStatus::Included {
                block_number,
                confirmations,
                observed_at,
            } => {
                let updated = AnchorRecord {
                    status: AnchorRecordStatus::Confirmed,
                    block_number: Some(block_number),
                    confirmations,
                    anchored_at: record.anchored_at.or(Some(observed_at)),
                    ..record
                };
                let target = if confirmations >= self.confirmations_required {
                    AnchorStatus::Verified
                } else {
                    AnchorStatus::Anchored
                };
                self.ledger
                    .advance_anchor(updated.batch_id, target, updated.clone())?;
                self.registry()?
                    .by_root
                    .insert(updated.root_hash.clone(), updated.clone());
                Ok(updated)
            }
            TxStatus::Dropped { reason } => {
                let failed = AnchorRecord {
                    status: AnchorRecordStatus::Failed,
                    block_number: None,
                    confirmations: 0,
                    anchored_at: None,
                    ..record
                };
                warn!(
                    batch_id = failed.batch_id,
                    tx_hash,
                    reason = %reason,
                    "anchor transaction dropped, resubmitting"
                );
                self.ledger.revert_anchor(failed.batch_id, failed.clone())?;
                {
                    let mut registry = self.registry()?;
                    registry.root_by_tx.remove(tx_hash);
                    registry.by_root.remove(&failed.root_hash);
                }
                self.submit_gated(failed.batch_id).await
            }
        }
    }

    /// The registry record for `tx_hash`, if that transaction is still the
    /// live one for its root.
    fn live_record(&self, tx_hash: &str) -> VcpResult<Option<AnchorRecord>> {
        let registry = self.registry()?;
        Ok(registry
            .root_by_tx
            .get(tx_hash)
            .and_then(|root| registry.by_root.get(root))
            .filter(|record| record.tx_hash == tx_hash)
            .cloned())
    }

    /// Whatever now stands for the root of `stale`: the live registry
    /// record, else the record the ledger holds for the batch.
    fn current_record(&self, stale: &AnchorRecord) -> VcpResult<AnchorRecord> {
        if let Some(live) = self.registry()?.by_root.get(&stale.root_hash).cloned() {
            return Ok(live);
        }
        let state = self.ledger.batch_state(stale.batch_id)?;
        Ok(state.anchor.unwrap_or_else(|| stale.clone()))
    }

    // ── Background pass ───────────────────────────────────────────────────────

    /// One pass over all batches: submit those without a live record, poll
    /// those not yet `VERIFIED`.  Failures are logged and left for the next
    /// pass; nothing here is fatal.
    pub async fn tick(&self) -> VcpResult<TickReport> {
        let (to_submit, to_poll) = self.ledger.read(|view| {
            let mut to_submit = Vec::new();
            let mut to_poll = Vec::new();
            for state in view.batches() {
                match &state.anchor {
                    None => to_submit.push(state.batch.batch_id),
                    Some(a) if a.status == AnchorRecordStatus::Failed => {
                        to_submit.push(state.batch.batch_id)
                    }
                    Some(a) if state.status != AnchorStatus::Verified => {
                        to_poll.push(a.tx_hash.clone())
                    }
                    Some(_) => {}
                }
            }
            (to_submit, to_poll)
        })?;

        let mut report = TickReport::default();
        for batch_id in to_submit {
            match self.submit(batch_id).await {
                Ok(_) => report.submitted += 1,
                Err(e) => {
                    warn!(batch_id, error = %e, "anchor submission deferred");
                    report.failures += 1;
                }
            }
        }
        for tx_hash in to_poll {
            match self.poll_confirmation(&tx_hash).await {
                Ok(_) => report.polled += 1,
                Err(e) => {
                    warn!(tx_hash = %tx_hash, error = %e, "anchor poll deferred");
                    report.failures += 1;
                }
            }
        }
        Ok(report)
    }

    /// The anchor record of the most recently anchored batch.
    pub fn last_anchor(&self) -> VcpResult<Option<AnchorRecord>> {
        self.ledger.read(|view| view.last_anchor().cloned())
    }
}
