//! `VcpNode`: one ledger with its batcher, anchor coordinator, search
//! engine and certificate generator wired together.
//!
//! The node owns the only writer handle to the ledger.  Batch sealing runs
//! outside the ledger's locks: the tail is read, the Merkle tree is built
//! with no lock held, and the finished batch is registered in one short
//! write, which rejects it if anything moved in between.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use vcp_anchor::{AnchorCoordinator, TickReport};
use vcp_certificate::{verify_certificate, CertificateGenerator};
use vcp_contracts::{
    certificate::{Certificate, CertificateCheck, CertificateSystem},
    error::{VcpError, VcpResult},
    event::{Event, EventDraft, EventId},
    query::{RecentEvents, SearchParams, SearchResponse},
    system::{CertifiedEntities, ComplianceTier, EntityStatus, NodeHealth, SystemStatus},
    view::{EventDetail, MerkleProofView},
};
use vcp_core::{
    config::NodeConfig,
    signer::Ed25519Signer,
    traits::{AnchorClient, Clock, EventSigner},
};
use vcp_ledger::HashChainLedger;
use vcp_merkle::{build_batch, BatchPolicy, MerkleBatch};
use vcp_query::SearchEngine;

/// What one background pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub sealed: usize,
    pub anchor: TickReport,
}

impl PassReport {
    pub fn is_idle(&self) -> bool {
        self.sealed == 0 && self.anchor == TickReport::default()
    }
}

pub struct VcpNode {
    config: NodeConfig,
    clock: Arc<dyn Clock>,
    signer: Arc<dyn EventSigner>,
    ledger: Arc<HashChainLedger>,
    coordinator: AnchorCoordinator,
    search: SearchEngine,
    certificates: CertificateGenerator,
    policy: BatchPolicy,
    /// Serializes sealers so batch ids are taken in order.
    seal_gate: Mutex<()>,
    worker_running: AtomicBool,
}

impl VcpNode {
    /// Wire a node around an explicit signer.
    pub fn new(
        config: NodeConfig,
        signer: Arc<dyn EventSigner>,
        anchor_client: Arc<dyn AnchorClient>,
        clock: Arc<dyn Clock>,
    ) -> VcpResult<Self> {
        config.validate()?;

        let ledger = Arc::new(HashChainLedger::new(
            Arc::clone(&clock),
            config.ledger.sign_timeout(),
        ));
        let coordinator = AnchorCoordinator::new(Arc::clone(&ledger), anchor_client, &config.anchor);
        let search = SearchEngine::new(Arc::clone(&ledger));
        let certificates = CertificateGenerator::new(
            Arc::clone(&ledger),
            CertificateSystem {
                vcp_version: config.system.vcp_version.clone(),
                tier: config.system.tier,
            },
        );
        let policy = BatchPolicy::new(config.batching.max_events, config.batching.max_age());

        info!(
            network = %coordinator.network(),
            signer_key = %signer.public_key_hex(),
            max_events = policy.max_events,
            "vcp node initialised"
        );

        Ok(Self {
            config,
            clock,
            signer,
            ledger,
            coordinator,
            search,
            certificates,
            policy,
            seal_gate: Mutex::new(()),
            worker_running: AtomicBool::new(false),
        })
    }

    /// Wire a node whose Ed25519 key comes from `ledger.signing_seed_hex`,
    /// or is generated fresh when no seed is configured.
    pub fn from_config(
        config: NodeConfig,
        anchor_client: Arc<dyn AnchorClient>,
        clock: Arc<dyn Clock>,
    ) -> VcpResult<Self> {
        let signer = match &config.ledger.signing_seed_hex {
            Some(seed) => Ed25519Signer::from_seed_hex(seed)?,
            None => {
                warn!("no signing seed configured, using an ephemeral key");
                Ed25519Signer::generate()
            }
        };
        Self::new(config, Arc::new(signer), anchor_client, clock)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<HashChainLedger> {
        &self.ledger
    }

    pub fn signer_key(&self) -> String {
        self.signer.public_key_hex()
    }

    // ── Writes ────────────────────────────────────────────────────────────────

    /// Append `draft`, signed with the node's key.
    pub async fn append(
        &self,
        draft: EventDraft,
        expected_prev: Option<&str>,
    ) -> VcpResult<Arc<Event>> {
        self.ledger
            .append(draft, self.signer.as_ref(), expected_prev)
            .await
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    pub fn get_event(&self, event_id: &EventId) -> VcpResult<EventDetail> {
        let located = self.ledger.locate(event_id)?;
        let status = located.status();
        let merkle_root = located.batch.as_ref().map(|b| b.batch.root_hex());
        let anchor = located
            .batch
            .as_ref()
            .filter(|b| b.status.is_anchored())
            .and_then(|b| b.anchor.as_ref())
            .and_then(|record| record.info());
        Ok(EventDetail::compose(&located.event, status, merkle_root, anchor))
    }

    pub fn recent(&self, limit: Option<i64>) -> VcpResult<RecentEvents> {
        self.search.recent(limit)
    }

    pub fn search(&self, params: &SearchParams) -> VcpResult<SearchResponse> {
        self.search.search(params)
    }

    pub fn proof(&self, event_id: &EventId) -> VcpResult<MerkleProofView> {
        self.certificates.proof(event_id)
    }

    pub fn certificate(&self, event_id: &EventId) -> VcpResult<Certificate> {
        self.certificates.issue(event_id)
    }

    pub fn verify_certificate(&self, certificate: &Certificate) -> CertificateCheck {
        verify_certificate(certificate)
    }

    /// Chain integrity and worker liveness.
    ///
    /// Only events published since the previous check are verified, so the
    /// cost follows the new tail rather than the ledger size.
    pub fn health(&self) -> NodeHealth {
        let chain_verified = match self.ledger.verify_new() {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "health check: chain verification failed");
                false
            }
        };
        NodeHealth {
            chain_verified,
            worker_running: self.worker_running.load(Ordering::SeqCst),
        }
    }

    pub fn system_status(&self) -> VcpResult<SystemStatus> {
        let health = self.health();
        let (total_events, total_batches, pending_events, last_anchor) =
            self.ledger.read(|view| {
                (
                    view.len() as u64,
                    view.batches().len() as u64,
                    view.pending_count(),
                    view.last_anchor().cloned(),
                )
            })?;

        Ok(SystemStatus {
            total_events,
            total_batches,
            pending_events,
            last_anchor,
            active_nodes: 1,
            health,
            precision: self.config.system.precision,
            tier: self.config.system.tier,
            vcp_version: self.config.system.vcp_version.clone(),
        })
    }

    /// The configured registry, narrowed to the given status and tier.
    pub fn certified_entities(
        &self,
        status: Option<EntityStatus>,
        tier: Option<ComplianceTier>,
    ) -> CertifiedEntities {
        let entities = self
            .config
            .entities
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .filter(|e| tier.map_or(true, |t| e.tier == t))
            .cloned()
            .collect();
        CertifiedEntities { entities }
    }

    // ── Batching and anchoring ────────────────────────────────────────────────

    /// Seal every batch the policy says is due.
    pub fn seal_due_batches(&self) -> VcpResult<Vec<Arc<MerkleBatch>>> {
        self.seal(false)
    }

    /// Seal the whole unbatched tail now, regardless of age.
    pub fn flush(&self) -> VcpResult<Vec<Arc<MerkleBatch>>> {
        self.seal(true)
    }

    fn seal(&self, force: bool) -> VcpResult<Vec<Arc<MerkleBatch>>> {
        let _gate = self.seal_gate.lock().map_err(|e| VcpError::InternalFault {
            reason: format!("seal gate lock poisoned: {}", e),
        })?;

        let mut sealed = Vec::new();
        loop {
            let (first, events) = self.ledger.unbatched(self.policy.max_events)?;
            let Some(oldest) = events.first() else {
                break;
            };
            let due = force
                || self
                    .policy
                    .is_due(events.len(), oldest.timestamp().0, self.clock.now_ns());
            if !due {
                debug!(waiting = events.len(), "no batch due");
                break;
            }

            let batch_id = self.ledger.read(|view| view.batches().len() as u64)?;
            let batch = build_batch(batch_id, first, events.iter().map(|e| e.as_ref()))?;
            sealed.push(self.ledger.record_batch(batch)?);
        }
        Ok(sealed)
    }

    /// One round of background work: seal due batches, then submit and
    /// poll anchors.
    pub async fn run_pass(&self) -> VcpResult<PassReport> {
        let checked = self.ledger.verify_new()?;
        if checked > 0 {
            debug!(checked, "chain tail verified");
        }
        let sealed = self.seal_due_batches()?.len();
        let anchor = self.coordinator.tick().await?;
        Ok(PassReport { sealed, anchor })
    }

    pub(crate) fn set_worker_running(&self, running: bool) {
        self.worker_running.store(running, Ordering::SeqCst);
    }
}
