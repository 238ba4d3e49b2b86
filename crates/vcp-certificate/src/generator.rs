//! Certificate issuance and offline verification.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use vcp_contracts::{
    anchor::{AnchorRecord, AnchorRecordStatus},
    certificate::{Certificate, CertificateCheck, CertificateSystem, CERTIFICATE_VERSION},
    error::{VcpError, VcpResult},
    event::{EventId, HashAlgo},
    merkle::MerkleProof,
    view::MerkleProofView,
};
use vcp_core::{canonical::decode_hash, signer::verify_signature};
use vcp_ledger::{event_hash_matches, HashChainLedger, LocatedEvent};
use vcp_merkle::{event_leaf_hash, verify_proof};

/// An event with everything needed to prove it, gathered under one read.
struct Provable {
    located: LocatedEvent,
    proof: MerkleProof,
    anchor: AnchorRecord,
}

pub struct CertificateGenerator {
    ledger: Arc<HashChainLedger>,
    system: CertificateSystem,
}

impl CertificateGenerator {
    pub fn new(ledger: Arc<HashChainLedger>, system: CertificateSystem) -> Self {
        Self { ledger, system }
    }

    /// Gather the proof material for `event_id`.
    ///
    /// `ProofUnavailable` until the event's batch has been sealed and its
    /// root observed in the external ledger.
    fn provable(&self, event_id: &EventId) -> VcpResult<Provable> {
        let located = self.ledger.locate(event_id)?;
        let unavailable = |reason: String| VcpError::ProofUnavailable {
            event_id: event_id.to_string(),
            reason,
        };

        let (Some(batch), Some(leaf_index)) = (located.batch.as_ref(), located.leaf_index()) else {
            return Err(unavailable("event has not been batched yet".to_string()));
        };
        if !batch.status.is_anchored() {
            return Err(unavailable(format!(
                "batch {} is not anchored yet",
                batch.batch.batch_id
            )));
        }
        let anchor = match &batch.anchor {
            Some(record) if record.status == AnchorRecordStatus::Confirmed => record.clone(),
            _ => {
                return Err(unavailable(format!(
                    "batch {} has no confirmed anchor record",
                    batch.batch.batch_id
                )))
            }
        };

        let proof = batch.batch.prove(leaf_index)?;

        // The stored leaf must still match the event it was built from.
        let leaf = event_leaf_hash(&located.event)?;
        if !verify_proof(&leaf, &proof) {
            error!(event_id = %event_id, batch_id = batch.batch.batch_id, "leaf does not prove against batch root");
            return Err(VcpError::InternalFault {
                reason: format!(
                    "event {} does not prove against root {} of batch {}",
                    event_id, proof.root_hash, batch.batch.batch_id
                ),
            });
        }

        Ok(Provable {
            located,
            proof,
            anchor,
        })
    }

    /// Issue a self-contained certificate for `event_id`.
    pub fn issue(&self, event_id: &EventId) -> VcpResult<Certificate> {
        let Provable {
            located,
            proof,
            anchor,
        } = self.provable(event_id)?;

        info!(
            event_id = %event_id,
            batch_id = anchor.batch_id,
            tx_hash = %anchor.tx_hash,
            "certificate issued"
        );

        Ok(Certificate {
            certificate_version: CERTIFICATE_VERSION.to_string(),
            event_id: *event_id,
            generated_at: Utc::now(),
            system: self.system.clone(),
            anchor_status: located.status(),
            event: (*located.event).clone(),
            merkle_proof: proof,
            anchor_info: anchor,
        })
    }

    /// The inclusion proof view for `event_id`.
    ///
    /// Unlike [`issue`](Self::issue), an event without an anchored proof is
    /// reported as `NotFound`: there is no proof resource to return yet.
    pub fn proof(&self, event_id: &EventId) -> VcpResult<MerkleProofView> {
        let Provable {
            located,
            proof,
            anchor,
        } = match self.provable(event_id) {
            Err(VcpError::ProofUnavailable { .. }) => {
                return Err(VcpError::not_found("merkle proof", event_id))
            }
            other => other?,
        };

        let anchor_info = anchor
            .info()
            .ok_or_else(|| VcpError::not_found("merkle proof", event_id))?;
        let verification_hint = format!(
            "Compute SHA256(0x00 || canonical_json(event)) and fold audit_path per RFC 9162 \
             (leaf_index {}, tree_size {}); the result must equal root_hash, which transaction \
             {} on {} commits.",
            proof.leaf_index, proof.tree_size, anchor_info.tx_hash, anchor_info.network
        );

        Ok(MerkleProofView {
            event_id: *event_id,
            event_hash: located.event.security.event_hash.clone(),
            merkle_proof: proof,
            anchor_info,
            hash_algo: HashAlgo::Sha256,
            verification_hint,
        })
    }
}

/// Check a certificate using nothing but its own contents.
pub fn verify_certificate(cert: &Certificate) -> CertificateCheck {
    let event = &cert.event;

    let event_hash_valid = cert.event_id == event.id()
        && event.header.is_consistent()
        && event_hash_matches(event).unwrap_or(false);

    let signature_valid = decode_hash(&event.security.event_hash)
        .map(|digest| {
            verify_signature(&event.security.signer_key, &digest, &event.security.signature)
        })
        .unwrap_or(false);

    let inclusion_valid = event_leaf_hash(event)
        .map(|leaf| verify_proof(&leaf, &cert.merkle_proof))
        .unwrap_or(false);

    let anchor_matches_root = cert.anchor_info.status == AnchorRecordStatus::Confirmed
        && cert.anchor_info.root_hash == cert.merkle_proof.root_hash;

    CertificateCheck {
        event_hash_valid,
        signature_valid,
        inclusion_valid,
        anchor_matches_root,
    }
}
