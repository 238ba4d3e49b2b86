//! Self-contained event certificates.
//!
//! A certificate carries the sealed event, its inclusion proof and the
//! anchor record.  A third party can check all of it without talking to
//! the ledger that issued it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    anchor::AnchorRecord,
    event::{AnchorStatus, Event, EventId},
    merkle::MerkleProof,
    system::ComplianceTier,
};

/// Format version of the certificate document.
pub const CERTIFICATE_VERSION: &str = "1";

/// Issuing system metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSystem {
    pub vcp_version: String,
    pub tier: ComplianceTier,
}

/// Body of `GET /events/{id}/certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub certificate_version: String,
    pub event_id: EventId,
    pub generated_at: DateTime<Utc>,
    pub system: CertificateSystem,
    /// The sealed event exactly as the Merkle leaf committed it.
    pub event: Event,
    /// Batch anchor status at issuance time.
    pub anchor_status: AnchorStatus,
    pub merkle_proof: MerkleProof,
    pub anchor_info: AnchorRecord,
}

/// Outcome of verifying a certificate offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateCheck {
    /// `event_hash` recomputes from header and payload.
    pub event_hash_valid: bool,
    /// The signature over `event_hash` verifies under `signer_key`.
    pub signature_valid: bool,
    /// The leaf hash recomputes from the event and the audit path
    /// reproduces `root_hash`.
    pub inclusion_valid: bool,
    /// The anchor record commits the same root as the proof.
    pub anchor_matches_root: bool,
}

impl CertificateCheck {
    pub fn passed(&self) -> bool {
        self.event_hash_valid
            && self.signature_valid
            && self.inclusion_valid
            && self.anchor_matches_root
    }
}
