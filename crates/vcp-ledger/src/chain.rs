//! Hash-chain primitives: event hashing and full-chain verification.
//!
//! The event hash commits to the header and payload only:
//!
//! ```text
//! event_hash = SHA256(canonical_json({ "header": ..., "payload": ... }))
//! ```
//!
//! `prev_hash` sits in the security block next to the hash it links to, so
//! the chain is checked by comparing each `prev_hash` with the previous
//! event's `event_hash`.  The Merkle leaf covers the whole event, security
//! block included, so a rewritten link is still caught by any proof.

use serde::Serialize;
use tracing::error;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::{Event, EventHeader, EventId, Security, TimestampNs},
    payload::Payload,
};
use vcp_core::{
    canonical::{canonical_sha256, decode_hash},
    signer::verify_signature,
};

#[derive(Serialize)]
struct HashedContent<'a> {
    header: &'a EventHeader,
    payload: &'a Payload,
}

/// SHA-256 over the canonical `{header, payload}` document.
pub fn hash_event_content(header: &EventHeader, payload: &Payload) -> VcpResult<[u8; 32]> {
    canonical_sha256(&HashedContent { header, payload })
}

/// Recompute `event.security.event_hash` and compare.
pub fn event_hash_matches(event: &Event) -> VcpResult<bool> {
    let recomputed = hash_event_content(&event.header, &event.payload)?;
    Ok(hex::encode(recomputed) == event.security.event_hash)
}

/// How far a chain has been verified: the number of events checked and
/// what the next event must follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainCheckpoint {
    verified: u64,
    tip: String,
    last: Option<(EventId, TimestampNs)>,
}

impl Default for ChainCheckpoint {
    fn default() -> Self {
        Self {
            verified: 0,
            tip: Security::GENESIS_HASH.to_string(),
            last: None,
        }
    }
}

impl ChainCheckpoint {
    /// Number of events from the genesis already verified.
    pub fn verified(&self) -> u64 {
        self.verified
    }

    /// `event_hash` the next event must link to.
    pub fn tip(&self) -> &str {
        &self.tip
    }

    /// Verify `events`, which continue the chain at sequence
    /// [`verified`](Self::verified), and return the checkpoint after them.
    ///
    /// Checks, per event:
    ///
    /// 1. **Linkage**: `prev_hash` equals the previous `event_hash`
    ///    (`GENESIS_HASH` for sequence 0).
    /// 2. **Hash**: `event_hash` recomputes from header and payload.
    /// 3. **Header**: derived fields (`event_type_code`, `timestamp_iso`)
    ///    agree with their sources.
    /// 4. **Order**: ids strictly increase, timestamps never decrease.
    /// 5. **Signature**: verifies under the recorded `signer_key`.
    ///
    /// The first violation is returned as `InternalFault` naming the
    /// sequence and the hashes involved; `self` is left as it was.
    pub fn extend<'a, I>(&self, events: I) -> VcpResult<ChainCheckpoint>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut next = self.clone();
        for event in events {
            next.check(event)?;
        }
        Ok(next)
    }

    fn check(&mut self, event: &Event) -> VcpResult<()> {
        let sequence = self.verified;
        let security = &event.security;

        if security.prev_hash != self.tip {
            return Err(violation(
                sequence,
                format!(
                    "prev_hash {} does not link to preceding event_hash {}",
                    security.prev_hash, self.tip
                ),
            ));
        }

        let recomputed = hex::encode(hash_event_content(&event.header, &event.payload)?);
        if recomputed != security.event_hash {
            return Err(violation(
                sequence,
                format!(
                    "stored event_hash {} but recomputed {}",
                    security.event_hash, recomputed
                ),
            ));
        }

        if !event.header.is_consistent() {
            return Err(violation(
                sequence,
                "header derived fields disagree with their sources".to_string(),
            ));
        }

        if let Some((prev_id, prev_ts)) = self.last {
            if event.id() <= prev_id {
                return Err(violation(
                    sequence,
                    format!("event_id {} does not follow {}", event.id(), prev_id),
                ));
            }
            if event.timestamp() < prev_ts {
                return Err(violation(
                    sequence,
                    format!(
                        "timestamp {} precedes previous timestamp {}",
                        event.timestamp(),
                        prev_ts
                    ),
                ));
            }
        }

        let digest = decode_hash(&security.event_hash)?;
        if !verify_signature(&security.signer_key, &digest, &security.signature) {
            return Err(violation(
                sequence,
                format!("signature over {} does not verify", security.event_hash),
            ));
        }

        self.verified += 1;
        self.tip = security.event_hash.clone();
        self.last = Some((event.id(), event.timestamp()));
        Ok(())
    }
}

/// Verify an ordered run of events starting at the genesis.
pub fn verify_chain<'a, I>(events: I) -> VcpResult<()>
where
    I: IntoIterator<Item = &'a Event>,
{
    ChainCheckpoint::default().extend(events).map(|_| ())
}

fn violation(sequence: u64, detail: String) -> VcpError {
    error!(sequence, detail = %detail, "chain integrity violation");
    VcpError::InternalFault {
        reason: format!("chain integrity violation at sequence {sequence}: {detail}"),
    }
}
