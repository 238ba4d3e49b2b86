//! Read-side views served to API clients.
//!
//! The sealed `Event` never carries anchor state.  These views compose it
//! with the state of the event's batch at read time.

use serde::{Deserialize, Serialize};

use crate::{
    anchor::AnchorInfo,
    event::{AnchorStatus, Event, EventHeader, EventId, EventType, HashAlgo, Security},
    merkle::MerkleProof,
    payload::Payload,
};

/// Header as served: the sealed header plus the batch's anchor status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderView {
    #[serde(flatten)]
    pub header: EventHeader,
    pub anchor_status: AnchorStatus,
}

/// Security block as served: sealed fields plus batch root and anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityView {
    #[serde(flatten)]
    pub security: Security,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorInfo>,
}

/// Full event detail, the body of `GET /events/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetail {
    pub header: HeaderView,
    pub payload: Payload,
    pub security: SecurityView,
}

impl EventDetail {
    pub fn compose(
        event: &Event,
        anchor_status: AnchorStatus,
        merkle_root: Option<String>,
        anchor: Option<AnchorInfo>,
    ) -> Self {
        Self {
            header: HeaderView {
                header: event.header.clone(),
                anchor_status,
            },
            payload: event.payload.clone(),
            security: SecurityView {
                security: event.security.clone(),
                merkle_root,
                anchor,
            },
        }
    }
}

/// One row of a list or search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    pub event_id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub event_type_code: u16,
    pub timestamp: String,
    pub venue: String,
    pub symbol: String,
    pub hash_prefix: String,
    pub status: AnchorStatus,
}

impl EventSummary {
    pub fn of(event: &Event, status: AnchorStatus) -> Self {
        Self {
            event_id: event.header.event_id,
            event_type: event.header.event_type,
            event_type_code: event.header.event_type_code,
            timestamp: event.header.timestamp_iso.clone(),
            venue: event.header.venue_id.clone(),
            symbol: event.header.symbol.clone(),
            hash_prefix: event.hash_prefix().to_string(),
            status,
        }
    }
}

/// Body of `GET /events/{id}/proof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProofView {
    pub event_id: EventId,
    pub event_hash: String,
    pub merkle_proof: MerkleProof,
    pub anchor_info: AnchorInfo,
    pub hash_algo: HashAlgo,
    pub verification_hint: String,
}
