//! Event identity, header, and security types.
//!
//! An `Event` is the sealed record the ledger appends: header, payload and
//! the security block that commits to both.  Once appended it never
//! changes.  Anchor state lives with the event's batch, not here, so that
//! the sealed bytes a Merkle leaf commits to stay fixed forever.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{
    error::{VcpError, VcpResult},
    payload::Payload,
};

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Parse `s` as a UUID v7 with the RFC 9562 variant.
fn parse_v7(s: &str, what: &str) -> VcpResult<Uuid> {
    let uuid = Uuid::parse_str(s).map_err(|e| VcpError::InvalidInput {
        reason: format!("{what} '{s}' is not a valid UUID: {e}"),
    })?;
    if uuid.get_version_num() != 7 || uuid.get_variant() != uuid::Variant::RFC4122 {
        return Err(VcpError::InvalidInput {
            reason: format!("{what} '{s}' must be a UUID v7"),
        });
    }
    Ok(uuid)
}

/// Time-ordered, globally unique event identifier (UUID v7).
///
/// Ordering follows the UUID byte order, which for v7 is millisecond time
/// first.  The ledger guarantees strictly increasing ids in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Validate and parse an externally supplied identifier.
    pub fn parse(s: &str) -> VcpResult<Self> {
        parse_v7(s, "event id").map(Self)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EventId {
    type Err = VcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Correlator grouping causally related events (order → ack → execution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(pub Uuid);

impl TraceId {
    /// Mint a fresh trace id for an event that starts a new trace.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn parse(s: &str) -> VcpResult<Self> {
        parse_v7(s, "trace id").map(Self)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Timestamps ────────────────────────────────────────────────────────────────

/// Nanoseconds since the Unix epoch, kept as an exact integer.
///
/// Serialized as a decimal string so JSON consumers limited to 53-bit
/// integers never lose precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimestampNs(pub u64);

impl TimestampNs {
    /// RFC 3339 rendering with all nine fractional digits and a `Z` suffix.
    pub fn to_iso(self) -> String {
        let secs = (self.0 / 1_000_000_000) as i64;
        let nanos = (self.0 % 1_000_000_000) as u32;
        match DateTime::from_timestamp(secs, nanos) {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Nanos, true),
            None => String::new(),
        }
    }

    /// Parse either a nanosecond integer string or an RFC 3339 instant.
    pub fn parse(s: &str) -> VcpResult<Self> {
        let trimmed = s.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed.parse::<u64>().map(Self).map_err(|e| VcpError::InvalidInput {
                reason: format!("timestamp '{s}' is out of range: {e}"),
            });
        }
        let dt = DateTime::parse_from_rfc3339(trimmed).map_err(|e| VcpError::InvalidInput {
            reason: format!("timestamp '{s}' is neither RFC 3339 nor integer nanoseconds: {e}"),
        })?;
        let nanos = dt.timestamp_nanos_opt().ok_or_else(|| VcpError::InvalidInput {
            reason: format!("timestamp '{s}' is outside the representable range"),
        })?;
        u64::try_from(nanos).map(Self).map_err(|_| VcpError::InvalidInput {
            reason: format!("timestamp '{s}' precedes the Unix epoch"),
        })
    }
}

impl fmt::Display for TimestampNs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for TimestampNs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TimestampNs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<u64>()
            .map(TimestampNs)
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp_int '{raw}': {e}")))
    }
}

// ── Enumerations ──────────────────────────────────────────────────────────────

/// The fixed set of event types.
///
/// Each type maps to an immutable numeric code.  The mapping is a published
/// wire contract: codes are never reassigned, new types get new codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// Trading signal.
    Sig,
    /// Order submitted.
    Ord,
    /// Order acknowledged by the venue.
    Ack,
    /// Execution (fill).
    Exe,
    /// Partial fill.
    Prt,
    /// Order rejected.
    Rej,
    /// Order cancelled.
    Cxl,
    /// Order modified.
    Mod,
    /// Position closed.
    Cls,
    /// Algorithm lifecycle / governance event.
    Alg,
    /// Risk control event.
    Rsk,
    /// Audit event.
    Aud,
    /// Heartbeat.
    Hbt,
    /// Error.
    Err,
    /// Recovery.
    Rec,
    /// Clock synchronisation.
    Snc,
}

impl EventType {
    pub const ALL: [EventType; 16] = [
        EventType::Sig,
        EventType::Ord,
        EventType::Ack,
        EventType::Exe,
        EventType::Prt,
        EventType::Rej,
        EventType::Cxl,
        EventType::Mod,
        EventType::Cls,
        EventType::Alg,
        EventType::Rsk,
        EventType::Aud,
        EventType::Hbt,
        EventType::Err,
        EventType::Rec,
        EventType::Snc,
    ];

    /// The published wire code for this type.
    pub const fn code(self) -> u16 {
        match self {
            EventType::Sig => 1,
            EventType::Ord => 2,
            EventType::Ack => 3,
            EventType::Exe => 4,
            EventType::Prt => 5,
            EventType::Rej => 6,
            EventType::Cxl => 7,
            EventType::Mod => 8,
            EventType::Cls => 9,
            EventType::Alg => 20,
            EventType::Rsk => 21,
            EventType::Aud => 22,
            EventType::Hbt => 98,
            EventType::Err => 99,
            EventType::Rec => 100,
            EventType::Snc => 101,
        }
    }

    /// Decode a wire code.  Unknown codes are rejected, never guessed.
    pub fn from_code(code: u16) -> VcpResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| VcpError::InvalidInput {
                reason: format!("unknown event type code {code}"),
            })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::Sig => "SIG",
            EventType::Ord => "ORD",
            EventType::Ack => "ACK",
            EventType::Exe => "EXE",
            EventType::Prt => "PRT",
            EventType::Rej => "REJ",
            EventType::Cxl => "CXL",
            EventType::Mod => "MOD",
            EventType::Cls => "CLS",
            EventType::Alg => "ALG",
            EventType::Rsk => "RSK",
            EventType::Aud => "AUD",
            EventType::Hbt => "HBT",
            EventType::Err => "ERR",
            EventType::Rec => "REC",
            EventType::Snc => "SNC",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = VcpError;

    fn from_str(s: &str) -> Result<Self, VcpError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| VcpError::InvalidInput {
                reason: format!("unknown event type '{s}'"),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimestampPrecision {
    #[default]
    Nanosecond,
    Microsecond,
    Millisecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClockSyncStatus {
    PtpLocked,
    NtpSynced,
    #[default]
    BestEffort,
    Unreliable,
}

/// Hash algorithm named in the header.  The ledger only produces `Sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HashAlgo {
    #[default]
    Sha256,
    #[serde(rename = "SHA3_256")]
    Sha3_256,
    Blake3,
}

/// Signature algorithm named in the security block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignAlgo {
    #[default]
    Ed25519,
    EcdsaSecp256k1,
    #[serde(rename = "RSA_2048")]
    Rsa2048,
}

/// Anchor lifecycle shared by every event in a batch.
///
/// Advances `Pending → Anchored → Verified`.  The only backward move is an
/// explicit revert to `Pending` after the anchoring transaction is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnchorStatus {
    #[default]
    Pending,
    Anchored,
    Verified,
}

impl AnchorStatus {
    fn rank(self) -> u8 {
        match self {
            AnchorStatus::Pending => 0,
            AnchorStatus::Anchored => 1,
            AnchorStatus::Verified => 2,
        }
    }

    /// True when moving from `self` to `next` is a forward transition.
    /// Staying in place is allowed so that repeated polls are idempotent.
    pub fn can_advance_to(self, next: AnchorStatus) -> bool {
        next.rank() >= self.rank()
    }

    /// True once the batch root has been observed in the external ledger.
    pub fn is_anchored(self) -> bool {
        self != AnchorStatus::Pending
    }
}

// ── Sealed event ──────────────────────────────────────────────────────────────

/// Event header.  Every field is fixed at append time by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    pub event_id: EventId,
    pub trace_id: TraceId,
    pub timestamp_int: TimestampNs,
    /// Derived from `timestamp_int`; kept in the header so the wire record
    /// is self-describing.
    pub timestamp_iso: String,
    pub event_type: EventType,
    pub event_type_code: u16,
    pub timestamp_precision: TimestampPrecision,
    pub clock_sync_status: ClockSyncStatus,
    pub hash_algo: HashAlgo,
    pub venue_id: String,
    pub symbol: String,
}

impl EventHeader {
    /// Check the derived fields agree with their sources.
    pub fn is_consistent(&self) -> bool {
        self.event_type_code == self.event_type.code()
            && self.timestamp_iso == self.timestamp_int.to_iso()
    }
}

/// The cryptographic commitments of a sealed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    /// SHA-256 (hex) of the canonical serialization of `{header, payload}`.
    pub event_hash: String,

    /// `event_hash` of the previous event, or `GENESIS_HASH` for the first.
    pub prev_hash: String,

    /// Signature (hex) over the 32 raw bytes of `event_hash`.
    pub signature: String,

    pub sign_algo: SignAlgo,

    /// Hex-encoded public key of the signing node.
    pub signer_key: String,
}

impl Security {
    /// The sentinel `prev_hash` of the first event in the chain.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// A sealed, immutable ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub header: EventHeader,
    pub payload: Payload,
    pub security: Security,
}

impl Event {
    pub fn id(&self) -> EventId {
        self.header.event_id
    }

    pub fn timestamp(&self) -> TimestampNs {
        self.header.timestamp_int
    }

    /// First six hex characters of the event hash, used in list views.
    pub fn hash_prefix(&self) -> &str {
        let end = self.security.event_hash.len().min(6);
        &self.security.event_hash[..end]
    }
}

// ── Append input ──────────────────────────────────────────────────────────────

/// What a caller supplies to append an event.
///
/// The ledger fills in id, timestamp, hash algorithm and the security block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Existing trace to join; `None` starts a new trace.
    #[serde(default)]
    pub trace_id: Option<TraceId>,
    pub event_type: EventType,
    pub venue_id: String,
    pub symbol: String,
    #[serde(default)]
    pub timestamp_precision: TimestampPrecision,
    #[serde(default)]
    pub clock_sync_status: ClockSyncStatus,
    #[serde(default)]
    pub payload: Payload,
}

impl EventDraft {
    pub fn new(event_type: EventType, venue_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            trace_id: None,
            event_type,
            venue_id: venue_id.into(),
            symbol: symbol.into(),
            timestamp_precision: TimestampPrecision::default(),
            clock_sync_status: ClockSyncStatus::default(),
            payload: Payload::default(),
        }
    }

    pub fn with_trace(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_clock_sync(mut self, status: ClockSyncStatus) -> Self {
        self.clock_sync_status = status;
        self
    }

    /// Reject drafts the ledger must never seal.
    pub fn validate(&self) -> VcpResult<()> {
        if self.venue_id.trim().is_empty() {
            return Err(VcpError::InvalidPayload {
                reason: "venue_id must not be empty".to_string(),
            });
        }
        if self.symbol.trim().is_empty() {
            return Err(VcpError::InvalidPayload {
                reason: "symbol must not be empty".to_string(),
            });
        }
        if let Some(trade) = &self.payload.trade_data {
            if trade.symbol != self.symbol {
                return Err(VcpError::InvalidPayload {
                    reason: format!(
                        "trade_data.symbol '{}' does not match header symbol '{}'",
                        trade.symbol, self.symbol
                    ),
                });
            }
        }
        self.payload.validate()
    }
}
