//! # vcp-contracts
//!
//! Shared types, wire contracts, and errors for the VCP event ledger.
//!
//! All crates in the workspace import from here.  No ledger logic lives in
//! this crate: only data definitions, validation of caller input, and the
//! error taxonomy.

pub mod anchor;
pub mod certificate;
pub mod error;
pub mod event;
pub mod merkle;
pub mod payload;
pub mod query;
pub mod system;
pub mod view;

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use error::{ApiError, VcpError};
    use event::{AnchorStatus, EventDraft, EventId, EventType, TimestampNs};
    use payload::{DecimalString, Payload, TradeData};

    // ── Event type codes ─────────────────────────────────────────────────────

    /// Every event type keeps its published numeric code.
    #[test]
    fn event_type_codes_match_published_table() {
        let expected: [(&str, u16); 16] = [
            ("SIG", 1),
            ("ORD", 2),
            ("ACK", 3),
            ("EXE", 4),
            ("PRT", 5),
            ("REJ", 6),
            ("CXL", 7),
            ("MOD", 8),
            ("CLS", 9),
            ("ALG", 20),
            ("RSK", 21),
            ("AUD", 22),
            ("HBT", 98),
            ("ERR", 99),
            ("REC", 100),
            ("SNC", 101),
        ];
        for (name, code) in expected {
            let t: EventType = name.parse().unwrap();
            assert_eq!(t.code(), code, "code for {name} changed");
            assert_eq!(EventType::from_code(code).unwrap(), t);
        }
    }

    /// No two event types share a code.
    #[test]
    fn event_type_codes_are_unique() {
        let codes: HashSet<u16> = EventType::ALL.iter().map(|t| t.code()).collect();
        assert_eq!(codes.len(), EventType::ALL.len());
    }

    /// Unknown names and codes are rejected.
    #[test]
    fn unknown_event_type_is_invalid_input() {
        assert!(matches!(
            EventType::from_code(10),
            Err(VcpError::InvalidInput { .. })
        ));
        assert!(matches!(
            "XYZ".parse::<EventType>(),
            Err(VcpError::InvalidInput { .. })
        ));
    }

    /// Event types travel as their upper-case name.
    #[test]
    fn event_type_serializes_as_uppercase_name() {
        assert_eq!(serde_json::to_string(&EventType::Hbt).unwrap(), "\"HBT\"");
    }

    // ── Identifiers and timestamps ───────────────────────────────────────────

    /// Only UUID v7 strings parse as event ids.
    #[test]
    fn event_id_accepts_only_v7() {
        assert!(EventId::parse("01934e3a-7b2c-7f93-8f2a-1234567890ab").is_ok());

        // v4 id
        assert!(EventId::parse("9f1c6f8e-2b1a-4c3d-9e8f-0a1b2c3d4e5f").is_err());
        // not a uuid at all
        assert!(EventId::parse("not-an-id").is_err());
        // v7 nibble but wrong variant
        assert!(EventId::parse("01934e3a-7b2c-7f93-cf2a-1234567890ab").is_err());
    }

    /// Nanosecond timestamps travel as decimal strings.
    #[test]
    fn timestamp_serializes_as_string() {
        let ts = TimestampNs(1_732_453_325_123_456_789);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1732453325123456789\"");
        let back: TimestampNs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    /// The ISO form keeps all nine fractional digits.
    #[test]
    fn timestamp_iso_keeps_nanoseconds() {
        let ts = TimestampNs(1_732_453_325_123_456_789);
        assert_eq!(ts.to_iso(), "2024-11-24T13:02:05.123456789Z");
    }

    /// Timestamps parse from an integer or RFC 3339.
    #[test]
    fn timestamp_parse_accepts_both_forms() {
        let from_int = TimestampNs::parse("1732453325123456789").unwrap();
        let from_iso = TimestampNs::parse("2024-11-24T13:02:05.123456789Z").unwrap();
        assert_eq!(from_int, from_iso);
        assert!(TimestampNs::parse("yesterday").is_err());
        assert!(TimestampNs::parse("1960-01-01T00:00:00Z").is_err());
    }

    // ── Anchor status ────────────────────────────────────────────────────────

    /// Anchor status only advances.
    #[test]
    fn anchor_status_only_moves_forward() {
        assert!(AnchorStatus::Pending.can_advance_to(AnchorStatus::Anchored));
        assert!(AnchorStatus::Anchored.can_advance_to(AnchorStatus::Verified));
        assert!(AnchorStatus::Anchored.can_advance_to(AnchorStatus::Anchored));
        assert!(!AnchorStatus::Verified.can_advance_to(AnchorStatus::Anchored));
        assert!(!AnchorStatus::Anchored.can_advance_to(AnchorStatus::Pending));
    }

    // ── Payload validation ───────────────────────────────────────────────────

    fn trade(symbol: &str, price: &str) -> TradeData {
        TradeData {
            price: Some(DecimalString::new(price)),
            ..TradeData::new(symbol)
        }
    }

    /// Only plain signed decimals are accepted.
    #[test]
    fn decimal_strings_must_be_plain() {
        for ok in ["0", "2350.500", "-1.25", "100000.00"] {
            assert!(DecimalString::new(ok).validate("price").is_ok(), "{ok}");
        }
        for bad in ["", "1e5", "+1", "1_000", ".5", "5.", "1.2.3", "NaN"] {
            assert!(
                matches!(
                    DecimalString::new(bad).validate("price"),
                    Err(VcpError::InvalidPayload { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    /// Trade data must name the header symbol.
    #[test]
    fn draft_rejects_mismatched_trade_symbol() {
        let draft = EventDraft::new(EventType::Ord, "XNAS", "AAPL")
            .with_payload(Payload::default().with_trade(trade("TSLA", "1.00")));
        let err = draft.validate().unwrap_err();
        assert!(err.to_string().contains("does not match header symbol"));
    }

    /// Extensions cannot shadow a built-in module.
    #[test]
    fn draft_rejects_reserved_extension_name() {
        let draft = EventDraft::new(EventType::Hbt, "XNAS", "SYSTEM")
            .with_payload(Payload::default().with_extension("vcp_gov", vec![1, 2, 3]));
        assert!(matches!(
            draft.validate(),
            Err(VcpError::InvalidPayload { .. })
        ));
    }

    /// Opaque extension bytes are hex on the wire.
    #[test]
    fn extension_bytes_travel_as_hex() {
        let payload = Payload::default().with_extension("venue_raw", vec![0xde, 0xad]);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["extensions"]["venue_raw"], "dead");
    }

    /// Absent payload modules are left out of the JSON.
    #[test]
    fn empty_modules_are_omitted_from_the_wire() {
        let json = serde_json::to_string(&Payload::default()).unwrap();
        assert_eq!(json, "{}");
    }

    // ── Errors ───────────────────────────────────────────────────────────────

    /// Each error maps to its HTTP status.
    #[test]
    fn error_status_codes() {
        assert_eq!(VcpError::invalid_input("x").status_code(), 400);
        assert_eq!(VcpError::not_found("event", "abc").status_code(), 404);
        let unavailable = VcpError::ProofUnavailable {
            event_id: "abc".to_string(),
            reason: "batch pending".to_string(),
        };
        assert_eq!(unavailable.status_code(), 409);
        assert_eq!(VcpError::internal("boom").status_code(), 500);
    }

    /// Only transient failures are retryable.
    #[test]
    fn retryable_errors() {
        let conflict = VcpError::ChainConflict {
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        assert!(conflict.is_retryable());
        assert!(VcpError::Timeout {
            operation: "anchor submit".to_string(),
            after_ms: 10
        }
        .is_retryable());
        assert!(!VcpError::invalid_input("bad").is_retryable());
    }

    /// Internal faults reach the wire without their detail.
    #[test]
    fn api_error_hides_internal_detail() {
        let err = VcpError::internal("hash mismatch at sequence 4: stored abc recomputed def");
        let body = ApiError::from(&err);
        assert_eq!(body.error, "internal_error");
        assert!(!body.message.unwrap().contains("sequence 4"));

        let err = VcpError::not_found("event", "01934e3a-7b2c-7f93-8f2a-1234567890ab");
        let body = ApiError::from(&err);
        assert_eq!(body.error, "not_found");
        assert!(body.message.unwrap().contains("01934e3a"));
    }
}
