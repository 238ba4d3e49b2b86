//! # vcp-certificate
//!
//! Certificates let a third party check a single event end to end without
//! access to the ledger:
//!
//! 1. the event hash recomputes from header and payload,
//! 2. the signature verifies under the embedded public key,
//! 3. the Merkle proof folds the event's leaf up to the batch root,
//! 4. the anchor record commits that same root externally.
//!
//! Certificates are only issued once the event's batch is anchored; before
//! that the answer is `ProofUnavailable`.

pub mod generator;

pub use generator::{verify_certificate, CertificateGenerator};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use vcp_anchor::{AnchorCoordinator, SimulatedAnchorClient};
    use vcp_contracts::{
        anchor::AnchorRecordStatus,
        certificate::{Certificate, CertificateSystem},
        error::VcpError,
        event::{AnchorStatus, Event, EventDraft, EventId, EventType},
        payload::{DecimalString, Payload, TradeData},
        system::ComplianceTier,
    };
    use vcp_core::{clock::ManualClock, config::AnchorConfig, signer::Ed25519Signer};
    use vcp_ledger::HashChainLedger;
    use vcp_merkle::build_batch;

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    struct Fixture {
        ledger: Arc<HashChainLedger>,
        client: Arc<SimulatedAnchorClient>,
        coordinator: AnchorCoordinator,
        generator: CertificateGenerator,
        events: Vec<Arc<Event>>,
    }

    fn anchor_config() -> AnchorConfig {
        AnchorConfig {
            network: "testnet".to_string(),
            confirmations_required: 2,
            backoff_initial_ms: 0,
            backoff_max_ms: 0,
            ..AnchorConfig::default()
        }
    }

    fn execution(symbol: &str, price: &str) -> EventDraft {
        let trade = TradeData {
            execution_price: Some(DecimalString::new(price)),
            executed_qty: Some(DecimalString::new("100")),
            ..TradeData::new(symbol)
        };
        EventDraft::new(EventType::Exe, "XNAS", symbol)
            .with_payload(Payload::default().with_trade(trade))
    }

    /// Events A, B, C appended; `sealed` of them batched as batch 0.
    async fn fixture(sealed: usize) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_732_453_325_000_000_000));
        let ledger = Arc::new(HashChainLedger::new(clock.clone(), Duration::from_secs(1)));
        let signer = Ed25519Signer::from_seed([5u8; 32]);
        let mut events = Vec::new();
        for price in ["150.25", "150.30", "150.10"] {
            clock.advance(1_000);
            events.push(ledger.append(execution("AAPL", price), &signer, None).await.unwrap());
        }
        if sealed > 0 {
            let (first, slice) = ledger.unbatched(sealed).unwrap();
            ledger
                .record_batch(build_batch(0, first, slice.iter().map(|e| e.as_ref())).unwrap())
                .unwrap();
        }

        let client = Arc::new(SimulatedAnchorClient::new("testnet"));
        let coordinator = AnchorCoordinator::new(Arc::clone(&ledger), client.clone(), &anchor_config());
        let generator = CertificateGenerator::new(
            Arc::clone(&ledger),
            CertificateSystem {
                vcp_version: "1.1".to_string(),
                tier: ComplianceTier::Platinum,
            },
        );
        Fixture {
            ledger,
            client,
            coordinator,
            generator,
            events,
        }
    }

    async fn anchor_batch(fx: &Fixture, blocks: u64) {
        let record = fx.coordinator.submit(0).await.unwrap();
        fx.client.mine_blocks(blocks);
        fx.coordinator.poll_confirmation(&record.tx_hash).await.unwrap();
    }

    fn corrupt_hex(s: &str) -> String {
        let mut bytes = s.as_bytes().to_vec();
        bytes[0] = if bytes[0] == b'a' { b'b' } else { b'a' };
        String::from_utf8(bytes).unwrap()
    }

    // ── Issuance ──────────────────────────────────────────────────────────────

    /// A certificate is refused until the batch is anchored.
    #[tokio::test]
    async fn pending_batch_is_proof_unavailable_until_anchored() {
        let fx = fixture(3).await;
        let b = fx.events[1].id();

        let err = fx.generator.issue(&b).unwrap_err();
        assert!(matches!(err, VcpError::ProofUnavailable { .. }));
        assert_eq!(err.status_code(), 409);

        anchor_batch(&fx, 1).await;
        let cert = fx.generator.issue(&b).unwrap();
        assert_eq!(cert.anchor_status, AnchorStatus::Anchored);
        assert_eq!(cert.event_id, b);
        assert!(verify_certificate(&cert).passed());
    }

    /// An event outside any batch has no certificate.
    #[tokio::test]
    async fn unbatched_event_is_proof_unavailable() {
        let fx = fixture(2).await;
        anchor_batch(&fx, 2).await;

        let c = fx.events[2].id();
        assert!(matches!(
            fx.generator.issue(&c),
            Err(VcpError::ProofUnavailable { .. })
        ));
        assert!(fx.generator.issue(&fx.events[0].id()).is_ok());
    }

    /// An id the ledger never issued is `NotFound`.
    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let fx = fixture(0).await;
        let other = EventId::parse("01934e3a-7b2c-7f93-8f2a-1234567890ab").unwrap();
        assert!(matches!(
            fx.generator.issue(&other),
            Err(VcpError::NotFound { .. })
        ));
    }

    /// A verified batch yields a certificate that checks out.
    #[tokio::test]
    async fn certificate_reflects_verified_batch() {
        let fx = fixture(3).await;
        anchor_batch(&fx, 2).await;

        let cert = fx.generator.issue(&fx.events[0].id()).unwrap();
        assert_eq!(cert.anchor_status, AnchorStatus::Verified);
        assert_eq!(cert.anchor_info.status, AnchorRecordStatus::Confirmed);
        assert_eq!(cert.merkle_proof.tree_size, 3);
        assert_eq!(cert.system.vcp_version, "1.1");
        assert_eq!(
            cert.merkle_proof.root_hash,
            fx.ledger.batch_state(0).unwrap().batch.root_hex()
        );
    }

    // ── Offline verification ──────────────────────────────────────────────────

    /// Flipping one audit-path hash fails inclusion only.
    #[tokio::test]
    async fn corrupted_sibling_fails_inclusion() {
        let fx = fixture(3).await;
        anchor_batch(&fx, 1).await;

        let mut cert = fx.generator.issue(&fx.events[1].id()).unwrap();
        assert!(verify_certificate(&cert).passed());

        cert.merkle_proof.audit_path[0] = corrupt_hex(&cert.merkle_proof.audit_path[0]);
        let check = verify_certificate(&cert);
        assert!(!check.inclusion_valid);
        assert!(check.event_hash_valid);
        assert!(check.signature_valid);
        assert!(!check.passed());
    }

    /// Editing the event breaks its hash and its inclusion.
    #[tokio::test]
    async fn edited_event_fails_hash_and_inclusion() {
        let fx = fixture(3).await;
        anchor_batch(&fx, 1).await;

        let mut cert = fx.generator.issue(&fx.events[2].id()).unwrap();
        cert.event.payload.trade_data.as_mut().unwrap().execution_price =
            Some(DecimalString::new("999.99"));
        let check = verify_certificate(&cert);
        assert!(!check.event_hash_valid);
        assert!(!check.inclusion_valid);
    }

    /// An anchor naming another root fails the root match.
    #[tokio::test]
    async fn anchor_for_another_root_is_rejected() {
        let fx = fixture(3).await;
        anchor_batch(&fx, 1).await;

        let mut cert = fx.generator.issue(&fx.events[0].id()).unwrap();
        cert.anchor_info.root_hash = corrupt_hex(&cert.anchor_info.root_hash);
        let check = verify_certificate(&cert);
        assert!(!check.anchor_matches_root);
        assert!(check.inclusion_valid);
    }

    /// A certificate still verifies after a JSON round trip.
    #[tokio::test]
    async fn certificate_survives_json_transport() {
        let fx = fixture(3).await;
        anchor_batch(&fx, 1).await;

        let cert = fx.generator.issue(&fx.events[1].id()).unwrap();
        let json = serde_json::to_string_pretty(&cert).unwrap();
        let parsed: Certificate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cert);
        assert!(verify_certificate(&parsed).passed());
    }

    // ── Proof view ────────────────────────────────────────────────────────────

    /// The proof view exists only once the batch is anchored.
    #[tokio::test]
    async fn proof_view_requires_an_anchor() {
        let fx = fixture(3).await;
        let id = fx.events[0].id();
        assert!(matches!(
            fx.generator.proof(&id),
            Err(VcpError::NotFound { .. })
        ));

        anchor_batch(&fx, 1).await;
        let view = fx.generator.proof(&id).unwrap();
        assert_eq!(view.event_hash, fx.events[0].security.event_hash);
        assert_eq!(view.merkle_proof.leaf_index, 0);
        assert!(view.verification_hint.contains(&view.anchor_info.tx_hash));
        assert_eq!(view.anchor_info.network, "testnet");
    }
}
