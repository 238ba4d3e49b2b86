//! # vcp-node
//!
//! A single VCP ledger node.
//!
//! ## Overview
//!
//! [`VcpNode`] wires the hash-chain ledger, Merkle batcher, anchor
//! coordinator, search engine and certificate generator around one signing
//! key and one anchor client.  [`spawn_worker`] runs the periodic
//! seal-then-anchor pass in the background, and [`Api`] exposes the
//! read operations in the shape an HTTP front end maps to routes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = NodeConfig::from_file(Path::new("vcp-node.toml"))?;
//! let node = Arc::new(VcpNode::from_config(config, anchor_client, Arc::new(SystemClock))?);
//! let worker = spawn_worker(Arc::clone(&node));
//!
//! node.append(draft, None).await?;
//! let api = Api::new(Arc::clone(&node));
//! let status = api.system_status()?;
//!
//! worker.shutdown().await?;
//! ```

pub mod api;
pub mod node;
pub mod worker;

pub use api::{parse_event_id, Api, ApiFailure, ApiResult};
pub use node::{PassReport, VcpNode};
pub use worker::{spawn_worker, WorkerHandle};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use vcp_anchor::SimulatedAnchorClient;
    use vcp_contracts::{
        error::VcpError,
        event::{AnchorStatus, EventDraft, EventType},
        payload::{Payload, TradeData},
        query::SearchParams,
        system::{ComplianceTier, EntityStatus},
    };
    use vcp_core::{clock::ManualClock, config::NodeConfig};

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const T0: u64 = 1_732_453_325_000_000_000;

    fn config_toml() -> String {
        format!(
            r#"
[ledger]
signing_seed_hex = "{seed}"

[batching]
max_events = 3
max_age_ms = 1000
tick_ms = 10

[anchor]
network = "testnet"
confirmations_required = 2
max_attempts = 2
backoff_initial_ms = 0
backoff_max_ms = 0

[[entities]]
name = "Alpha Quant Exchange"
type = "EXCHANGE"
tier = "PLATINUM"
status = "COMPLIANT"
verification_url = "https://explorer.example/entities/alpha"
audit_report = "2025-Q3"

[[entities]]
name = "Beta Prop"
type = "PROP_FIRM"
tier = "GOLD"
status = "COMPLIANT"
verification_url = "https://explorer.example/entities/beta"
audit_report = "2025-Q2"

[[entities]]
name = "Gamma Broker"
type = "BROKER"
tier = "GOLD"
status = "SUSPENDED"
verification_url = "https://explorer.example/entities/gamma"
audit_report = "2024-Q4"
"#,
            seed = "07".repeat(32)
        )
    }

    struct Fixture {
        node: Arc<VcpNode>,
        clock: Arc<ManualClock>,
        client: Arc<SimulatedAnchorClient>,
    }

    fn fixture_with(client: SimulatedAnchorClient) -> Fixture {
        let config = NodeConfig::from_toml_str(&config_toml()).unwrap();
        let clock = Arc::new(ManualClock::new(T0));
        let client = Arc::new(client);
        let node = VcpNode::from_config(config, client.clone(), clock.clone()).unwrap();
        Fixture {
            node: Arc::new(node),
            clock,
            client,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(SimulatedAnchorClient::new("testnet").with_auto_mine(1))
    }

    fn order(symbol: &str) -> EventDraft {
        EventDraft::new(EventType::Ord, "XNAS", symbol)
            .with_payload(Payload::default().with_trade(TradeData::new(symbol)))
    }

    async fn append_n(fx: &Fixture, n: usize) -> Vec<Arc<vcp_contracts::event::Event>> {
        let mut events = Vec::new();
        for _ in 0..n {
            fx.clock.advance(1_000_000);
            events.push(fx.node.append(order("AAPL"), None).await.unwrap());
        }
        events
    }

    // ── Batching ──────────────────────────────────────────────────────────────

    /// Batches seal when full, then when the oldest event is old enough.
    #[tokio::test]
    async fn batches_seal_on_count_then_on_age() {
        let fx = fixture();
        append_n(&fx, 4).await;

        let sealed = fx.node.seal_due_batches().unwrap();
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].len(), 3);

        // One event left, younger than max_age.
        assert!(fx.node.seal_due_batches().unwrap().is_empty());

        fx.clock.advance(2_000_000_000);
        let aged = fx.node.seal_due_batches().unwrap();
        assert_eq!(aged.len(), 1);
        assert_eq!(aged[0].batch_id, 1);
        assert_eq!(aged[0].first_sequence, 3);
    }

    /// `flush` seals whatever is left.
    #[tokio::test]
    async fn flush_seals_a_partial_tail() {
        let fx = fixture();
        append_n(&fx, 2).await;
        assert!(fx.node.seal_due_batches().unwrap().is_empty());

        let sealed = fx.node.flush().unwrap();
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].len(), 2);
        assert!(fx.node.flush().unwrap().is_empty());
    }

    // ── End to end ────────────────────────────────────────────────────────────

    /// Background passes carry events from `PENDING` to `VERIFIED`.
    #[tokio::test]
    async fn passes_take_events_from_pending_to_verified() {
        let fx = fixture();
        let events = append_n(&fx, 3).await;
        let id = events[1].id();

        let detail = fx.node.get_event(&id).unwrap();
        assert_eq!(detail.header.anchor_status, AnchorStatus::Pending);
        assert!(detail.security.merkle_root.is_none());

        let first = fx.node.run_pass().await.unwrap();
        assert_eq!(first.sealed, 1);
        assert_eq!(first.anchor.submitted, 1);
        let detail = fx.node.get_event(&id).unwrap();
        assert!(detail.security.merkle_root.is_some());
        assert!(detail.security.anchor.is_none());

        fx.node.run_pass().await.unwrap();
        let detail = fx.node.get_event(&id).unwrap();
        assert_eq!(detail.header.anchor_status, AnchorStatus::Anchored);
        assert_eq!(detail.security.anchor.as_ref().unwrap().network, "testnet");

        fx.node.run_pass().await.unwrap();
        assert_eq!(
            fx.node.get_event(&id).unwrap().header.anchor_status,
            AnchorStatus::Verified
        );
        let idle = fx.node.run_pass().await.unwrap();
        assert!(idle.is_idle());

        let cert = fx.node.certificate(&id).unwrap();
        assert!(fx.node.verify_certificate(&cert).passed());
        assert_eq!(cert.system.tier, ComplianceTier::Platinum);
        assert_eq!(cert.event.security.signer_key, fx.node.signer_key());
    }

    /// Status counts follow sealing and anchoring.
    #[tokio::test]
    async fn system_status_tracks_progress() {
        let fx = fixture();
        append_n(&fx, 4).await;

        let before = fx.node.system_status().unwrap();
        assert_eq!(before.total_events, 4);
        assert_eq!(before.total_batches, 0);
        assert_eq!(before.pending_events, 4);
        assert!(before.last_anchor.is_none());
        assert_eq!(before.active_nodes, 1);
        assert!(before.health.chain_verified);
        assert!(!before.health.worker_running);

        fx.node.run_pass().await.unwrap();
        fx.node.run_pass().await.unwrap();
        let after = fx.node.system_status().unwrap();
        assert_eq!(after.total_batches, 1);
        assert_eq!(after.pending_events, 1);
        assert_eq!(after.last_anchor.unwrap().batch_id, 0);

        let json = serde_json::to_value(fx.node.system_status().unwrap()).unwrap();
        assert_eq!(json["tier"], "PLATINUM");
        assert_eq!(json["vcp_version"], "1.1");
    }

    /// A status read verifies only events published since the last one.
    #[tokio::test]
    async fn status_reads_do_not_reverify_checked_events() {
        let fx = fixture();
        append_n(&fx, 4).await;

        assert!(fx.node.system_status().unwrap().health.chain_verified);
        assert_eq!(fx.node.ledger().verified_len().unwrap(), 4);
        assert!(fx.node.system_status().unwrap().health.chain_verified);
        assert_eq!(fx.node.ledger().verify_new().unwrap(), 0);

        append_n(&fx, 2).await;
        fx.node.run_pass().await.unwrap();
        assert_eq!(fx.node.ledger().verified_len().unwrap(), 6);
        assert_eq!(fx.node.ledger().verify_new().unwrap(), 0);
    }

    /// An anchoring outage leaves batches pending until it clears.
    #[tokio::test]
    async fn anchoring_outage_keeps_batches_pending() {
        let fx = fixture();
        append_n(&fx, 3).await;
        fx.client.fail_next_submits(10);

        let report = fx.node.run_pass().await.unwrap();
        assert_eq!(report.sealed, 1);
        assert_eq!(report.anchor.failures, 1);
        assert_eq!(fx.node.system_status().unwrap().pending_events, 3);

        fx.client.fail_next_submits(0);
        let retried = fx.node.run_pass().await.unwrap();
        assert_eq!(retried.anchor.submitted, 1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    /// A configured seed fixes the signing key.
    #[tokio::test]
    async fn configured_seed_fixes_the_signing_key() {
        let a = fixture();
        let b = fixture();
        assert_eq!(a.node.signer_key(), b.node.signer_key());
        assert_eq!(a.node.signer_key().len(), 64);

        let mut config = NodeConfig::default();
        config.ledger.signing_seed_hex = Some("zz".to_string());
        let result = VcpNode::from_config(
            config,
            Arc::new(SimulatedAnchorClient::new("testnet")),
            Arc::new(ManualClock::new(T0)),
        );
        assert!(matches!(result, Err(VcpError::ConfigError { .. })));
    }

    /// The entity registry filters by status and tier.
    #[test]
    fn entities_filter_by_status_and_tier() {
        let fx = fixture();
        assert_eq!(fx.node.certified_entities(None, None).entities.len(), 3);

        let gold = fx.node.certified_entities(None, Some(ComplianceTier::Gold));
        assert_eq!(gold.entities.len(), 2);

        let gold_compliant = fx
            .node
            .certified_entities(Some(EntityStatus::Compliant), Some(ComplianceTier::Gold));
        assert_eq!(gold_compliant.entities.len(), 1);
        assert_eq!(gold_compliant.entities[0].name, "Beta Prop");

        assert!(fx
            .node
            .certified_entities(Some(EntityStatus::Revoked), None)
            .entities
            .is_empty());
    }

    // ── API mapping ───────────────────────────────────────────────────────────

    /// Route errors map to their status and code.
    #[tokio::test]
    async fn api_maps_errors_to_wire_codes() {
        let fx = fixture();
        let events = append_n(&fx, 1).await;
        let api = Api::new(Arc::clone(&fx.node));
        let id = events[0].id().to_string();

        let bad_id = api.event("not-a-uuid").unwrap_err();
        assert_eq!(bad_id.status, 400);
        assert_eq!(bad_id.body.error, "invalid_event_id");

        // A v4 UUID is well formed but not a valid event id.
        let v4 = api.event("9b2f3c1e-4d5a-4b6c-8d7e-0f1a2b3c4d5e").unwrap_err();
        assert_eq!(v4.body.error, "invalid_event_id");

        let missing = api.event("01934e3a-7b2c-7f93-8f2a-1234567890ab").unwrap_err();
        assert_eq!(missing.status, 404);
        assert_eq!(missing.body.error, "not_found");

        let proof = api.event_proof(&id).unwrap_err();
        assert_eq!(proof.status, 404);
        let cert = api.event_certificate(&id).unwrap_err();
        assert_eq!(cert.status, 409);
        assert_eq!(cert.body.error, "conflict");

        let paging = api
            .search_events(&SearchParams {
                offset: Some(-1),
                ..SearchParams::default()
            })
            .unwrap_err();
        assert_eq!(paging.status, 400);
        assert_eq!(paging.body.error, "invalid_parameter");

        assert_eq!(api.recent_events(Some(-1)).unwrap_err().status, 400);
        assert_eq!(api.recent_events(Some(0)).unwrap().events.len(), 1);
        assert_eq!(api.event(&id).unwrap().header.header.event_id, events[0].id());
    }

    /// Anchored events get proofs through the API.
    #[tokio::test]
    async fn api_serves_anchored_proofs() {
        let fx = fixture();
        let events = append_n(&fx, 3).await;
        fx.node.run_pass().await.unwrap();
        fx.node.run_pass().await.unwrap();

        let api = Api::new(Arc::clone(&fx.node));
        let view = api.event_proof(&events[2].id().to_string()).unwrap();
        assert_eq!(view.merkle_proof.leaf_index, 2);
        assert_eq!(view.merkle_proof.tree_size, 3);
        assert_eq!(api.recent_events(None).unwrap().events.len(), 3);
        assert_eq!(api.system_status().unwrap().total_batches, 1);
    }

    /// Entity filters parse in any case.
    #[test]
    fn api_entity_filters_parse_case_insensitively() {
        let fx = fixture();
        let api = Api::new(Arc::clone(&fx.node));

        let suspended = api.certified_entities(Some("suspended"), None).unwrap();
        assert_eq!(suspended.entities.len(), 1);
        let blank = api.certified_entities(Some(" "), Some("")).unwrap();
        assert_eq!(blank.entities.len(), 3);

        let bad = api.certified_entities(None, Some("BRONZE")).unwrap_err();
        assert_eq!(bad.status, 400);
        assert_eq!(bad.body.error, "invalid_parameter");
    }

    // ── Worker ────────────────────────────────────────────────────────────────

    /// The worker anchors on its own and stops on shutdown.
    #[tokio::test]
    async fn worker_anchors_in_the_background_and_stops() {
        let fx = fixture();
        let events = append_n(&fx, 3).await;
        let worker = spawn_worker(Arc::clone(&fx.node));
        assert!(fx.node.health().worker_running);

        let id = events[0].id();
        let mut verified = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if fx.node.get_event(&id).unwrap().header.anchor_status == AnchorStatus::Verified {
                verified = true;
                break;
            }
        }
        assert!(verified, "worker never verified the batch");

        worker.shutdown().await.unwrap();
        assert!(!fx.node.health().worker_running);
        assert!(fx.node.health().chain_verified);
    }
}
