//! Scenario 1: Order Lifecycle
//!
//! One trace from signal to fill:
//!
//!   SIG (model decision) → ORD (with risk snapshot) → ACK → EXE
//!
//! plus an unrelated heartbeat.  The events are sealed, anchored and then
//! looked up the way an auditor would: by trace, by algorithm, by proof
//! and finally through a certificate checked without the ledger.

use std::collections::BTreeMap;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::{EventDraft, EventType, TraceId},
    payload::{
        AlgoType, DecimalString, DecisionFactors, DecisionFeature, ExplainabilityMethod,
        GovernanceModule, Payload, RiskModule, Side, TradeData,
    },
    query::SearchParams,
};
use vcp_core::config::NodeConfig;

use crate::setup;

const VENUE: &str = "XNAS";
const ALGO_ID: &str = "momentum-v2";

/// The order the scenario walks through.
pub struct Order {
    pub symbol: String,
    pub side: Side,
    pub qty: String,
    pub price: String,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            qty: "100".to_string(),
            price: "150.25".to_string(),
        }
    }
}

fn governance() -> GovernanceModule {
    GovernanceModule {
        algo_id: Some(ALGO_ID.to_string()),
        algo_version: Some("2.3.1".to_string()),
        algo_type: Some(AlgoType::AiModel),
        decision_factors: Some(DecisionFactors {
            features: vec![
                DecisionFeature {
                    name: "rsi_14".to_string(),
                    value: DecimalString::new("28.4"),
                    weight: Some(DecimalString::new("0.35")),
                    contribution: None,
                },
                DecisionFeature {
                    name: "vwap_gap_bps".to_string(),
                    value: DecimalString::new("-12.5"),
                    weight: Some(DecimalString::new("0.20")),
                    contribution: None,
                },
            ],
            confidence_score: Some(DecimalString::new("0.87")),
            explainability_method: Some(ExplainabilityMethod::Shap),
            rule_trace: Vec::new(),
        }),
        ..GovernanceModule::default()
    }
}

fn risk_snapshot() -> RiskModule {
    let snapshot = BTreeMap::from([
        ("daily_loss_limit".to_string(), "250000".to_string()),
        ("max_position_size".to_string(), "10000".to_string()),
    ]);
    RiskModule {
        snapshot,
        triggered_controls: Vec::new(),
    }
}

fn drafts(order: &Order, trace: TraceId) -> Vec<EventDraft> {
    let symbol = order.symbol.as_str();
    let base = TradeData {
        side: Some(order.side),
        ..TradeData::new(symbol)
    };
    let submitted = TradeData {
        order_type: Some("LIMIT".to_string()),
        price: Some(DecimalString::new(order.price.as_str())),
        order_size: Some(DecimalString::new(order.qty.as_str())),
        ..base.clone()
    };
    let filled = TradeData {
        executed_qty: Some(DecimalString::new(order.qty.as_str())),
        execution_price: Some(DecimalString::new(order.price.as_str())),
        commission: Some(DecimalString::new("1.50")),
        ..base.clone()
    };

    vec![
        EventDraft::new(EventType::Sig, VENUE, symbol)
            .with_trace(trace)
            .with_payload(Payload::default().with_trade(base).with_governance(governance())),
        EventDraft::new(EventType::Ord, VENUE, symbol)
            .with_trace(trace)
            .with_payload(
                Payload::default()
                    .with_trade(submitted)
                    .with_risk(risk_snapshot())
                    .with_governance(GovernanceModule {
                        algo_id: Some(ALGO_ID.to_string()),
                        ..GovernanceModule::default()
                    }),
            ),
        EventDraft::new(EventType::Ack, VENUE, symbol).with_trace(trace),
        EventDraft::new(EventType::Exe, VENUE, symbol)
            .with_trace(trace)
            .with_payload(Payload::default().with_trade(filled)),
        EventDraft::new(EventType::Hbt, VENUE, "SYSTEM"),
    ]
}

pub async fn run_scenario(config: &NodeConfig, order: Order) -> VcpResult<()> {
    println!("=== Scenario 1: Order Lifecycle ===");
    println!();

    let demo = setup::start(config)?;
    let node = &demo.node;
    let trace = TraceId::new();

    println!("  Appending events (trace {}):", trace);
    let mut appended = Vec::new();
    for draft in drafts(&order, trace) {
        let event = node.append(draft, None).await?;
        println!(
            "    {:<4} {}  hash {}…",
            event.header.event_type.as_str(),
            event.id(),
            event.hash_prefix()
        );
        appended.push(event);
    }
    node.ledger().verify_integrity()?;
    println!("  Chain integrity:        PASS ({} events)", appended.len());

    let passes = setup::settle(node).await?;
    println!("  Anchoring:              VERIFIED after {} pass(es)", passes);
    println!();

    let by_trace = node.search(&SearchParams {
        trace_id: Some(trace.to_string()),
        ..SearchParams::default()
    })?;
    println!("  Search by trace:        {} event(s)", by_trace.total);
    let by_algo = node.search(&SearchParams {
        algo_id: Some(ALGO_ID.to_string()),
        ..SearchParams::default()
    })?;
    println!("  Search by algo_id:      {} event(s)", by_algo.total);

    // The fill is the event a counterparty would ask about.
    let fill = &appended[3];
    let proof = node.proof(&fill.id())?;
    println!("  Merkle proof for EXE:");
    println!("    root        {}", proof.merkle_proof.root_hash);
    println!(
        "    leaf        {} of {}",
        proof.merkle_proof.leaf_index, proof.merkle_proof.tree_size
    );
    println!("    audit path  {} sibling(s)", proof.merkle_proof.audit_path.len());
    println!(
        "    anchor      {} block {} on {}",
        proof.anchor_info.tx_hash, proof.anchor_info.block_number, proof.anchor_info.network
    );

    let certificate = node.certificate(&fill.id())?;
    let check = node.verify_certificate(&certificate);
    println!("  Certificate check:");
    println!("    event hash  {}", pass_fail(check.event_hash_valid));
    println!("    signature   {}", pass_fail(check.signature_valid));
    println!("    inclusion   {}", pass_fail(check.inclusion_valid));
    println!("    anchor root {}", pass_fail(check.anchor_matches_root));

    let status = node.system_status()?;
    let rendered = serde_json::to_string_pretty(&status)
        .map_err(|e| VcpError::internal(format!("status not serializable: {e}")))?;
    println!("  System status:");
    for line in rendered.lines() {
        println!("    {}", line);
    }

    println!("  RESULT: {}", if check.passed() { "CERTIFIED (expected)" } else { "NOT CERTIFIED" });
    println!();
    Ok(())
}

pub(crate) fn pass_fail(ok: bool) -> &'static str {
    if ok {
        "PASS"
    } else {
        "FAIL"
    }
}
