//! Scenario 2: Tamper Detection
//!
//! A certificate is issued for one execution in a batch of three, then
//! altered three ways.  Each alteration is caught by a different check:
//!
//! Sub-case A — fill price rewritten      → event hash and inclusion fail
//! Sub-case B — one audit-path hash flipped → inclusion fails
//! Sub-case C — anchor claims another root  → anchor/root match fails

use vcp_contracts::{
    certificate::{Certificate, CertificateCheck},
    error::VcpResult,
    event::{EventDraft, EventType},
    payload::{DecimalString, Payload, TradeData},
};
use vcp_core::config::NodeConfig;

use crate::scenarios::lifecycle::pass_fail;
use crate::setup;

fn fill(price: &str) -> EventDraft {
    let trade = TradeData {
        executed_qty: Some(DecimalString::new("100")),
        execution_price: Some(DecimalString::new(price)),
        ..TradeData::new("MSFT")
    };
    EventDraft::new(EventType::Exe, "XNAS", "MSFT")
        .with_payload(Payload::default().with_trade(trade))
}

/// Replace the first hex digit with a different one.
fn flip_first_digit(hex: &mut String) {
    let replacement = if hex.starts_with('0') { "1" } else { "0" };
    hex.replace_range(..1, replacement);
}

fn report(label: &str, check: &CertificateCheck) {
    println!("  {}", label);
    println!(
        "    event hash {}  signature {}  inclusion {}  anchor root {}",
        pass_fail(check.event_hash_valid),
        pass_fail(check.signature_valid),
        pass_fail(check.inclusion_valid),
        pass_fail(check.anchor_matches_root)
    );
    println!(
        "    RESULT: {}",
        if check.passed() { "ACCEPTED" } else { "REJECTED" }
    );
}

pub async fn run_scenario(config: &NodeConfig) -> VcpResult<()> {
    println!("=== Scenario 2: Tamper Detection ===");
    println!();

    let demo = setup::start(config)?;
    let node = &demo.node;

    let mut fills = Vec::new();
    for price in ["415.10", "415.12", "415.09"] {
        fills.push(node.append(fill(price), None).await?);
    }
    setup::settle(node).await?;

    let original: Certificate = node.certificate(&fills[1].id())?;
    report("Original certificate (middle fill of three):", &node.verify_certificate(&original));
    println!();

    let mut edited = original.clone();
    if let Some(trade) = edited.event.payload.trade_data.as_mut() {
        trade.execution_price = Some(DecimalString::new("399.00"));
    }
    report("Sub-case A: execution_price rewritten to 399.00", &node.verify_certificate(&edited));
    println!();

    let mut sibling = original.clone();
    if let Some(first) = sibling.merkle_proof.audit_path.first_mut() {
        flip_first_digit(first);
    }
    report("Sub-case B: first audit-path sibling corrupted", &node.verify_certificate(&sibling));
    println!();

    let mut anchor = original;
    flip_first_digit(&mut anchor.anchor_info.root_hash);
    report("Sub-case C: anchor record points at another root", &node.verify_certificate(&anchor));
    println!();

    Ok(())
}
