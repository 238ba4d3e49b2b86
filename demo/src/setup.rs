//! Node construction shared by the scenarios.

use std::path::Path;
use std::sync::Arc;

use vcp_anchor::SimulatedAnchorClient;
use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::AnchorStatus,
    system::{CertifiedEntity, ComplianceTier, EntityStatus, EntityType},
};
use vcp_core::{clock::SystemClock, config::NodeConfig};
use vcp_node::VcpNode;

/// Upper bound on background passes while waiting for anchors to settle.
const MAX_SETTLE_PASSES: usize = 64;

/// Demo defaults: a short confirmation depth and fast backoff so the
/// scenarios finish in well under a second.
fn demo_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.batching.max_events = 8;
    config.anchor.network = "sim-chain".to_string();
    config.anchor.confirmations_required = 3;
    config.anchor.backoff_initial_ms = 20;
    config.anchor.backoff_max_ms = 100;
    config.entities = vec![CertifiedEntity {
        name: "Alpha Quant Exchange".to_string(),
        entity_type: EntityType::Exchange,
        tier: ComplianceTier::Platinum,
        status: EntityStatus::Compliant,
        verification_url: "https://explorer.example/entities/alpha-quant".to_string(),
        audit_report: "2025-Q3".to_string(),
    }];
    config
}

pub fn load_config(path: Option<&Path>) -> VcpResult<NodeConfig> {
    match path {
        Some(path) => NodeConfig::from_file(path),
        None => Ok(demo_config()),
    }
}

pub struct DemoNode {
    pub node: Arc<VcpNode>,
    pub client: Arc<SimulatedAnchorClient>,
}

/// A fresh node whose anchor chain mines one block per status query.
pub fn start(config: &NodeConfig) -> VcpResult<DemoNode> {
    let client =
        Arc::new(SimulatedAnchorClient::new(config.anchor.network.clone()).with_auto_mine(1));
    let node = VcpNode::from_config(config.clone(), client.clone(), Arc::new(SystemClock))?;
    Ok(DemoNode {
        node: Arc::new(node),
        client,
    })
}

/// Seal everything and run passes until every batch is `VERIFIED`.
/// Returns the number of passes it took.
pub async fn settle(node: &VcpNode) -> VcpResult<usize> {
    node.flush()?;
    for pass in 1..=MAX_SETTLE_PASSES {
        node.run_pass().await?;
        let verified = node.ledger().read(|view| {
            view.batches()
                .iter()
                .all(|b| b.status == AnchorStatus::Verified)
        })?;
        if verified {
            return Ok(pass);
        }
    }
    Err(VcpError::AnchoringUnavailable {
        reason: format!("batches not verified after {} passes", MAX_SETTLE_PASSES),
    })
}
