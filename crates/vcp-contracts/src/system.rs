//! System status and certified-entity registry types.

use serde::{Deserialize, Serialize};

use crate::{anchor::AnchorRecord, event::TimestampPrecision};

/// Compliance tier a node or entity is certified at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComplianceTier {
    #[default]
    Platinum,
    Gold,
    Silver,
}

/// Liveness and integrity of the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHealth {
    /// Whether the chain verified through its newest event.
    pub chain_verified: bool,
    /// Whether the background batch/anchor worker is running.
    pub worker_running: bool,
}

impl NodeHealth {
    pub fn healthy(&self) -> bool {
        self.chain_verified && self.worker_running
    }
}

/// Body of `GET /system/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub total_events: u64,
    pub total_batches: u64,
    /// Events not yet covered by an anchored batch.
    pub pending_events: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_anchor: Option<AnchorRecord>,
    pub active_nodes: u32,
    pub health: NodeHealth,
    pub precision: TimestampPrecision,
    pub tier: ComplianceTier,
    pub vcp_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Exchange,
    PropFirm,
    Broker,
    Fund,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityStatus {
    Compliant,
    Pending,
    Revoked,
    Suspended,
}

/// An organisation listed in the compliance registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub tier: ComplianceTier,
    pub status: EntityStatus,
    pub verification_url: String,
    pub audit_report: String,
}

/// Body of `GET /certified/entities`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedEntities {
    pub entities: Vec<CertifiedEntity>,
}
