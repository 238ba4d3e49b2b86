//! Anchor records: the link between a Merkle root and an external
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a single anchoring transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnchorRecordStatus {
    /// Submitted, not yet observed with enough confirmations.
    Pending,
    /// Observed in the external ledger.
    Confirmed,
    /// Dropped by the external ledger (for example by a reorg).
    Failed,
}

/// A Merkle root committed (or being committed) to an external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub batch_id: u64,
    /// Hex root hash this record commits.
    pub root_hash: String,
    pub network: String,
    pub tx_hash: String,
    pub status: AnchorRecordStatus,
    /// Block that included the transaction; absent until observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub confirmations: u64,
    /// When the transaction was first observed in a block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    /// Submission attempts it took to obtain `tx_hash`.
    pub attempts: u32,
}

impl AnchorRecord {
    /// The compact wire form, available once the transaction is in a block.
    pub fn info(&self) -> Option<AnchorInfo> {
        match (self.block_number, self.anchored_at) {
            (Some(block_number), Some(anchored_at)) => Some(AnchorInfo {
                network: self.network.clone(),
                tx_hash: self.tx_hash.clone(),
                block_number,
                anchored_at,
            }),
            _ => None,
        }
    }
}

/// Anchor details embedded in event views and proofs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorInfo {
    pub network: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub anchored_at: DateTime<Utc>,
}

/// What the external ledger reports about a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// The ledger has no record of the transaction (yet).
    Unknown,
    /// Accepted into the mempool, not in a block.
    Pending,
    /// Included in a block.
    Included {
        block_number: u64,
        confirmations: u64,
        observed_at: DateTime<Utc>,
    },
    /// Removed after having been seen, e.g. by a chain reorganisation.
    Dropped { reason: String },
}
