//! In-memory stand-in for an external anchoring ledger.
//!
//! `SimulatedAnchorClient` behaves like a small block chain: submitted
//! roots wait in a mempool until a block is mined, confirmations grow with
//! every block after inclusion, and any transaction can be dropped to
//! simulate a reorganisation.  Failures and latency can be injected so the
//! coordinator's retry and timeout paths can be exercised.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use vcp_contracts::{
    anchor::TxStatus,
    error::{VcpError, VcpResult},
};
use vcp_core::traits::AnchorClient;

#[derive(Debug, Clone)]
struct SimTx {
    root_hash: String,
    included: Option<(u64, DateTime<Utc>)>,
    dropped: Option<String>,
}

#[derive(Debug, Default)]
struct SimState {
    head: u64,
    txs: HashMap<String, SimTx>,
    submitted: Vec<String>,
    failing_submits: u32,
    submit_delay: Option<Duration>,
    status_delay: Option<Duration>,
    blocks_per_status: u64,
}

#[derive(Debug)]
pub struct SimulatedAnchorClient {
    network: String,
    state: Mutex<SimState>,
}

impl SimulatedAnchorClient {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            state: Mutex::new(SimState {
                head: 1_000_000,
                ..SimState::default()
            }),
        }
    }

    /// Mine `blocks` new blocks every time a status is queried, so a
    /// background poller sees confirmations accumulate on its own.
    pub fn with_auto_mine(self, blocks: u64) -> Self {
        self.with_state(|s| s.blocks_per_status = blocks);
        self
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        // A poisoned simulator is still usable; its state is plain data.
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    /// Make the next `n` submissions fail with `AnchoringUnavailable`.
    pub fn fail_next_submits(&self, n: u32) {
        self.with_state(|s| s.failing_submits = n);
    }

    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.submit_delay = delay);
    }

    pub fn set_status_delay(&self, delay: Option<Duration>) {
        self.with_state(|s| s.status_delay = delay);
    }

    /// Mine `n` blocks.  The first includes every transaction waiting in
    /// the mempool.
    pub fn mine_blocks(&self, n: u64) {
        self.with_state(|s| mine(s, n));
    }

    /// Drop `tx_hash` from the chain as a reorganisation would.
    pub fn reorg(&self, tx_hash: &str) {
        self.with_state(|s| {
            if let Some(tx) = s.txs.get_mut(tx_hash) {
                tx.included = None;
                tx.dropped = Some("chain reorganisation".to_string());
            }
        });
    }

    /// Roots accepted so far, in submission order, duplicates included.
    pub fn submitted_roots(&self) -> Vec<String> {
        self.with_state(|s| s.submitted.clone())
    }

    pub fn head(&self) -> u64 {
        self.with_state(|s| s.head)
    }
}

fn mine(state: &mut SimState, n: u64) {
    for _ in 0..n {
        state.head += 1;
        let head = state.head;
        let now = Utc::now();
        for tx in state.txs.values_mut() {
            if tx.included.is_none() && tx.dropped.is_none() {
                tx.included = Some((head, now));
            }
        }
    }
}

#[async_trait]
impl AnchorClient for SimulatedAnchorClient {
    fn network(&self) -> &str {
        &self.network
    }

    async fn submit(&self, root_hash: &str) -> VcpResult<String> {
        if let Some(delay) = self.with_state(|s| s.submit_delay) {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            if s.failing_submits > 0 {
                s.failing_submits -= 1;
                return Err(VcpError::AnchoringUnavailable {
                    reason: "simulated RPC endpoint unreachable".to_string(),
                });
            }
            let nonce = s.submitted.len() as u64;
            let digest = Sha256::new()
                .chain_update(root_hash.as_bytes())
                .chain_update(nonce.to_be_bytes())
                .finalize();
            let tx_hash = format!("0x{}", hex::encode(digest));
            s.submitted.push(root_hash.to_string());
            s.txs.insert(
                tx_hash.clone(),
                SimTx {
                    root_hash: root_hash.to_string(),
                    included: None,
                    dropped: None,
                },
            );
            debug!(root = %root_hash, tx_hash = %tx_hash, "simulated anchor accepted");
            Ok(tx_hash)
        })
    }

    async fn status(&self, tx_hash: &str) -> VcpResult<TxStatus> {
        if let Some(delay) = self.with_state(|s| s.status_delay) {
            tokio::time::sleep(delay).await;
        }
        Ok(self.with_state(|s| {
            let auto = s.blocks_per_status;
            if auto > 0 {
                mine(s, auto);
            }
            match s.txs.get(tx_hash) {
                None => TxStatus::Unknown,
                Some(SimTx {
                    dropped: Some(reason),
                    ..
                }) => TxStatus::Dropped {
                    reason: reason.clone(),
                },
                Some(SimTx {
                    included: Some((block, at)),
                    root_hash,
                    ..
                }) => {
                    debug!(tx_hash, root = %root_hash, block, "simulated anchor included");
                    TxStatus::Included {
                        block_number: *block,
                        confirmations: s.head - block + 1,
                        observed_at: *at,
                    }
                }
                Some(_) => TxStatus::Pending,
            }
        }))
    }
}
