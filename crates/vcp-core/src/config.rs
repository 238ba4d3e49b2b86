//! Node configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty document is a valid
//! configuration.  Values that would make the node wedge (a zero batch
//! size, zero confirmations, zero anchor attempts) are rejected at load
//! time rather than discovered at runtime.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::TimestampPrecision,
    system::{CertifiedEntity, ComplianceTier},
};

/// Top-level node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub batching: BatchingConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub system: SystemConfig,
    /// Static certified-entity registry served by the node.
    #[serde(default)]
    pub entities: Vec<CertifiedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Upper bound on a single signer call.
    pub sign_timeout_ms: u64,
    /// Hex seed of the node's Ed25519 key.  A random key is generated at
    /// startup when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_seed_hex: Option<String>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            sign_timeout_ms: 2_000,
            signing_seed_hex: None,
        }
    }
}

impl LedgerConfig {
    pub fn sign_timeout(&self) -> Duration {
        Duration::from_millis(self.sign_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
    /// Seal a batch once this many events are unbatched.
    pub max_events: usize,
    /// Seal a batch once the oldest unbatched event is this old.
    pub max_age_ms: u64,
    /// How often the background worker checks for due work.
    pub tick_ms: u64,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            max_events: 256,
            max_age_ms: 5_000,
            tick_ms: 250,
        }
    }
}

impl BatchingConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub network: String,
    /// Confirmations after which a batch is `VERIFIED`.
    pub confirmations_required: u64,
    pub submit_timeout_ms: u64,
    pub poll_timeout_ms: u64,
    /// Submission attempts before giving up with `AnchoringUnavailable`.
    pub max_attempts: u32,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            network: "ethereum-mainnet".to_string(),
            confirmations_required: 12,
            submit_timeout_ms: 10_000,
            poll_timeout_ms: 5_000,
            max_attempts: 5,
            backoff_initial_ms: 200,
            backoff_max_ms: 10_000,
        }
    }
}

impl AnchorConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub vcp_version: String,
    pub tier: ComplianceTier,
    pub precision: TimestampPrecision,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            vcp_version: "1.1".to_string(),
            tier: ComplianceTier::Platinum,
            precision: TimestampPrecision::Nanosecond,
        }
    }
}

impl NodeConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `VcpError::ConfigError` if the TOML is malformed, does not
    /// match the schema, or holds a value the node cannot run with.
    pub fn from_toml_str(s: &str) -> VcpResult<Self> {
        let config: NodeConfig = toml::from_str(s).map_err(|e| VcpError::ConfigError {
            reason: format!("failed to parse node TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            network = %config.anchor.network,
            max_events = config.batching.max_events,
            entities = config.entities.len(),
            "node configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as node configuration.
    pub fn from_file(path: &Path) -> VcpResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| VcpError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the node cannot operate with.
    pub fn validate(&self) -> VcpResult<()> {
        let reject = |reason: &str| {
            Err(VcpError::ConfigError {
                reason: reason.to_string(),
            })
        };
        if self.batching.max_events == 0 {
            return reject("batching.max_events must be at least 1");
        }
        if self.batching.tick_ms == 0 {
            return reject("batching.tick_ms must be at least 1");
        }
        if self.anchor.confirmations_required == 0 {
            return reject("anchor.confirmations_required must be at least 1");
        }
        if self.anchor.max_attempts == 0 {
            return reject("anchor.max_attempts must be at least 1");
        }
        if self.anchor.network.trim().is_empty() {
            return reject("anchor.network must not be empty");
        }
        if self.anchor.backoff_max_ms < self.anchor.backoff_initial_ms {
            return reject("anchor.backoff_max_ms must not be below backoff_initial_ms");
        }
        Ok(())
    }
}
