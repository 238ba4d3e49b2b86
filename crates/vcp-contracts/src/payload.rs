//! Module-based event payload.
//!
//! A payload is a set of independently optional modules (trade data, risk
//! snapshot, governance/explainability) plus an explicit slot for opaque
//! extension bytes.  Keeping unknown data as named byte blobs instead of an
//! untyped JSON bag is what keeps the canonical serialization stable.
//!
//! Decimal quantities are carried as strings and validated, never
//! re-rendered: `"2350.500"` hashes as exactly those eight characters.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{VcpError, VcpResult};

/// Module names reserved by the payload itself.
const RESERVED_NAMES: [&str; 4] = ["trade_data", "vcp_risk", "vcp_gov", "extensions"];

// ── Primitive wrappers ────────────────────────────────────────────────────────

/// A decimal quantity kept in its original string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecimalString(pub String);

impl DecimalString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept only `-?digits(.digits)?` that fits a 96-bit decimal.
    ///
    /// The grammar check comes first so exponent forms, separators and
    /// leading `+` are refused instead of normalized.
    pub fn validate(&self, field: &str) -> VcpResult<()> {
        let s = self.0.as_str();
        let unsigned = s.strip_prefix('-').unwrap_or(s);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (unsigned, None),
        };
        let digits_ok = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !digits_ok(int_part) || !frac_part.map_or(true, digits_ok) {
            return Err(VcpError::InvalidPayload {
                reason: format!("{field} '{s}' is not a plain decimal string"),
            });
        }
        Decimal::from_str_exact(s).map_err(|e| VcpError::InvalidPayload {
            reason: format!("{field} '{s}' is out of decimal range: {e}"),
        })?;
        Ok(())
    }
}

impl From<&str> for DecimalString {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for DecimalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque extension bytes, hex-encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OpaqueBytes(pub Vec<u8>);

impl Serialize for OpaqueBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for OpaqueBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        hex::decode(&raw)
            .map(OpaqueBytes)
            .map_err(|e| serde::de::Error::custom(format!("extension bytes are not hex: {e}")))
    }
}

// ── Trade module ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Order and execution data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeData {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_size: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_qty: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_price: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl TradeData {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: None,
            order_type: None,
            price: None,
            order_size: None,
            executed_qty: None,
            execution_price: None,
            commission: None,
            slippage: None,
            reject_reason: None,
        }
    }

    fn validate(&self) -> VcpResult<()> {
        let quantities = [
            ("trade_data.price", &self.price),
            ("trade_data.order_size", &self.order_size),
            ("trade_data.executed_qty", &self.executed_qty),
            ("trade_data.execution_price", &self.execution_price),
            ("trade_data.commission", &self.commission),
            ("trade_data.slippage", &self.slippage),
        ];
        for (field, value) in quantities {
            if let Some(v) = value {
                v.validate(field)?;
            }
        }
        Ok(())
    }
}

// ── Risk module ───────────────────────────────────────────────────────────────

/// A risk control that fired while the event was processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredControl {
    pub control_name: String,
    pub trigger_value: String,
    pub action: String,
    /// Nanosecond timestamp string, as emitted by the risk engine.
    pub timestamp: String,
}

/// Risk limits in force when the event happened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskModule {
    /// Limit name → value.  A `BTreeMap` so key order is canonical.
    pub snapshot: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggered_controls: Vec<TriggeredControl>,
}

// ── Governance module ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlgoType {
    AiModel,
    RuleBased,
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExplainabilityMethod {
    Shap,
    Lime,
    Gradcam,
    RuleTrace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskClassification {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionFeature {
    pub name: String,
    pub value: DecimalString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<DecimalString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionFactors {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<DecisionFeature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<DecimalString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explainability_method: Option<ExplainabilityMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_trace: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GovernanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_classification: Option<RiskClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_approval_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testing_record_link: Option<String>,
}

/// Algorithm identity and explainability data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GovernanceModule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algo_type: Option<AlgoType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_factors: Option<DecisionFactors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance: Option<GovernanceRecord>,
}

impl GovernanceModule {
    fn validate(&self) -> VcpResult<()> {
        let Some(factors) = &self.decision_factors else {
            return Ok(());
        };
        if let Some(score) = &factors.confidence_score {
            score.validate("vcp_gov.decision_factors.confidence_score")?;
        }
        for feature in &factors.features {
            feature.value.validate("vcp_gov.decision_factors.features.value")?;
            if let Some(w) = &feature.weight {
                w.validate("vcp_gov.decision_factors.features.weight")?;
            }
            if let Some(c) = &feature.contribution {
                c.validate("vcp_gov.decision_factors.features.contribution")?;
            }
        }
        Ok(())
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// The event body.  Every module is optional and independent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_data: Option<TradeData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcp_risk: Option<RiskModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcp_gov: Option<GovernanceModule>,
    /// Named opaque blobs for data no known module describes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, OpaqueBytes>,
}

impl Payload {
    pub fn with_trade(mut self, trade: TradeData) -> Self {
        self.trade_data = Some(trade);
        self
    }

    pub fn with_risk(mut self, risk: RiskModule) -> Self {
        self.vcp_risk = Some(risk);
        self
    }

    pub fn with_governance(mut self, gov: GovernanceModule) -> Self {
        self.vcp_gov = Some(gov);
        self
    }

    pub fn with_extension(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.extensions.insert(name.into(), OpaqueBytes(bytes));
        self
    }

    /// The governance algorithm id, if the payload carries one.
    pub fn algo_id(&self) -> Option<&str> {
        self.vcp_gov.as_ref().and_then(|g| g.algo_id.as_deref())
    }

    /// Check every decimal string and extension name.
    pub fn validate(&self) -> VcpResult<()> {
        if let Some(trade) = &self.trade_data {
            trade.validate()?;
        }
        if let Some(gov) = &self.vcp_gov {
            gov.validate()?;
        }
        for name in self.extensions.keys() {
            let well_formed = !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
            if !well_formed {
                return Err(VcpError::InvalidPayload {
                    reason: format!("extension name '{name}' must match [a-z0-9_]+"),
                });
            }
            if RESERVED_NAMES.contains(&name.as_str()) {
                return Err(VcpError::InvalidPayload {
                    reason: format!("extension name '{name}' shadows a payload module"),
                });
            }
        }
        Ok(())
    }
}

impl FromStr for Side {
    type Err = VcpError;

    fn from_str(s: &str) -> Result<Self, VcpError> {
        match s {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(VcpError::InvalidInput {
                reason: format!("unknown side '{other}'"),
            }),
        }
    }
}
