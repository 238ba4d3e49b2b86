//! Error types for the VCP ledger core.
//!
//! Every fallible operation in the workspace returns `VcpResult<T>`.  The
//! variants follow the ledger's error taxonomy: caller-correctable input
//! problems, missing records, retryable races and dependency failures, and
//! opaque internal faults.  Integrity violations are always `InternalFault`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The unified error type for the VCP ledger core.
#[derive(Debug, Error)]
pub enum VcpError {
    /// A malformed identifier, filter, or parameter supplied by the caller.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The event draft failed validation and was not appended.
    #[error("invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// The requested record does not exist.
    #[error("{what} '{id}' not found")]
    NotFound { what: String, id: String },

    /// The event exists but its batch has not been anchored yet.
    #[error("proof unavailable for event '{event_id}': {reason}")]
    ProofUnavailable { event_id: String, reason: String },

    /// An optimistic append named a `prev_hash` that is no longer the tip.
    #[error("chain conflict: expected tip '{expected}', actual tip '{actual}'")]
    ChainConflict { expected: String, actual: String },

    /// The signer rejected or failed to sign the event hash.
    #[error("signature failure: {reason}")]
    SignatureFailure { reason: String },

    /// The external anchoring medium could not accept or report a root.
    #[error("anchoring unavailable: {reason}")]
    AnchoringUnavailable { reason: String },

    /// An external call exceeded its bounded timeout.
    #[error("{operation} timed out after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    /// Unexpected failure, including hash or chain integrity violations.
    #[error("internal fault: {reason}")]
    InternalFault { reason: String },

    /// A configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl VcpError {
    /// True for failures a caller may retry without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VcpError::ChainConflict { .. }
                | VcpError::AnchoringUnavailable { .. }
                | VcpError::Timeout { .. }
        )
    }

    /// The HTTP status a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            VcpError::InvalidInput { .. } | VcpError::InvalidPayload { .. } => 400,
            VcpError::NotFound { .. } => 404,
            VcpError::ProofUnavailable { .. } | VcpError::ChainConflict { .. } => 409,
            VcpError::SignatureFailure { .. } => 502,
            VcpError::AnchoringUnavailable { .. } => 503,
            VcpError::Timeout { .. } => 504,
            VcpError::InternalFault { .. } | VcpError::ConfigError { .. } => 500,
        }
    }

    /// Stable machine-readable code used in the wire error body.
    pub fn code(&self) -> &'static str {
        match self {
            VcpError::InvalidInput { .. } | VcpError::InvalidPayload { .. } => "invalid_parameter",
            VcpError::NotFound { .. } => "not_found",
            VcpError::ProofUnavailable { .. } | VcpError::ChainConflict { .. } => "conflict",
            VcpError::SignatureFailure { .. } => "signature_failure",
            VcpError::AnchoringUnavailable { .. } => "anchoring_unavailable",
            VcpError::Timeout { .. } => "timeout",
            VcpError::InternalFault { .. } | VcpError::ConfigError { .. } => "internal_error",
        }
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        VcpError::InvalidInput { reason: reason.into() }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        VcpError::InternalFault { reason: reason.into() }
    }

    pub fn not_found(what: impl Into<String>, id: impl ToString) -> Self {
        VcpError::NotFound {
            what: what.into(),
            id: id.to_string(),
        }
    }
}

/// Convenience alias used throughout the VCP crates.
pub type VcpResult<T> = Result<T, VcpError>;

/// The JSON error body returned to API clients.
///
/// Internal faults never leak their diagnostic context: the message is
/// replaced with a generic one and the detail stays in the logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&VcpError> for ApiError {
    fn from(err: &VcpError) -> Self {
        let message = match err {
            VcpError::InternalFault { .. } | VcpError::ConfigError { .. } => {
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };
        ApiError {
            error: err.code().to_string(),
            message: Some(message),
        }
    }
}
