//! Route-level operations for an HTTP front end.
//!
//! Each method takes inputs as a transport receives them (path segments,
//! query strings) and answers with either the response body or an
//! [`ApiFailure`] carrying the status code and wire error body.
//!
//! | Route                              | Method                      |
//! |------------------------------------|-----------------------------|
//! | `GET /events/recent`               | [`Api::recent_events`]      |
//! | `GET /events`                      | [`Api::search_events`]      |
//! | `GET /events/{id}`                 | [`Api::event`]              |
//! | `GET /events/{id}/proof`           | [`Api::event_proof`]        |
//! | `GET /events/{id}/certificate`     | [`Api::event_certificate`]  |
//! | `GET /system/status`               | [`Api::system_status`]      |
//! | `GET /certified/entities`          | [`Api::certified_entities`] |

use std::sync::Arc;

use tracing::error;

use vcp_contracts::{
    certificate::Certificate,
    error::{ApiError, VcpError},
    event::EventId,
    query::{RecentEvents, SearchParams, SearchResponse},
    system::{CertifiedEntities, ComplianceTier, EntityStatus, SystemStatus},
    view::{EventDetail, MerkleProofView},
};

use crate::node::VcpNode;

/// A failed request: HTTP status plus the JSON error body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub status: u16,
    pub body: ApiError,
}

impl ApiFailure {
    fn invalid(code: &str, message: String) -> Self {
        Self {
            status: 400,
            body: ApiError {
                error: code.to_string(),
                message: Some(message),
            },
        }
    }
}

impl From<VcpError> for ApiFailure {
    fn from(err: VcpError) -> Self {
        if err.status_code() == 500 {
            error!(error = %err, "request failed with an internal fault");
        }
        Self {
            status: err.status_code(),
            body: ApiError::from(&err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiFailure>;

/// Parse a path id, answering `invalid_event_id` for anything that is not
/// a version-7 UUID.
pub fn parse_event_id(raw: &str) -> ApiResult<EventId> {
    EventId::parse(raw).map_err(|e| ApiFailure::invalid("invalid_event_id", e.to_string()))
}

fn parse_entity_status(raw: &str) -> ApiResult<EntityStatus> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "COMPLIANT" => Ok(EntityStatus::Compliant),
        "PENDING" => Ok(EntityStatus::Pending),
        "REVOKED" => Ok(EntityStatus::Revoked),
        "SUSPENDED" => Ok(EntityStatus::Suspended),
        other => Err(ApiFailure::invalid(
            "invalid_parameter",
            format!("unknown entity status '{}'", other),
        )),
    }
}

fn parse_tier(raw: &str) -> ApiResult<ComplianceTier> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "PLATINUM" => Ok(ComplianceTier::Platinum),
        "GOLD" => Ok(ComplianceTier::Gold),
        "SILVER" => Ok(ComplianceTier::Silver),
        other => Err(ApiFailure::invalid(
            "invalid_parameter",
            format!("unknown compliance tier '{}'", other),
        )),
    }
}

#[derive(Clone)]
pub struct Api {
    node: Arc<VcpNode>,
}

impl Api {
    pub fn new(node: Arc<VcpNode>) -> Self {
        Self { node }
    }

    pub fn recent_events(&self, limit: Option<i64>) -> ApiResult<RecentEvents> {
        Ok(self.node.recent(limit)?)
    }

    pub fn search_events(&self, params: &SearchParams) -> ApiResult<SearchResponse> {
        Ok(self.node.search(params)?)
    }

    pub fn event(&self, raw_id: &str) -> ApiResult<EventDetail> {
        let id = parse_event_id(raw_id)?;
        Ok(self.node.get_event(&id)?)
    }

    pub fn event_proof(&self, raw_id: &str) -> ApiResult<MerkleProofView> {
        let id = parse_event_id(raw_id)?;
        Ok(self.node.proof(&id)?)
    }

    pub fn event_certificate(&self, raw_id: &str) -> ApiResult<Certificate> {
        let id = parse_event_id(raw_id)?;
        Ok(self.node.certificate(&id)?)
    }

    pub fn system_status(&self) -> ApiResult<SystemStatus> {
        Ok(self.node.system_status()?)
    }

    /// Blank filters are treated as absent.
    pub fn certified_entities(
        &self,
        status: Option<&str>,
        tier: Option<&str>,
    ) -> ApiResult<CertifiedEntities> {
        let status = status
            .filter(|s| !s.trim().is_empty())
            .map(parse_entity_status)
            .transpose()?;
        let tier = tier
            .filter(|s| !s.trim().is_empty())
            .map(parse_tier)
            .transpose()?;
        Ok(self.node.certified_entities(status, tier))
    }
}
