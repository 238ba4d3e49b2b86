//! Filtered search and recent-event listing.
//!
//! Search plan:
//!
//! 1. Normalize raw parameters into a typed [`SearchFilter`]; anything
//!    unparsable is `InvalidInput`.
//! 2. Pick the narrowest candidate set: the trace index, else the symbol
//!    index, else the binary-searched time range.
//! 3. Apply the remaining predicates, count every match, then page.
//!
//! Results come back in ascending `event_id` order, which is ledger order.

use std::sync::Arc;

use tracing::debug;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::{Event, EventType, TimestampNs, TraceId},
    query::{RecentEvents, SearchParams, SearchResponse},
    view::EventSummary,
};
use vcp_ledger::{HashChainLedger, LedgerView};

pub const DEFAULT_SEARCH_LIMIT: usize = 50;
pub const MAX_SEARCH_LIMIT: usize = 500;
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MAX_RECENT_LIMIT: usize = 100;

/// Validated search criteria.  Every present field must match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilter {
    pub trace_id: Option<TraceId>,
    pub symbol: Option<String>,
    pub event_type: Option<EventType>,
    pub venue_id: Option<String>,
    pub algo_id: Option<String>,
    pub start: Option<TimestampNs>,
    pub end: Option<TimestampNs>,
    pub limit: usize,
    pub offset: usize,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts the type name in any case or its numeric wire code.
fn parse_event_type(raw: &str) -> VcpResult<EventType> {
    match raw.parse::<u16>() {
        Ok(code) => EventType::from_code(code),
        Err(_) => raw.to_ascii_uppercase().parse(),
    }
}

impl SearchFilter {
    pub fn from_params(params: &SearchParams) -> VcpResult<Self> {
        let trace_id = non_empty(&params.trace_id)
            .map(|s| TraceId::parse(&s))
            .transpose()?;
        let event_type = non_empty(&params.event_type)
            .map(|s| parse_event_type(&s))
            .transpose()?;
        let start = non_empty(&params.start_time)
            .map(|s| TimestampNs::parse(&s))
            .transpose()?;
        let end = non_empty(&params.end_time)
            .map(|s| TimestampNs::parse(&s))
            .transpose()?;
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(VcpError::InvalidInput {
                    reason: format!("start_time {s} is after end_time {e}"),
                });
            }
        }

        let limit = match params.limit {
            None | Some(0) => DEFAULT_SEARCH_LIMIT,
            Some(n) if n < 0 => {
                return Err(VcpError::InvalidInput {
                    reason: format!("limit must not be negative, got {n}"),
                })
            }
            Some(n) => usize::try_from(n).map_or(MAX_SEARCH_LIMIT, |n| n.min(MAX_SEARCH_LIMIT)),
        };
        let offset = match params.offset {
            None => 0,
            Some(n) if n < 0 => {
                return Err(VcpError::InvalidInput {
                    reason: format!("offset must not be negative, got {n}"),
                })
            }
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        };

        Ok(Self {
            trace_id,
            symbol: non_empty(&params.symbol),
            event_type,
            venue_id: non_empty(&params.venue_id),
            algo_id: non_empty(&params.algo_id),
            start,
            end,
            limit,
            offset,
        })
    }

    /// The normalized query, echoed back in the response.
    pub fn to_params(&self) -> SearchParams {
        SearchParams {
            trace_id: self.trace_id.map(|t| t.to_string()),
            symbol: self.symbol.clone(),
            event_type: self.event_type.map(|t| t.as_str().to_string()),
            start_time: self.start.map(|t| t.to_string()),
            end_time: self.end.map(|t| t.to_string()),
            algo_id: self.algo_id.clone(),
            venue_id: self.venue_id.clone(),
            limit: Some(self.limit as i64),
            offset: Some(self.offset as i64),
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        let h = &event.header;
        self.trace_id.map_or(true, |t| h.trace_id == t)
            && self.symbol.as_deref().map_or(true, |s| h.symbol == s)
            && self.event_type.map_or(true, |t| h.event_type == t)
            && self.venue_id.as_deref().map_or(true, |v| h.venue_id == v)
            && self
                .algo_id
                .as_deref()
                .map_or(true, |a| event.payload.algo_id() == Some(a))
            && self.start.map_or(true, |s| h.timestamp_int >= s)
            && self.end.map_or(true, |e| h.timestamp_int <= e)
    }

    /// Matching sequences in ascending order.
    fn matching_sequences(&self, view: &LedgerView) -> Vec<u64> {
        let range = view.time_range(self.start, self.end);
        let (lo, hi) = (range.start as u64, range.end as u64);

        let candidates: Box<dyn Iterator<Item = u64> + '_> = if let Some(trace) = &self.trace_id {
            Box::new(view.trace_sequences(trace).iter().copied())
        } else if let Some(symbol) = &self.symbol {
            Box::new(view.symbol_sequences(symbol).iter().copied())
        } else {
            Box::new(lo..hi)
        };

        candidates
            .filter(|seq| (lo..hi).contains(seq))
            .filter(|&seq| view.event(seq).is_some_and(|e| self.matches(e)))
            .collect()
    }
}

/// Read-only query front end over a ledger.
#[derive(Clone)]
pub struct SearchEngine {
    ledger: Arc<HashChainLedger>,
}

impl SearchEngine {
    pub fn new(ledger: Arc<HashChainLedger>) -> Self {
        Self { ledger }
    }

    /// Search with raw transport parameters.
    pub fn search(&self, params: &SearchParams) -> VcpResult<SearchResponse> {
        let filter = SearchFilter::from_params(params)?;
        self.search_filter(&filter)
    }

    /// Search with an already validated filter.
    pub fn search_filter(&self, filter: &SearchFilter) -> VcpResult<SearchResponse> {
        let (events, total) = self.ledger.read(|view| {
            let matches = filter.matching_sequences(view);
            let total = matches.len() as u64;
            let page = matches
                .into_iter()
                .skip(filter.offset)
                .take(filter.limit)
                .filter_map(|seq| {
                    view.event(seq)
                        .map(|e| EventSummary::of(e, view.status_of(seq)))
                })
                .collect::<Vec<_>>();
            (page, total)
        })?;

        debug!(
            total,
            returned = events.len(),
            limit = filter.limit,
            offset = filter.offset,
            "search served"
        );
        Ok(SearchResponse {
            events,
            query: filter.to_params(),
            total,
        })
    }

    /// The newest events, newest first.
    ///
    /// `limit` defaults to 10, as does `0`, and is clamped to 100; negative
    /// values are rejected.
    pub fn recent(&self, limit: Option<i64>) -> VcpResult<RecentEvents> {
        let limit = match limit {
            None | Some(0) => DEFAULT_RECENT_LIMIT,
            Some(n) if n < 0 => {
                return Err(VcpError::InvalidInput {
                    reason: format!("limit must not be negative, got {n}"),
                })
            }
            Some(n) => usize::try_from(n).map_or(MAX_RECENT_LIMIT, |n| n.min(MAX_RECENT_LIMIT)),
        };

        let events = self.ledger.read(|view| {
            let len = view.len() as u64;
            (0..len)
                .rev()
                .take(limit)
                .filter_map(|seq| {
                    view.event(seq)
                        .map(|e| EventSummary::of(e, view.status_of(seq)))
                })
                .collect()
        })?;
        Ok(RecentEvents { events })
    }
}
