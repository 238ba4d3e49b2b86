//! # vcp-query
//!
//! Search and listing over the published ledger.  Reads only: the engine
//! takes the ledger's read lock for the duration of one query and never
//! blocks appends for longer than that.

pub mod engine;

pub use engine::{SearchEngine, SearchFilter};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use vcp_contracts::{
        error::VcpError,
        event::{AnchorStatus, Event, EventDraft, EventType, TraceId},
        payload::{GovernanceModule, Payload, TradeData},
        query::SearchParams,
    };
    use vcp_core::{clock::ManualClock, signer::Ed25519Signer};
    use vcp_ledger::HashChainLedger;

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const T0: u64 = 1_732_453_325_000_000_000;
    const STEP: u64 = 1_000_000;

    struct Fixture {
        ledger: Arc<HashChainLedger>,
        engine: SearchEngine,
        events: Vec<Arc<Event>>,
    }

    fn draft(event_type: EventType, symbol: &str) -> EventDraft {
        EventDraft::new(event_type, "XNAS", symbol)
            .with_payload(Payload::default().with_trade(TradeData::new(symbol)))
    }

    fn with_algo(draft: EventDraft, algo_id: &str) -> EventDraft {
        let payload = draft.payload.clone().with_governance(GovernanceModule {
            algo_id: Some(algo_id.to_string()),
            ..GovernanceModule::default()
        });
        draft.with_payload(payload)
    }

    /// Appends `drafts` one millisecond apart starting at `T0 + STEP`.
    async fn fixture(drafts: Vec<EventDraft>) -> Fixture {
        let clock = Arc::new(ManualClock::new(T0));
        let ledger = Arc::new(HashChainLedger::new(clock.clone(), Duration::from_secs(1)));
        let signer = Ed25519Signer::from_seed([3u8; 32]);
        let mut events = Vec::new();
        for d in drafts {
            clock.advance(STEP);
            events.push(ledger.append(d, &signer, None).await.unwrap());
        }
        Fixture {
            engine: SearchEngine::new(Arc::clone(&ledger)),
            ledger,
            events,
        }
    }

    async fn many(n: usize) -> Fixture {
        fixture((0..n).map(|_| draft(EventType::Hbt, "SYSTEM")).collect()).await
    }

    fn params() -> SearchParams {
        SearchParams::default()
    }

    // ── Pagination ────────────────────────────────────────────────────────────

    /// Oversized limits are clamped; results keep ledger order.
    #[tokio::test]
    async fn huge_limit_is_clamped_and_ordered() {
        let fx = many(600).await;
        let response = fx
            .engine
            .search(&SearchParams {
                limit: Some(10_000),
                ..params()
            })
            .unwrap();

        assert_eq!(response.events.len(), 500);
        assert_eq!(response.total, 600);
        assert_eq!(response.query.limit, Some(500));
        assert!(response
            .events
            .windows(2)
            .all(|w| w[0].event_id < w[1].event_id));
        assert_eq!(response.events[0].event_id, fx.events[0].id());
    }

    /// Without a limit, 50 results come back.
    #[tokio::test]
    async fn default_limit_is_fifty() {
        let fx = many(60).await;
        let response = fx.engine.search(&params()).unwrap();
        assert_eq!(response.events.len(), 50);
        assert_eq!(response.query.offset, Some(0));
    }

    /// Offsets page through results without changing `total`.
    #[tokio::test]
    async fn offset_pages_through_results() {
        let fx = many(7).await;
        let page = fx
            .engine
            .search(&SearchParams {
                limit: Some(3),
                offset: Some(5),
                ..params()
            })
            .unwrap();
        assert_eq!(page.total, 7);
        let ids: Vec<_> = page.events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![fx.events[5].id(), fx.events[6].id()]);

        let beyond = fx
            .engine
            .search(&SearchParams {
                offset: Some(100),
                ..params()
            })
            .unwrap();
        assert!(beyond.events.is_empty());
        assert_eq!(beyond.total, 7);
    }

    /// Negative limit or offset is `InvalidInput`.
    #[tokio::test]
    async fn negative_paging_is_invalid() {
        let fx = many(1).await;
        for bad in [
            SearchParams { limit: Some(-1), ..params() },
            SearchParams { offset: Some(-5), ..params() },
        ] {
            assert!(matches!(
                fx.engine.search(&bad),
                Err(VcpError::InvalidInput { .. })
            ));
        }
    }

    // ── Filters ───────────────────────────────────────────────────────────────

    /// Every given filter must match.
    #[tokio::test]
    async fn filters_are_anded() {
        let fx = fixture(vec![
            draft(EventType::Ord, "AAPL"),
            draft(EventType::Exe, "AAPL"),
            draft(EventType::Ord, "MSFT"),
            with_algo(draft(EventType::Ord, "AAPL"), "momentum-v2"),
        ])
        .await;

        let aapl_orders = fx
            .engine
            .search(&SearchParams {
                symbol: Some("AAPL".to_string()),
                event_type: Some("ord".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(aapl_orders.total, 2);
        assert_eq!(aapl_orders.query.event_type.as_deref(), Some("ORD"));

        let by_algo = fx
            .engine
            .search(&SearchParams {
                algo_id: Some("momentum-v2".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(by_algo.total, 1);
        assert_eq!(by_algo.events[0].event_id, fx.events[3].id());

        let by_code = fx
            .engine
            .search(&SearchParams {
                event_type: Some("4".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(by_code.total, 1);

        let other_venue = fx
            .engine
            .search(&SearchParams {
                venue_id: Some("XLON".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(other_venue.total, 0);
    }

    /// A trace filter returns exactly that trace.
    #[tokio::test]
    async fn trace_filter_uses_the_index() {
        let trace = TraceId::new();
        let fx = fixture(vec![
            draft(EventType::Ord, "AAPL").with_trace(trace),
            draft(EventType::Ord, "MSFT"),
            draft(EventType::Ack, "AAPL").with_trace(trace),
            draft(EventType::Exe, "AAPL").with_trace(trace),
        ])
        .await;

        let response = fx
            .engine
            .search(&SearchParams {
                trace_id: Some(trace.to_string()),
                event_type: Some("ACK".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.events[0].event_id, fx.events[2].id());

        let whole = fx
            .engine
            .search(&SearchParams {
                trace_id: Some(trace.to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(whole.total, 3);
    }

    /// Time windows are inclusive in either timestamp form.
    #[tokio::test]
    async fn time_window_is_inclusive_in_both_forms() {
        let fx = many(5).await;
        let start = fx.events[1].timestamp();
        let end = fx.events[3].timestamp();

        let by_int = fx
            .engine
            .search(&SearchParams {
                start_time: Some(start.to_string()),
                end_time: Some(end.to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(by_int.total, 3);

        let by_iso = fx
            .engine
            .search(&SearchParams {
                start_time: Some(start.to_iso()),
                end_time: Some(end.to_iso()),
                ..params()
            })
            .unwrap();
        assert_eq!(by_iso.events, by_int.events);
    }

    /// Time windows narrow a symbol lookup.
    #[tokio::test]
    async fn time_window_combines_with_symbol_index() {
        let fx = fixture(vec![
            draft(EventType::Ord, "AAPL"),
            draft(EventType::Ord, "MSFT"),
            draft(EventType::Ord, "AAPL"),
            draft(EventType::Ord, "AAPL"),
        ])
        .await;
        let response = fx
            .engine
            .search(&SearchParams {
                symbol: Some("AAPL".to_string()),
                start_time: Some(fx.events[1].timestamp().to_string()),
                ..params()
            })
            .unwrap();
        let ids: Vec<_> = response.events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![fx.events[2].id(), fx.events[3].id()]);
    }

    /// Malformed filter values are `InvalidInput`.
    #[tokio::test]
    async fn malformed_filters_are_invalid() {
        let fx = many(1).await;
        let bad = [
            SearchParams { start_time: Some("yesterday".to_string()), ..params() },
            SearchParams { event_type: Some("FOO".to_string()), ..params() },
            SearchParams { trace_id: Some("not-a-uuid".to_string()), ..params() },
            SearchParams {
                start_time: Some("2000".to_string()),
                end_time: Some("1000".to_string()),
                ..params()
            },
        ];
        for p in bad {
            assert!(
                matches!(fx.engine.search(&p), Err(VcpError::InvalidInput { .. })),
                "{p:?} should be rejected"
            );
        }
    }

    /// Blank filters are ignored.
    #[tokio::test]
    async fn blank_filters_are_ignored() {
        let fx = many(3).await;
        let response = fx
            .engine
            .search(&SearchParams {
                symbol: Some("  ".to_string()),
                ..params()
            })
            .unwrap();
        assert_eq!(response.total, 3);
        assert_eq!(response.query.symbol, None);
    }

    /// Summaries carry the hash prefix and anchor status.
    #[tokio::test]
    async fn summaries_carry_hash_prefix_and_status() {
        let fx = many(1).await;
        let response = fx.engine.search(&params()).unwrap();
        let summary = &response.events[0];
        assert_eq!(summary.hash_prefix, &fx.events[0].security.event_hash[..6]);
        assert_eq!(summary.status, AnchorStatus::Pending);
        assert_eq!(summary.event_type_code, 98);
        assert_eq!(summary.timestamp, fx.events[0].header.timestamp_iso);
    }

    // ── Recent ────────────────────────────────────────────────────────────────

    /// Recent events come newest first.
    #[tokio::test]
    async fn recent_is_newest_first() {
        let fx = many(15).await;
        let recent = fx.engine.recent(None).unwrap();
        assert_eq!(recent.events.len(), 10);
        assert_eq!(recent.events[0].event_id, fx.events[14].id());
        assert!(recent
            .events
            .windows(2)
            .all(|w| w[0].event_id > w[1].event_id));
    }

    /// Recent limits clamp at 100 and `0` means the default.
    #[tokio::test]
    async fn recent_limit_bounds() {
        let fx = many(120).await;
        assert_eq!(fx.engine.recent(Some(500)).unwrap().events.len(), 100);
        assert_eq!(fx.engine.recent(Some(3)).unwrap().events.len(), 3);
        assert_eq!(fx.engine.recent(Some(0)).unwrap().events.len(), 10);
        assert!(matches!(
            fx.engine.recent(Some(-2)),
            Err(VcpError::InvalidInput { .. })
        ));
        assert_eq!(fx.ledger.len().unwrap(), 120);
    }

    /// An empty ledger has no recent events.
    #[tokio::test]
    async fn recent_on_empty_ledger() {
        let fx = many(0).await;
        assert!(fx.engine.recent(None).unwrap().events.is_empty());
    }
}
