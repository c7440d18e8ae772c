// tests/fetch_all_isolation.rs
//! One pool failing (transport, status, schema, registry, storage) never
//! affects the samples of the others in the same cycle.

mod common;

use common::*;
use pool_hashrate_poller::clock::ManualClock;
use pool_hashrate_poller::hashrate::{bucket_timestamp, HashrateKind, NOT_USED};
use pool_hashrate_poller::poller::{PoolReportedHashrate, SourceError, SourceOutcome};
use pool_hashrate_poller::registry::PoolRegistry;
use pool_hashrate_poller::sources::{SourceDescriptor, SourceKind, SourceSet};
use pool_hashrate_poller::storage::{HashrateStore, InMemoryHashrateStore};
use pool_hashrate_poller::PollerConfig;

use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use wiremock::{MockServer, ResponseTemplate};

fn build(
    sources: SourceSet,
    registry: Arc<dyn PoolRegistry>,
    store: Arc<dyn HashrateStore>,
) -> PoolReportedHashrate {
    let cfg = PollerConfig {
        http_timeout_secs: 2,
        ..PollerConfig::default()
    };
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 4, 10, 17, 42).unwrap());
    PoolReportedHashrate::new(&cfg, sources, registry, store)
        .unwrap()
        .with_clock(Arc::new(clock))
}

#[tokio::test]
async fn all_sources_healthy_saves_one_sample_each() {
    let server = MockServer::start().await;
    serve_all_fixtures(&server).await;
    let store = Arc::new(InMemoryHashrateStore::new());
    let poller = build(sources_on(&server), Arc::new(TestRegistry::all()), store.clone());

    let report = poller.fetch_all().await;
    assert_eq!(report.saved_count(), 5);
    assert_eq!(report.skipped_count(), 0);
    assert_eq!(store.len(), 5);

    let bucket = Utc.with_ymd_and_hms(2024, 5, 4, 10, 17, 0).unwrap();
    for s in store.samples() {
        assert_eq!(s.timestamp, bucket);
        assert_eq!(s.kind, HashrateKind::Reported);
        assert_eq!(s.share, NOT_USED);
        assert!(s.avg_hashrate >= 0.0);
    }
    let antpool = &store.samples_for_pool(44)[0];
    assert_eq!(antpool.avg_hashrate, 12_345_600_000_000.0);
    let viabtc = &store.samples_for_pool(73)[0];
    assert_eq!(viabtc.avg_hashrate, 5.0);
}

#[tokio::test]
async fn transport_and_schema_failures_are_isolated() {
    let server = MockServer::start().await;
    // Foundry down, AntPool renamed its field, Binance returns an empty body.
    serve(&server, SourceKind::FoundryUsa, ResponseTemplate::new(503)).await;
    serve(
        &server,
        SourceKind::AntPool,
        ResponseTemplate::new(200)
            .set_body_string(r#"{"data":{"items":[{"poolHashRate":"1 GH/s"}]}}"#),
    )
    .await;
    serve(&server, SourceKind::BinancePool, ResponseTemplate::new(200)).await;
    for k in [SourceKind::ViaBtc, SourceKind::Luxor] {
        serve(&server, k, ResponseTemplate::new(200).set_body_string(fixture(k))).await;
    }

    let store = Arc::new(InMemoryHashrateStore::new());
    let poller = build(sources_on(&server), Arc::new(TestRegistry::all()), store.clone());
    let report = poller.fetch_all().await;

    assert_eq!(report.saved_count(), 2);
    let saved: HashSet<u32> = store.samples().iter().map(|s| s.pool_id).collect();
    assert_eq!(saved, HashSet::from([73, 4]));

    assert!(matches!(
        report.outcome_for(111),
        Some(SourceOutcome::Skipped {
            error: SourceError::HttpStatus(s),
            ..
        }) if s.as_u16() == 503
    ));
    assert!(matches!(
        report.outcome_for(44),
        Some(SourceOutcome::Skipped {
            error: SourceError::Extract(_),
            ..
        })
    ));
    assert!(matches!(
        report.outcome_for(105),
        Some(SourceOutcome::Skipped {
            error: SourceError::EmptyBody,
            ..
        })
    ));
}

#[tokio::test]
async fn unreachable_host_does_not_block_next_source() {
    let server = MockServer::start().await;
    serve_all_fixtures(&server).await;
    let sources = SourceSet::new(vec![
        // nothing listens on port 9 (discard) locally
        SourceDescriptor::new(SourceKind::FoundryUsa, "http://127.0.0.1:9/pool_stats"),
        SourceDescriptor::new(
            SourceKind::ViaBtc,
            format!("{}{}", server.uri(), route(SourceKind::ViaBtc)),
        ),
    ])
    .unwrap();
    let store = Arc::new(InMemoryHashrateStore::new());
    let poller = build(sources, Arc::new(TestRegistry::all()), store.clone());

    let report = poller.fetch_all().await;
    assert!(matches!(
        report.outcome_for(111),
        Some(SourceOutcome::Skipped {
            error: SourceError::Transport(_),
            ..
        })
    ));
    assert_eq!(store.samples_for_pool(73).len(), 1);
    assert!(store.samples_for_pool(111).is_empty());
}

#[tokio::test]
async fn unknown_pool_is_skipped_without_any_request_or_save() {
    let server = MockServer::start().await;
    serve_all_fixtures(&server).await;
    let store = Arc::new(InMemoryHashrateStore::new());
    let poller = build(
        sources_on(&server),
        Arc::new(TestRegistry::without(&[105])),
        store.clone(),
    );

    let report = poller.fetch_all().await;
    assert!(matches!(
        report.outcome_for(105),
        Some(SourceOutcome::Skipped {
            error: SourceError::UnknownPool(105),
            ..
        })
    ));
    assert!(store.samples_for_pool(105).is_empty());
    assert_eq!(store.save_calls(), 4);

    let hit_binance = server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .any(|r| r.url.path() == route(SourceKind::BinancePool));
    assert!(!hit_binance);
}

#[tokio::test]
async fn storage_failure_for_one_pool_keeps_the_rest() {
    let server = MockServer::start().await;
    serve_all_fixtures(&server).await;
    let store = Arc::new(FlakyStore {
        inner: InMemoryHashrateStore::new(),
        reject: HashSet::from([4]),
    });
    let poller = build(sources_on(&server), Arc::new(TestRegistry::all()), store.clone());

    let report = poller.fetch_all().await;
    assert!(matches!(
        report.outcome_for(4),
        Some(SourceOutcome::Skipped {
            error: SourceError::Persist(_),
            ..
        })
    ));
    assert_eq!(store.inner.len(), 4);
}

#[tokio::test]
async fn repeated_cycle_in_same_minute_upserts() {
    let server = MockServer::start().await;
    serve_all_fixtures(&server).await;
    let store = Arc::new(InMemoryHashrateStore::new());
    let poller = build(sources_on(&server), Arc::new(TestRegistry::all()), store.clone());

    poller.fetch_all().await;
    let first = store.samples();
    poller.fetch_all().await;
    assert_eq!(store.samples(), first);
    assert_eq!(store.len(), 5);
    assert_eq!(store.save_calls(), 10);
    assert!(first
        .iter()
        .all(|s| s.timestamp == bucket_timestamp(s.timestamp)));
}
