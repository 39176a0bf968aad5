//! Engine setup failures and lifecycle.

mod helpers;

use helpers::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use synthcast::core::{FourCharCode, SampleLayout};
use synthcast::plugin::{HostError, LoadStage, MatchCriteria};
use synthcast::remote::RpcEndpoint;
use synthcast::sink::MemorySink;
use synthcast::{ConfigError, Engine, Error, Stage};

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn build_without_instrument_is_a_config_error() {
    let err = Engine::builder().midi(false).build().err().unwrap();
    assert!(matches!(
        err,
        Error::Config(ConfigError::MissingInstrument)
    ));
    assert_eq!(err.stage(), Stage::Configuration);
}

#[test]
fn unknown_instrument_reports_search_stage() {
    let (registry, trace) = scripted_registry(Script::new(vec![vec![0.0]]));
    let criteria = MatchCriteria::instrument(FourCharCode::new(b"Nope"), TEST_MANUFACTURER);

    let err = Engine::builder()
        .instrument(criteria)
        .registry(Box::new(registry))
        .sink(Arc::new(MemorySink::new()))
        .midi(false)
        .build()
        .err()
        .unwrap();

    assert!(matches!(
        err,
        Error::Host(HostError::NotFound { subtype, manufacturer })
            if subtype == FourCharCode::new(b"Nope") && manufacturer == TEST_MANUFACTURER
    ));
    assert_eq!(err.stage(), Stage::Plugin(LoadStage::Search));
    assert!(err.report().starts_with("error: component search failed: "));
    assert!(err.report().contains("'Nope'"));
    assert_eq!(trace.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_until_shutdown_with_unreachable_remote() {
    let (registry, trace) = scripted_registry(Script::new(vec![vec![0.5], vec![-0.5]]));
    let sink = Arc::new(MemorySink::new());

    let engine = Engine::builder()
        .instrument(scripted_criteria())
        .host_options(quick_options(32, SampleLayout::Planar))
        .registry(Box::new(registry))
        .sink(sink.clone())
        .remote(Some(RpcEndpoint::new("127.0.0.1", closed_port())))
        .midi(false)
        .render_period(Duration::from_millis(1))
        .build()
        .unwrap();

    let stats = engine
        .run_until(tokio::time::sleep(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(stats.sent > 0);
    assert_eq!(stats.failed, 0);
    assert_eq!(sink.len() as u64, stats.sent);
    assert!(trace.disposed.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancel_token_stops_the_engine() {
    let (registry, trace) = scripted_registry(Script::new(vec![vec![0.5]]));

    let engine = Engine::builder()
        .instrument(scripted_criteria())
        .host_options(quick_options(32, SampleLayout::Interleaved))
        .registry(Box::new(registry))
        .sink(Arc::new(MemorySink::new()))
        .midi(false)
        .render_period(Duration::from_millis(1))
        .build()
        .unwrap();

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        engine.run_until(std::future::pending::<()>()),
    )
    .await
    .expect("engine should stop when cancelled")
    .unwrap();

    assert!(stats.ticks > 0);
    assert!(trace.disposed.load(Ordering::SeqCst));
}

#[test]
fn dropping_an_unstarted_engine_releases_the_plugin() {
    let (registry, trace) = scripted_registry(Script::new(vec![vec![0.5]]));

    let engine = Engine::builder()
        .instrument(scripted_criteria())
        .host_options(quick_options(32, SampleLayout::Interleaved))
        .registry(Box::new(registry))
        .sink(Arc::new(MemorySink::new()))
        .midi(false)
        .build()
        .unwrap();
    assert!(!engine.is_running());
    drop(engine);

    assert!(trace.disposed.load(Ordering::SeqCst));
    assert_eq!(trace.renders.load(Ordering::SeqCst), 0);
}
