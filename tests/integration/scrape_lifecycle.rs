//! End-to-end pipeline tests: poll tasks → shared channel → correlator → sink
//!
//! These run the real `PrometheusClient` against a wiremock endpoint where
//! the scenario needs real HTTP, and fixed fetchers where it doesn't.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use alert_relay::scrape::{CorrelatorHandle, ScrapeManager};

use super::helpers::*;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

#[tokio::test]
async fn test_pipeline_delivers_scraped_alerts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(alerts_response_json(&["HighLoad"])),
        )
        .mount(&mock_server)
        .await;

    let store = new_store();
    let mut target = create_test_target("prod", 1, "channel-1");
    target.endpoint = format!("{}/api/v1/alerts", mock_server.uri());
    seed_store(store.as_ref(), "guild-1", vec![target.clone()]).await;

    let manager = ScrapeManager::new();
    let sink = Arc::new(RecordingSink::default());
    let correlator = CorrelatorHandle::spawn(
        store.clone(),
        sink.clone(),
        manager.take_results().unwrap(),
    );

    manager.start("guild-1", target).unwrap();
    settle().await;

    let deliveries = sink.delivered_names().await;
    assert!(!deliveries.is_empty(), "at least one poll should deliver");
    assert_eq!(deliveries[0], vec!["HighLoad".to_string()]);
    assert_eq!(sink.channels().await[0], "channel-1");

    manager.shutdown();
    correlator.shutdown().await;
}

#[tokio::test]
async fn test_consecutive_polls_deliver_in_order() {
    let mock_server = MockServer::start().await;

    // First poll returns A, every later poll returns B
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alerts_response_json(&["A"])))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alerts_response_json(&["B"])))
        .mount(&mock_server)
        .await;

    let store = new_store();
    let mut target = create_test_target("prod", 1, "channel-1");
    target.endpoint = format!("{}/api/v1/alerts", mock_server.uri());
    seed_store(store.as_ref(), "guild-1", vec![target.clone()]).await;

    let manager = ScrapeManager::new();
    let sink = Arc::new(RecordingSink::default());
    let correlator = CorrelatorHandle::spawn(
        store.clone(),
        sink.clone(),
        manager.take_results().unwrap(),
    );

    manager.start("guild-1", target).unwrap();

    // Wait out two poll intervals
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let deliveries = sink.delivered_names().await;
    assert!(deliveries.len() >= 2, "expected two polls, got {deliveries:?}");
    assert_eq!(deliveries[0], vec!["A".to_string()]);
    assert_eq!(deliveries[1], vec!["B".to_string()]);

    manager.shutdown();
    correlator.shutdown().await;
}

#[tokio::test]
async fn test_stopping_one_guild_does_not_affect_another() {
    let store = new_store();
    let t1 = create_test_target("t1", 1, "channel-1");
    let t2 = create_test_target("t2", 1, "channel-2");
    seed_store(store.as_ref(), "guild-1", vec![t1.clone()]).await;
    seed_store(store.as_ref(), "guild-2", vec![t2.clone()]).await;

    let manager =
        ScrapeManager::with_fetcher_factory(fixed_fetcher_factory(vec![create_test_alert(
            "HighLoad",
        )]));
    let sink = Arc::new(RecordingSink::default());
    let correlator = CorrelatorHandle::spawn(
        store.clone(),
        sink.clone(),
        manager.take_results().unwrap(),
    );

    manager.start("guild-1", t1).unwrap();
    manager.start("guild-2", t2).unwrap();
    settle().await;

    manager.stop("guild-1", "t1").unwrap();
    let before = sink.channels().await;
    let channel2_before = before.iter().filter(|c| *c == "channel-2").count();

    // guild-2 keeps polling and delivering after guild-1 is stopped
    tokio::time::sleep(Duration::from_millis(1500)).await;

    let after = sink.channels().await;
    let channel2_after = after.iter().filter(|c| *c == "channel-2").count();
    assert!(
        channel2_after > channel2_before,
        "guild-2 deliveries should continue"
    );

    manager.shutdown();
    correlator.shutdown().await;
}

#[tokio::test]
async fn test_inhibition_added_after_start_takes_effect_without_restart() {
    let store = new_store();
    let target = create_test_target("prod", 1, "channel-1");
    seed_store(store.as_ref(), "guild-1", vec![target.clone()]).await;

    let manager =
        ScrapeManager::with_fetcher_factory(fixed_fetcher_factory(vec![create_test_alert(
            "Noisy",
        )]));
    let sink = Arc::new(RecordingSink::default());
    let correlator = CorrelatorHandle::spawn(
        store.clone(),
        sink.clone(),
        manager.take_results().unwrap(),
    );

    manager.start("guild-1", target.clone()).unwrap();
    settle().await;
    assert!(!sink.delivered_names().await.is_empty());

    // Inhibit while the task keeps running on its stale snapshot
    alert_relay::handlers::inhibit_alert(store.as_ref(), "guild-1", "prod", "Noisy")
        .await
        .unwrap();

    sink.deliveries.lock().await.clear();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(
        sink.delivered_names().await.is_empty(),
        "the correlator's fresh read should filter the newly inhibited alert"
    );

    manager.shutdown();
    correlator.shutdown().await;
}
