//! Background refresh against a mock server, with a short period.

mod common;

use std::time::Duration;

use common::*;
use skycast_weather::{AutoRefresh, RefreshTarget};
use wiremock::MockServer;

#[tokio::test]
async fn test_refreshes_periodically_until_shutdown() {
    let server = MockServer::start().await;
    mount_city(&server, 2643743, "London", 12.0, None).await;

    let sync = synchronizer(&server, &memory_prefs());
    sync.fetch_by_place_name("London").await.unwrap();
    assert_eq!(request_count(&server, "/weather").await, 1);

    let refresh = AutoRefresh::spawn(sync.clone(), Duration::from_millis(150));
    assert!(refresh.is_running());
    tokio::time::sleep(Duration::from_millis(700)).await;

    let refreshed = request_count(&server, "/weather").await;
    assert!(refreshed >= 3, "expected periodic refreshes, saw {}", refreshed);

    refresh.shutdown().await;
    let after_shutdown = request_count(&server, "/weather").await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(request_count(&server, "/weather").await, after_shutdown);
}

#[tokio::test]
async fn test_nothing_refreshed_before_first_snapshot() {
    let server = MockServer::start().await;
    mount_city(&server, 2643743, "London", 12.0, None).await;

    let sync = synchronizer(&server, &memory_prefs());
    let refresh = AutoRefresh::spawn(sync.clone(), Duration::from_millis(100));
    tokio::time::sleep(Duration::from_millis(350)).await;
    refresh.shutdown().await;

    assert_eq!(request_count(&server, "/weather").await, 0);
}

#[tokio::test]
async fn test_refresh_follows_latest_search() {
    let server = MockServer::start().await;
    mount_city(&server, 2643743, "London", 12.0, None).await;
    mount_city(&server, 2988507, "Paris", 15.0, None).await;

    let sync = synchronizer(&server, &memory_prefs());
    let mut targets = sync.subscribe_target();
    sync.fetch_by_place_name("London").await.unwrap();
    let refresh = AutoRefresh::spawn(sync.clone(), Duration::from_millis(150));

    sync.fetch_by_place_name("Paris").await.unwrap();
    targets.changed().await.unwrap();
    assert_eq!(*targets.borrow(), RefreshTarget::PlaceName("Paris".into()));

    tokio::time::sleep(Duration::from_millis(500)).await;
    refresh.shutdown().await;

    let requests = server.received_requests().await.unwrap_or_default();
    let last = requests
        .iter()
        .filter(|r| r.url.path() == "/weather")
        .last()
        .unwrap();
    assert!(last.url.query().unwrap_or_default().contains("q=Paris"));
    assert_eq!(sync.city(), "Paris");
}

#[tokio::test]
async fn test_zero_period_disables_refresh() {
    let server = MockServer::start().await;
    mount_city(&server, 2643743, "London", 12.0, None).await;

    let sync = synchronizer(&server, &memory_prefs());
    sync.fetch_by_place_name("London").await.unwrap();

    let refresh = AutoRefresh::spawn(sync, Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!refresh.is_running());
    assert_eq!(request_count(&server, "/weather").await, 1);
}
