//! Per-request caching behavior of an activated manager.

mod common;

use std::sync::Arc;

use common::*;
use reqwest::Method;
use skycast_offline::{
    CacheStorage, OfflineCacheManager, OfflineError, Request, RequestMode, ResponseSource,
};
use url::Url;

#[tokio::test]
async fn test_cross_origin_requests_never_touch_the_cache() {
    let fetcher = StubFetcher::with_app_shell();
    let api = Url::parse("https://api.openweathermap.org/data/2.5/weather?q=London&units=metric").unwrap();
    fetcher.route(&api, 200, "{\"name\":\"London\"}");
    let (manager, storage) = activated_manager(&fetcher).await;

    let request = Request::get(api.clone()).with_mode(RequestMode::Cors);
    for _ in 0..2 {
        let served = manager.handle_fetch(&request).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
    }
    assert_eq!(fetcher.calls_for(&api), 2);

    for bucket in storage.keys().unwrap() {
        assert!(storage.match_in(&bucket, &request).unwrap().is_none());
        assert!(!storage.entries(&bucket).unwrap().iter().any(|k| k.contains("openweathermap")));
    }

    // Even with the network down, the API is never answered from cache
    fetcher.set_offline(true);
    assert!(manager.handle_fetch(&request).await.unwrap_err().is_network());
}

#[tokio::test]
async fn test_non_get_requests_pass_through() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, storage) = activated_manager(&fetcher).await;

    let post = Request::get(app_url("/manifest.json")).with_method(Method::POST);
    let served = manager.handle_fetch(&post).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(storage.entries(manager.cache_name()).unwrap().len(), 4);
}

#[tokio::test]
async fn test_static_assets_are_cache_first() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, _) = activated_manager(&fetcher).await;
    let logo = app_url("/logo192.png");
    let calls_after_install = fetcher.calls_for(&logo);

    let served = manager.handle_fetch(&Request::get(logo.clone())).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"asset /logo192.png");
    assert_eq!(fetcher.calls_for(&logo), calls_after_install);
}

#[tokio::test]
async fn test_asset_miss_is_fetched_and_cached() {
    let fetcher = StubFetcher::with_app_shell();
    let script = app_url("/static/js/main.js");
    fetcher.route(&script, 200, "console.log(1)");
    let (manager, storage) = activated_manager(&fetcher).await;

    let first = manager.handle_fetch(&Request::get(script.clone())).await.unwrap();
    assert_eq!(first.source, ResponseSource::Network);
    assert!(storage
        .match_in(manager.cache_name(), &Request::get(script.clone()))
        .unwrap()
        .is_some());

    fetcher.set_offline(true);
    let second = manager.handle_fetch(&Request::get(script.clone())).await.unwrap();
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(fetcher.calls_for(&script), 1);
}

#[tokio::test]
async fn test_unsuccessful_assets_are_not_cached() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, storage) = activated_manager(&fetcher).await;
    let missing = app_url("/missing.png");

    let served = manager.handle_fetch(&Request::get(missing.clone())).await.unwrap();
    assert_eq!(served.response.status, 404);
    assert!(storage
        .match_in(manager.cache_name(), &Request::get(missing))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_navigation_is_network_first_and_refreshes_cache() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, storage) = activated_manager(&fetcher).await;
    let home = app_url("/");

    fetcher.route(&home, 200, "fresh shell");
    let served = manager.handle_fetch(&Request::navigate(home.clone())).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
    assert_eq!(served.response.body, b"fresh shell");

    let cached = storage
        .match_in(manager.cache_name(), &Request::navigate(home))
        .unwrap()
        .unwrap();
    assert_eq!(cached.body, b"fresh shell");
}

#[tokio::test]
async fn test_failed_navigation_response_is_not_cached() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, storage) = activated_manager(&fetcher).await;
    let page = app_url("/settings");
    fetcher.route(&page, 503, "unavailable");

    let served = manager.handle_fetch(&Request::navigate(page.clone())).await.unwrap();
    assert_eq!(served.response.status, 503);
    assert!(storage
        .match_in(manager.cache_name(), &Request::navigate(page))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_offline_navigation_serves_exact_match() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, _) = activated_manager(&fetcher).await;
    let page = app_url("/forecast?city=Paris");
    fetcher.route(&page, 200, "paris page");
    manager.handle_fetch(&Request::navigate(page.clone())).await.unwrap();

    fetcher.set_offline(true);
    let served = manager.handle_fetch(&Request::navigate(page)).await.unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"paris page");
}

#[tokio::test]
async fn test_offline_navigation_falls_back_to_root_document() {
    let fetcher = StubFetcher::with_app_shell();
    let (manager, _) = activated_manager(&fetcher).await;
    fetcher.set_offline(true);

    let served = manager
        .handle_fetch(&Request::navigate(app_url("/never-visited")))
        .await
        .unwrap();
    assert_eq!(served.source, ResponseSource::Cache);
    assert_eq!(served.response.body, b"asset /");
}

#[tokio::test]
async fn test_cache_write_failure_still_returns_live_response() {
    let fetcher = StubFetcher::with_app_shell();
    let storage = Arc::new(FlakyStorage::default());
    let manager = OfflineCacheManager::new(settings("2.2.0"), storage.clone(), fetcher.clone());
    manager.install().await.unwrap();
    manager.activate().unwrap();
    storage.fail_writes();

    let script = app_url("/app.js");
    fetcher.route(&script, 200, "live");
    let served = manager.handle_fetch(&Request::get(script.clone())).await.unwrap();
    assert_eq!(served.response.body, b"live");
    assert!(storage.match_in(manager.cache_name(), &Request::get(script)).unwrap().is_none());

    let home = app_url("/");
    let served = manager.handle_fetch(&Request::navigate(home)).await.unwrap();
    assert_eq!(served.source, ResponseSource::Network);
}

#[tokio::test]
async fn test_offline_without_precache_has_no_response() {
    let fetcher = StubFetcher::with_app_shell();
    let manager = OfflineCacheManager::new(
        settings("2.2.0"),
        Arc::new(skycast_offline::MemoryCacheStorage::new()),
        fetcher.clone(),
    );
    fetcher.set_offline(true);

    let err = manager
        .handle_fetch(&Request::navigate(app_url("/")))
        .await
        .unwrap_err();
    assert!(matches!(err, OfflineError::NoResponse { .. }));
}
