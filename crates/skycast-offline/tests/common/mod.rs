//! Scriptable network and storage doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use skycast_offline::{
    CacheStorage, Fetcher, HttpResponse, MemoryCacheStorage, OfflineCacheManager, OfflineError,
    OfflineResult, OfflineSettings, Request, ResponseType,
};
use url::Url;

pub const ORIGIN: &str = "https://weather.example/";

pub fn app_url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn settings(version: &str) -> OfflineSettings {
    OfflineSettings::new(Url::parse(ORIGIN).unwrap()).with_version(version)
}

/// Network double: answers from a route table, or fails when offline.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    /// Online, serving every default precache asset.
    pub fn with_app_shell() -> Arc<Self> {
        let fetcher = Arc::new(Self::default());
        for path in skycast_offline::DEFAULT_PRECACHE {
            fetcher.route(&app_url(path), 200, &format!("asset {}", path));
        }
        fetcher
    }

    pub fn route(&self, url: &Url, status: u16, body: &str) {
        let response_type = if url.origin() == Url::parse(ORIGIN).unwrap().origin() {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };
        self.routes.lock().insert(
            url.to_string(),
            HttpResponse::new(url.to_string(), status, body).with_type(response_type),
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls_for(&self, url: &Url) -> usize {
        self.calls.lock().iter().filter(|c| *c == url.as_str()).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> OfflineResult<HttpResponse> {
        self.calls.lock().push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(OfflineError::Network {
                url: request.url.to_string(),
                message: "network unreachable".into(),
            });
        }
        Ok(self
            .routes
            .lock()
            .get(request.url.as_str())
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(request.url.to_string(), 404, "not found")))
    }
}

/// Storage whose writes always fail after `fail_writes` is set.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryCacheStorage,
    fail_writes: AtomicBool,
}

impl FlakyStorage {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl CacheStorage for FlakyStorage {
    fn open(&self, bucket: &str) -> OfflineResult<()> {
        self.inner.open(bucket)
    }

    fn put(&self, bucket: &str, request: &Request, response: &HttpResponse) -> OfflineResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(OfflineError::Storage {
                path: bucket.into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "quota exceeded"),
            });
        }
        self.inner.put(bucket, request, response)
    }

    fn match_in(&self, bucket: &str, request: &Request) -> OfflineResult<Option<HttpResponse>> {
        self.inner.match_in(bucket, request)
    }

    fn delete(&self, bucket: &str) -> OfflineResult<bool> {
        self.inner.delete(bucket)
    }

    fn keys(&self) -> OfflineResult<Vec<String>> {
        self.inner.keys()
    }

    fn entries(&self, bucket: &str) -> OfflineResult<Vec<String>> {
        self.inner.entries(bucket)
    }
}

/// Installed and activated manager over fresh memory storage.
pub async fn activated_manager(
    fetcher: &Arc<StubFetcher>,
) -> (OfflineCacheManager, Arc<MemoryCacheStorage>) {
    let storage = Arc::new(MemoryCacheStorage::new());
    let manager = OfflineCacheManager::new(settings("2.2.0"), storage.clone(), fetcher.clone());
    manager.install().await.unwrap();
    manager.activate().unwrap();
    (manager, storage)
}
