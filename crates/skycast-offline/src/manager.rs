//! The offline cache manager: precache on install, prune on activate, and
//! answer intercepted fetches from network or cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::Method;

use crate::error::{OfflineError, OfflineResult};
use crate::fetcher::Fetcher;
use crate::lifecycle::{LifecycleState, OfflineSettings};
use crate::request::{HttpResponse, Request, ResponseType};
use crate::storage::CacheStorage;

/// How a request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Non-GET or cross-origin: straight to network, never cached
    Bypass,
    /// Navigations: network, cache as fallback
    NetworkFirst,
    /// Static assets: cache, network on miss
    CacheFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
}

/// A response plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: HttpResponse,
    pub source: ResponseSource,
}

impl Served {
    fn network(response: HttpResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    fn cache(response: HttpResponse) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }
}

pub struct OfflineCacheManager {
    settings: OfflineSettings,
    cache_name: String,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    skip_waiting: AtomicBool,
    controls_clients: AtomicBool,
}

impl std::fmt::Debug for OfflineCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineCacheManager")
            .field("cache_name", &self.cache_name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl OfflineCacheManager {
    pub fn new(
        settings: OfflineSettings,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let cache_name = settings.cache_name();
        Self {
            settings,
            cache_name,
            storage,
            fetcher,
            state: RwLock::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
            controls_clients: AtomicBool::new(false),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Whether this version has taken control of open clients
    pub fn controls_clients(&self) -> bool {
        self.controls_clients.load(Ordering::SeqCst)
    }

    /// Request activation without waiting for the current version to go away.
    pub fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    pub fn wants_skip_waiting(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_redundant(&self) {
        *self.state.write() = LifecycleState::Redundant;
        self.controls_clients.store(false, Ordering::SeqCst);
        tracing::info!("Cache version {} is now redundant", self.cache_name);
    }

    fn transition(
        &self,
        operation: &'static str,
        from: LifecycleState,
        to: LifecycleState,
    ) -> OfflineResult<()> {
        let mut state = self.state.write();
        if *state != from {
            return Err(OfflineError::InvalidState {
                operation,
                state: *state,
            });
        }
        *state = to;
        Ok(())
    }

    // ===== Install =====

    /// Fetch and store every precache asset. All or nothing: a single failed
    /// asset fails the install and leaves the version redundant.
    ///
    /// # Errors
    /// Fails if called out of order, if any asset cannot be fetched with a
    /// 2xx status, or if storage fails.
    pub async fn install(&self) -> OfflineResult<()> {
        self.transition("install", LifecycleState::Parsed, LifecycleState::Installing)?;

        match self.precache().await {
            Ok(count) => {
                *self.state.write() = LifecycleState::Installed;
                if self.settings.skip_waiting {
                    self.skip_waiting();
                }
                tracing::info!("Installed {} ({} assets precached)", self.cache_name, count);
                Ok(())
            }
            Err(e) => {
                *self.state.write() = LifecycleState::Redundant;
                tracing::error!("Install of {} failed: {}", self.cache_name, e);
                Err(e)
            }
        }
    }

    fn precache_requests(&self) -> OfflineResult<Vec<Request>> {
        self.settings
            .precache
            .iter()
            .map(|path| {
                self.settings
                    .origin
                    .join(path)
                    .map(Request::get)
                    .map_err(|source| OfflineError::InvalidUrl {
                        input: path.clone(),
                        source,
                    })
            })
            .collect()
    }

    async fn precache(&self) -> OfflineResult<usize> {
        let requests = self.precache_requests()?;
        let mut fetched = Vec::with_capacity(requests.len());

        for request in requests {
            let response = self.fetcher.fetch(&request).await?;
            if !response.is_success() {
                return Err(OfflineError::Precache {
                    url: request.url.to_string(),
                    status: response.status,
                });
            }
            fetched.push((request, response));
        }

        self.storage.open(&self.cache_name)?;
        for (request, response) in &fetched {
            if let Err(e) = self.storage.put(&self.cache_name, request, response) {
                if let Err(cleanup) = self.storage.delete(&self.cache_name) {
                    tracing::warn!(
                        "Failed to remove partial cache {}: {}",
                        self.cache_name,
                        cleanup
                    );
                }
                return Err(e);
            }
        }
        Ok(fetched.len())
    }

    /// Take over this version's bucket left by an earlier run, without
    /// touching the network. Activates and returns `true` when every
    /// precache asset is already stored; otherwise stays parsed and
    /// returns `false` so the caller can install.
    ///
    /// # Errors
    /// Fails if called after install started, or if storage fails.
    pub fn resume(&self) -> OfflineResult<bool> {
        let state = self.state();
        if state != LifecycleState::Parsed {
            return Err(OfflineError::InvalidState {
                operation: "resume",
                state,
            });
        }

        if !self.storage.keys()?.contains(&self.cache_name) {
            return Ok(false);
        }
        for request in self.precache_requests()? {
            if self.storage.match_in(&self.cache_name, &request)?.is_none() {
                tracing::debug!("{} lacks {}, install needed", self.cache_name, request.url);
                return Ok(false);
            }
        }

        self.transition("resume", LifecycleState::Parsed, LifecycleState::Installed)?;
        tracing::info!("Resuming cached version {}", self.cache_name);
        self.activate()?;
        Ok(true)
    }

    // ===== Activate =====

    /// Delete every bucket except this version's, then take control of
    /// open clients. Returns the deleted bucket names.
    ///
    /// # Errors
    /// Fails if called before install completed, or if storage fails; the
    /// version stays installed and activation can be retried.
    pub fn activate(&self) -> OfflineResult<Vec<String>> {
        self.transition("activate", LifecycleState::Installed, LifecycleState::Activating)?;

        match self.delete_stale_buckets() {
            Ok(deleted) => {
                *self.state.write() = LifecycleState::Activated;
                self.controls_clients.store(true, Ordering::SeqCst);
                tracing::info!(
                    "Activated {}, removed {} old cache(s)",
                    self.cache_name,
                    deleted.len()
                );
                Ok(deleted)
            }
            Err(e) => {
                *self.state.write() = LifecycleState::Installed;
                tracing::error!("Activation of {} failed: {}", self.cache_name, e);
                Err(e)
            }
        }
    }

    fn delete_stale_buckets(&self) -> OfflineResult<Vec<String>> {
        let mut deleted = Vec::new();
        for bucket in self.storage.keys()? {
            if bucket != self.cache_name {
                self.storage.delete(&bucket)?;
                tracing::debug!("Deleted old cache {}", bucket);
                deleted.push(bucket);
            }
        }
        Ok(deleted)
    }

    // ===== Fetch =====

    pub fn strategy_for(&self, request: &Request) -> Strategy {
        if request.method != Method::GET || request.url.origin() != self.settings.origin.origin() {
            Strategy::Bypass
        } else if request.is_navigation() {
            Strategy::NetworkFirst
        } else {
            Strategy::CacheFirst
        }
    }

    /// Answer an intercepted request.
    ///
    /// # Errors
    /// Fails only when the network is unreachable and the cache has nothing
    /// usable. Cache write failures are logged, never returned.
    pub async fn handle_fetch(&self, request: &Request) -> OfflineResult<Served> {
        match self.strategy_for(request) {
            Strategy::Bypass => Ok(Served::network(self.fetcher.fetch(request).await?)),
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::CacheFirst => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: &Request) -> OfflineResult<Served> {
        let error = match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store(request, &response);
                }
                return Ok(Served::network(response));
            }
            Err(e) => e,
        };

        tracing::debug!("Navigation to {} failed, trying cache: {}", request.url, error);
        if let Some(cached) = self.lookup(request) {
            return Ok(Served::cache(cached));
        }

        let root = self
            .settings
            .origin
            .join("/")
            .map_err(|source| OfflineError::InvalidUrl {
                input: "/".to_string(),
                source,
            })?;
        if let Some(shell) = self.lookup(&Request::navigate(root)) {
            tracing::debug!("Serving cached root document for {}", request.url);
            return Ok(Served::cache(shell));
        }

        Err(OfflineError::NoResponse {
            url: request.url.to_string(),
        })
    }

    async fn cache_first(&self, request: &Request) -> OfflineResult<Served> {
        if let Some(cached) = self.lookup(request) {
            tracing::debug!("Cache hit: {}", request.url);
            return Ok(Served::cache(cached));
        }

        tracing::debug!("Cache miss: {}", request.url);
        let response = self.fetcher.fetch(request).await?;
        if response.status == 200 && response.response_type == ResponseType::Basic {
            self.store(request, &response);
        }
        Ok(Served::network(response))
    }

    fn lookup(&self, request: &Request) -> Option<HttpResponse> {
        match self.storage.match_any(request) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Cache lookup for {} failed: {}", request.url, e);
                None
            }
        }
    }

    fn store(&self, request: &Request, response: &HttpResponse) {
        if let Err(e) = self.storage.put(&self.cache_name, request, response) {
            tracing::warn!("Failed to cache {}: {}", request.url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryCacheStorage;
    use async_trait::async_trait;
    use url::Url;

    struct NoNetwork;

    #[async_trait]
    impl Fetcher for NoNetwork {
        async fn fetch(&self, request: &Request) -> OfflineResult<HttpResponse> {
            Err(OfflineError::Network {
                url: request.url.to_string(),
                message: "offline".into(),
            })
        }
    }

    fn manager() -> OfflineCacheManager {
        OfflineCacheManager::new(
            OfflineSettings::new(Url::parse("https://weather.example/").unwrap()),
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(NoNetwork),
        )
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_strategy_selection() {
        let m = manager();
        assert_eq!(m.strategy_for(&Request::navigate(url("https://weather.example/"))), Strategy::NetworkFirst);
        assert_eq!(m.strategy_for(&Request::get(url("https://weather.example/logo192.png"))), Strategy::CacheFirst);
        assert_eq!(
            m.strategy_for(&Request::get(url("https://weather.example/api")).with_method(Method::POST)),
            Strategy::Bypass
        );
        assert_eq!(
            m.strategy_for(&Request::get(url("https://api.openweathermap.org/data/2.5/weather?q=London"))),
            Strategy::Bypass
        );
        // Same host, different scheme is another origin
        assert_eq!(m.strategy_for(&Request::get(url("http://weather.example/a.js"))), Strategy::Bypass);
    }

    #[test]
    fn test_activate_before_install_is_rejected() {
        let m = manager();
        let err = m.activate().unwrap_err();
        assert!(matches!(
            err,
            OfflineError::InvalidState {
                state: LifecycleState::Parsed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_failed_install_is_redundant() {
        let m = manager();
        assert!(m.install().await.is_err());
        assert_eq!(m.state(), LifecycleState::Redundant);
        assert!(m.install().await.is_err());
    }

    #[tokio::test]
    async fn test_offline_with_empty_cache_has_no_response() {
        let m = manager();
        let err = m
            .handle_fetch(&Request::navigate(url("https://weather.example/")))
            .await
            .unwrap_err();
        assert!(matches!(err, OfflineError::NoResponse { .. }));
    }
}
