//! Weather synchronizer: owns the current snapshot and forecast, runs fetches,
//! and records the outcome for views to read.
//!
//! Every fetch takes a generation number. A result is applied only if no
//! newer fetch has started since, so a slow auto-refresh can never overwrite
//! a fresher manual search.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use parking_lot::RwLock;
use skycast_prefs::{Preferences, TemperatureUnit};
use tokio::sync::watch;

use crate::location::Geolocator;
use crate::provider::{LocationQuery, WeatherBundle, WeatherProvider};
use crate::refresh::RefreshTarget;
use crate::types::{ForecastSeries, SyncError, WeatherSnapshot};

pub const DEFAULT_CITY: &str = "London";
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Shown when nothing else is known, and the first-load fallback
    pub default_city: String,
    pub refresh_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_city: DEFAULT_CITY.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// What happened to a fetch that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The result is now the current snapshot
    Applied,
    /// A newer fetch started before this one finished; the result was dropped
    Superseded,
}

/// Everything a dashboard needs, temperatures already in the active unit
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub snapshot: Option<WeatherSnapshot>,
    pub forecast: Option<ForecastSeries>,
    pub unit: TemperatureUnit,
    pub loading: bool,
    pub error: Option<String>,
    pub city: String,
    pub use_geolocation: bool,
    /// Local time of the last applied fetch, `HH:MM`
    pub last_updated: Option<String>,
    pub is_offline: bool,
}

#[derive(Debug, Default)]
struct SyncState {
    snapshot: Option<WeatherSnapshot>,
    forecast: Option<ForecastSeries>,
    error: Option<String>,
    city: String,
    use_geolocation: bool,
    last_updated: Option<DateTime<Local>>,
    is_offline: bool,
}

struct Inner {
    provider: WeatherProvider,
    geolocator: Arc<dyn Geolocator>,
    prefs: Preferences,
    settings: SyncSettings,
    state: RwLock<SyncState>,
    generation: AtomicU64,
    in_flight: AtomicUsize,
    first_load: AtomicBool,
    target: watch::Sender<RefreshTarget>,
}

/// Keeps `loading` set while alive; dropping it on any path clears it.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WeatherSynchronizer {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WeatherSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherSynchronizer")
            .field("provider", &self.inner.provider)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl WeatherSynchronizer {
    pub fn new(
        provider: WeatherProvider,
        geolocator: Arc<dyn Geolocator>,
        prefs: Preferences,
        settings: SyncSettings,
    ) -> Self {
        let city = prefs
            .last_city()
            .unwrap_or_else(|| settings.default_city.clone());
        let (target, _) = watch::channel(RefreshTarget::Idle);

        Self {
            inner: Arc::new(Inner {
                provider,
                geolocator,
                prefs,
                settings,
                state: RwLock::new(SyncState {
                    city,
                    ..SyncState::default()
                }),
                generation: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                first_load: AtomicBool::new(true),
                target,
            }),
        }
    }

    // ===== Fetch operations =====

    /// Fetch by city name. Leading and trailing whitespace is ignored.
    ///
    /// # Errors
    /// `EmptyQuery` for a blank name (no request is made), `MissingCredential`
    /// without an API key, otherwise whatever the provider reports.
    pub async fn fetch_by_place_name(&self, name: &str) -> Result<FetchOutcome, SyncError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SyncError::EmptyQuery);
        }

        self.run(
            LocationQuery::PlaceName(name.to_string()),
            RefreshTarget::PlaceName(name.to_string()),
        )
        .await
    }

    /// Fetch by coordinates. During the first load a failure falls back to
    /// the default city.
    pub async fn fetch_by_coordinates(&self, lat: f64, lon: f64) -> Result<FetchOutcome, SyncError> {
        self.fetch_coordinates(lat, lon, RefreshTarget::Coordinates { lat, lon })
            .await
    }

    /// Ask the geolocator where we are, then fetch by coordinates.
    pub async fn fetch_current_location(&self) -> Result<FetchOutcome, SyncError> {
        match self.inner.geolocator.current_position().await {
            Ok(pos) => {
                tracing::info!("Got location: {}, {}", pos.latitude, pos.longitude);
                self.fetch_coordinates(pos.latitude, pos.longitude, RefreshTarget::CurrentLocation)
                    .await
            }
            Err(e) => {
                let err = SyncError::from(e);
                tracing::warn!("Geolocation failed: {}", err);
                self.record_error(&err);
                if self.is_first_load() {
                    return self.fetch_default_city().await;
                }
                Err(err)
            }
        }
    }

    /// First activation: geolocation if the user opted in, otherwise the last
    /// city (or the default one).
    pub async fn initial_load(&self) -> Result<FetchOutcome, SyncError> {
        let result = if self.inner.prefs.use_geolocation() {
            self.fetch_current_location().await
        } else {
            let city = self
                .inner
                .prefs
                .last_city()
                .unwrap_or_else(|| self.inner.settings.default_city.clone());
            self.fetch_by_place_name(&city).await
        };

        self.inner.first_load.store(false, Ordering::SeqCst);
        result
    }

    /// Re-run the fetch that produced the current snapshot.
    ///
    /// Returns `None` when there is nothing to refresh yet.
    pub async fn refresh(&self) -> Option<Result<FetchOutcome, SyncError>> {
        if !self.has_snapshot() {
            return None;
        }

        let target = self.inner.target.borrow().clone();
        let result = match target {
            RefreshTarget::Idle => return None,
            RefreshTarget::PlaceName(name) => self.fetch_by_place_name(&name).await,
            RefreshTarget::Coordinates { lat, lon } => self.fetch_by_coordinates(lat, lon).await,
            RefreshTarget::CurrentLocation => self.fetch_current_location().await,
        };
        Some(result)
    }

    async fn fetch_default_city(&self) -> Result<FetchOutcome, SyncError> {
        let city = self.inner.settings.default_city.clone();
        tracing::info!("Falling back to default city {}", city);
        self.fetch_by_place_name(&city).await
    }

    async fn fetch_coordinates(
        &self,
        lat: f64,
        lon: f64,
        target: RefreshTarget,
    ) -> Result<FetchOutcome, SyncError> {
        let result = if valid_coordinates(lat, lon) {
            self.run(LocationQuery::Coordinates { lat, lon }, target).await
        } else {
            let err = SyncError::InvalidCoordinates { lat, lon };
            self.record_error(&err);
            Err(err)
        };

        match result {
            Err(e) if e.allows_fallback() && self.is_first_load() => {
                tracing::warn!("Coordinate fetch failed on first load: {}", e);
                self.fetch_default_city().await
            }
            other => other,
        }
    }

    async fn run(&self, query: LocationQuery, target: RefreshTarget) -> Result<FetchOutcome, SyncError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _loading = LoadingGuard::new(&self.inner.in_flight);
        self.inner.state.write().error = None;

        let result = self.inner.provider.fetch(&query).await;

        match result {
            Ok(bundle) => {
                if self.apply(generation, &query, target, bundle) {
                    Ok(FetchOutcome::Applied)
                } else {
                    tracing::debug!("Discarding superseded result for {}", query);
                    Ok(FetchOutcome::Superseded)
                }
            }
            Err(e) => {
                if !self.is_current(generation) {
                    tracing::debug!("Discarding superseded failure for {}: {}", query, e);
                    return Ok(FetchOutcome::Superseded);
                }
                tracing::error!("Weather fetch for {} failed: {}", query, e);
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn apply(
        &self,
        generation: u64,
        query: &LocationQuery,
        target: RefreshTarget,
        bundle: WeatherBundle,
    ) -> bool {
        let city = match query {
            LocationQuery::PlaceName(name) => name.clone(),
            LocationQuery::Coordinates { .. } => bundle.snapshot.location.name.clone(),
        };
        let saved = bundle.snapshot.location.to_saved();

        {
            let mut state = self.inner.state.write();
            if !self.is_current(generation) {
                return false;
            }
            state.snapshot = Some(bundle.snapshot);
            state.forecast = Some(bundle.forecast);
            state.city = city.clone();
            state.use_geolocation = !matches!(target, RefreshTarget::PlaceName(_));
            state.last_updated = Some(Local::now());
            state.error = None;
        }
        self.inner.first_load.store(false, Ordering::SeqCst);
        tracing::info!("Weather updated for {}", city);

        if let Err(e) = self.inner.prefs.set_last_city(&city) {
            tracing::warn!("Failed to save last city: {}", e);
        }
        if let Err(e) = self.inner.prefs.add_recent_search(saved) {
            tracing::warn!("Failed to save recent search: {}", e);
        }

        self.inner.target.send_if_modified(|current| {
            if *current == target {
                false
            } else {
                *current = target;
                true
            }
        });
        true
    }

    fn record_error(&self, err: &SyncError) {
        self.inner.state.write().error = Some(err.user_message());
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    fn is_first_load(&self) -> bool {
        self.inner.first_load.load(Ordering::SeqCst)
    }

    // ===== Connectivity =====

    /// Report a connectivity change from the host.
    pub fn set_online(&self, online: bool) {
        let mut state = self.inner.state.write();
        if state.is_offline == online {
            tracing::info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
        state.is_offline = !online;
    }

    // ===== Accessors =====

    /// Current state with temperatures in the active unit.
    ///
    /// The unit is read on every call, so changing it never refetches.
    pub fn view(&self) -> WeatherView {
        let unit = self.inner.prefs.unit();
        let loading = self.is_loading();
        let state = self.inner.state.read();

        WeatherView {
            snapshot: state.snapshot.as_ref().map(|s| s.in_unit(unit)),
            forecast: state.forecast.as_ref().map(|f| f.in_unit(unit)),
            unit,
            loading,
            error: state.error.clone(),
            city: state.city.clone(),
            use_geolocation: state.use_geolocation,
            last_updated: state.last_updated.map(|t| t.format("%H:%M").to_string()),
            is_offline: state.is_offline,
        }
    }

    /// Raw snapshot, Celsius
    pub fn snapshot(&self) -> Option<WeatherSnapshot> {
        self.inner.state.read().snapshot.clone()
    }

    /// Raw forecast, Celsius
    pub fn forecast(&self) -> Option<ForecastSeries> {
        self.inner.state.read().forecast.clone()
    }

    pub fn has_snapshot(&self) -> bool {
        self.inner.state.read().snapshot.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.read().error.clone()
    }

    pub fn city(&self) -> String {
        self.inner.state.read().city.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn is_offline(&self) -> bool {
        self.inner.state.read().is_offline
    }

    pub fn preferences(&self) -> &Preferences {
        &self.inner.prefs
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    /// What auto-refresh should re-fetch. Changes whenever a fetch with a
    /// different target is applied.
    pub fn subscribe_target(&self) -> watch::Receiver<RefreshTarget> {
        self.inner.target.subscribe()
    }
}

fn valid_coordinates(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}
