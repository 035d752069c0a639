mod error_mapping;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skycast_core::{Config, OfflineConfig};
use skycast_offline::{
    DiskCacheStorage, OfflineCacheManager, OfflineError, OfflineSettings, Registration,
    ReqwestFetcher,
};
use skycast_prefs::{FileStore, KeyValueStore, MemoryStore, Preferences};
use skycast_weather::{
    FixedGeolocator, Geolocator, SyncSettings, UnavailableGeolocator, WeatherProvider,
    WeatherSynchronizer, WeatherView,
};
use url::Url;

#[tokio::main]
async fn main() -> Result<()> {
    skycast_core::init()?;

    let (config, _) = Config::load_validated()?;
    let timeout = Duration::from_secs(config.weather.request_timeout_secs);

    // The dashboard works without the offline cache
    let registration = match start_offline_cache(&config.offline, timeout).await {
        Ok(registration) => Some(registration),
        Err(e) => {
            let err = error_mapping::from_offline(e);
            tracing::warn!("Offline cache unavailable: {}", err);
            println!("! {}", err.user_message());
            None
        }
    };
    if let Some(active) = registration.as_ref().and_then(Registration::active) {
        tracing::info!("Offline cache {} is active", active.cache_name());
    }

    let sync = build_synchronizer(&config)?;

    let result = match std::env::args().nth(1) {
        Some(city) => sync.fetch_by_place_name(&city).await,
        None => sync.initial_load().await,
    };
    if let Err(e) = result {
        let err = error_mapping::from_sync(e);
        tracing::warn!("Weather fetch failed: {}", err);
        // Blank searches are not recorded in the view's banner
        if sync.error().is_none() {
            println!("! {}", err.user_message());
        }
    }

    print_view(&sync.view());

    let refresh = skycast_weather::AutoRefresh::spawn(sync.clone(), sync.settings().refresh_interval);
    if refresh.is_running() {
        println!("\nRefreshing every {} min. Press Ctrl+C to exit.", config.weather.refresh_minutes);
    } else {
        println!("\nAuto-refresh disabled. Press Ctrl+C to exit.");
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    refresh.shutdown().await;
    tracing::info!("Skycast stopped");
    Ok(())
}

fn build_synchronizer(config: &Config) -> Result<WeatherSynchronizer> {
    let store: Arc<dyn KeyValueStore> = match FileStore::open(config.preferences_path()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            let err = error_mapping::from_prefs(e);
            tracing::warn!("{}; preferences will not persist", err);
            println!("! {}", err.user_message());
            Arc::new(MemoryStore::new())
        }
    };

    let provider = WeatherProvider::new(
        config.weather.effective_api_key(),
        Duration::from_secs(config.weather.request_timeout_secs),
    )
    .map_err(error_mapping::from_sync)?
    .with_base_url(config.weather.api_base_url.clone());

    let geolocator: Arc<dyn Geolocator> = match config.location.coordinates() {
        Some((lat, lon)) => Arc::new(FixedGeolocator::new(lat, lon)),
        None => Arc::new(UnavailableGeolocator),
    };

    let settings = SyncSettings {
        default_city: config.weather.default_city.clone(),
        refresh_interval: Duration::from_secs(u64::from(config.weather.refresh_minutes) * 60),
    };

    Ok(WeatherSynchronizer::new(
        provider,
        geolocator,
        Preferences::new(store),
        settings,
    ))
}

async fn start_offline_cache(
    config: &OfflineConfig,
    timeout: Duration,
) -> Result<Registration, OfflineError> {
    let origin = Url::parse(&config.origin).map_err(|source| OfflineError::InvalidUrl {
        input: config.origin.clone(),
        source,
    })?;

    let storage = Arc::new(DiskCacheStorage::new(config.resolved_cache_dir())?);
    let fetcher = Arc::new(ReqwestFetcher::new(&origin, timeout)?);
    let settings = OfflineSettings {
        cache_prefix: config.cache_prefix.clone(),
        ..OfflineSettings::new(origin)
    }
    .with_version(config.version.clone())
    .with_precache(config.precache.clone());

    // Same version already stored by an earlier run: no network needed
    let registration = Registration::new(fetcher.clone());
    let stored = OfflineCacheManager::new(settings.clone(), storage.clone(), fetcher.clone());
    match registration.resume(stored) {
        Ok(true) => return Ok(registration),
        Ok(false) => {}
        Err(e) => tracing::warn!("Stored offline cache unusable, reinstalling: {}", e),
    }

    registration
        .register(OfflineCacheManager::new(settings, storage, fetcher))
        .await?;
    Ok(registration)
}

fn print_view(view: &WeatherView) {
    let unit = view.unit.symbol();

    if let Some(error) = &view.error {
        println!("! {}", error);
    }

    let Some(current) = &view.snapshot else {
        println!("No weather data for {}", view.city);
        return;
    };

    println!(
        "{}, {}  {:.0}°{} (feels like {:.0}°{})",
        current.location.name,
        current.location.country,
        current.temperature.current,
        unit,
        current.temperature.feels_like,
        unit
    );
    println!(
        "  {}  humidity {}%  wind {:.1} m/s  pressure {} hPa",
        current.condition.description, current.humidity, current.wind.speed, current.pressure
    );
    if let Some(updated) = &view.last_updated {
        println!("  updated {}{}", updated, if view.is_offline { " (offline)" } else { "" });
    }

    let Some(forecast) = &view.forecast else {
        return;
    };

    println!("\n5-day forecast");
    for point in forecast.daily_overview() {
        println!(
            "  {}  {:>4.0}°{}  {}",
            forecast.local_date(point.at).format("%a %d %b"),
            point.temperature.current,
            unit,
            point.condition.description
        );
    }

    println!("\nNext 24 hours");
    for point in forecast.chart_points() {
        println!(
            "  {}  {:>3}°{} (feels {}°{})",
            point.local_time, point.temperature, unit, point.feels_like, unit
        );
    }
}
