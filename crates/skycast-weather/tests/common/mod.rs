//! Shared helpers for synchronizer integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use skycast_prefs::{MemoryStore, Preferences};
use skycast_weather::{
    Geolocator, LocationError, Position, RetryConfig, SyncSettings, UnavailableGeolocator,
    WeatherProvider, WeatherSynchronizer,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Current conditions payload as OpenWeather returns it
pub fn current_json(id: i64, name: &str, temp: f64) -> Value {
    json!({
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 802, "main": "Clouds", "description": "scattered clouds", "icon": "03d"}],
        "main": {"temp": temp, "feels_like": temp - 1.0, "temp_min": temp - 2.0,
                 "temp_max": temp + 2.0, "pressure": 1015, "humidity": 76},
        "visibility": 10000,
        "wind": {"speed": 3.6, "deg": 240},
        "dt": 1_700_000_000,
        "sys": {"country": "GB", "sunrise": 1_699_946_000, "sunset": 1_699_979_000},
        "timezone": 0,
        "id": id,
        "name": name,
        "cod": 200
    })
}

/// 5-day/3-hour forecast payload with `points` entries
pub fn forecast_json(id: i64, name: &str, points: usize) -> Value {
    let list: Vec<Value> = (0..points)
        .map(|i| {
            json!({
                "dt": 1_700_006_400 + (i as i64) * 10_800,
                "main": {"temp": 10.0, "feels_like": 9.0, "temp_min": 8.0, "temp_max": 12.0,
                         "pressure": 1012, "humidity": 70},
                "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
                "wind": {"speed": 4.0, "deg": 180},
                "pop": 0.4
            })
        })
        .collect();

    json!({
        "cod": "200",
        "cnt": points,
        "list": list,
        "city": {"id": id, "name": name, "coord": {"lat": 51.5085, "lon": -0.1257},
                 "country": "GB", "timezone": 0}
    })
}

/// Serve both endpoints for `q=<name>`, optionally delayed.
pub async fn mount_city(server: &MockServer, id: i64, name: &str, temp: f64, delay: Option<Duration>) {
    let mut current = ResponseTemplate::new(200).set_body_json(current_json(id, name, temp));
    let mut forecast = ResponseTemplate::new(200).set_body_json(forecast_json(id, name, 40));
    if let Some(delay) = delay {
        current = current.set_delay(delay);
        forecast = forecast.set_delay(delay);
    }

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", name))
        .respond_with(current)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", name))
        .respond_with(forecast)
        .mount(server)
        .await;
}

/// Count requests the server received for `endpoint` (`/weather` or `/forecast`).
pub async fn request_count(server: &MockServer, endpoint: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .count()
}

/// Geolocator that always refuses
pub struct DeniedGeolocator;

#[async_trait]
impl Geolocator for DeniedGeolocator {
    async fn current_position(&self) -> Result<Position, LocationError> {
        Err(LocationError::Denied("User denied Geolocation".into()))
    }
}

pub fn provider(server: &MockServer) -> WeatherProvider {
    WeatherProvider::new(Some("test-key".into()), Duration::from_secs(5))
        .unwrap()
        .with_base_url(server.uri())
        .with_retry(RetryConfig::none())
}

pub fn synchronizer(server: &MockServer, prefs: &Preferences) -> WeatherSynchronizer {
    synchronizer_with(server, prefs, Arc::new(UnavailableGeolocator))
}

pub fn synchronizer_with(
    server: &MockServer,
    prefs: &Preferences,
    geolocator: Arc<dyn Geolocator>,
) -> WeatherSynchronizer {
    WeatherSynchronizer::new(provider(server), geolocator, prefs.clone(), SyncSettings::default())
}

pub fn memory_prefs() -> Preferences {
    Preferences::new(Arc::new(MemoryStore::new()))
}
