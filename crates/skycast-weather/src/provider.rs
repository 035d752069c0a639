//! OpenWeather HTTP client.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::api::{CurrentResponse, ForecastResponse};
use crate::retry::{with_retry, RetryConfig};
use crate::types::{ForecastSeries, SyncError, WeatherSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// What to fetch weather for
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    PlaceName(String),
    Coordinates { lat: f64, lon: f64 },
}

impl LocationQuery {
    fn params(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let mut params = match self {
            Self::PlaceName(name) => vec![("q", name.clone())],
            Self::Coordinates { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        };
        params.push(("appid", api_key.to_string()));
        params.push(("units", "metric".to_string()));
        params
    }
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlaceName(name) => write!(f, "{}", name),
            Self::Coordinates { lat, lon } => write!(f, "{:.4},{:.4}", lat, lon),
        }
    }
}

/// Current conditions and forecast from one fetch
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherBundle {
    pub snapshot: WeatherSnapshot,
    pub forecast: ForecastSeries,
}

#[derive(Clone)]
pub struct WeatherProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    retry: RetryConfig,
}

impl fmt::Debug for WeatherProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherProvider")
            .field("base_url", &self.base_url)
            .field("has_credential", &self.has_credential())
            .finish()
    }
}

impl WeatherProvider {
    /// Blank keys count as missing.
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fetch current conditions and forecast concurrently.
    ///
    /// Both requests must succeed; nothing partial is returned. When both
    /// fail, a bad status is reported ahead of transport or body errors.
    #[instrument(skip_all, fields(query = %query))]
    pub async fn fetch(&self, query: &LocationQuery) -> Result<WeatherBundle, SyncError> {
        let api_key = self.api_key.as_deref().ok_or(SyncError::MissingCredential)?;
        let params = query.params(api_key);

        let (current, forecast) = match tokio::join!(
            self.get_json::<CurrentResponse>("weather", &params, query),
            self.get_json::<ForecastResponse>("forecast", &params, query),
        ) {
            (Ok(current), Ok(forecast)) => (current, forecast),
            (Err(a), Err(b)) => return Err(more_telling(a, b)),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => return Err(e),
        };

        let snapshot = current.into_snapshot(&forecast);
        let forecast = forecast.into_series();
        tracing::debug!(
            "Fetched {} with {} forecast points",
            snapshot.location.name,
            forecast.points.len()
        );

        Ok(WeatherBundle { snapshot, forecast })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
        query: &LocationQuery,
    ) -> Result<T, SyncError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = with_retry(&self.retry, || self.client.get(&url).query(params).send()).await?;

        // Retryable statuses have already been retried
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("{} returned HTTP {}", endpoint, status);
            return Err(SyncError::CityNotFound {
                query: query.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Pick which of two failures to report: status, then transport, then body.
fn more_telling(a: SyncError, b: SyncError) -> SyncError {
    fn rank(e: &SyncError) -> u8 {
        match e {
            SyncError::CityNotFound { .. } => 0,
            SyncError::Network(_) => 1,
            _ => 2,
        }
    }
    if rank(&b) < rank(&a) {
        b
    } else {
        a
    }
}
