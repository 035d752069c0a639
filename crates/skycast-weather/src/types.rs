use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use skycast_prefs::{Coord, SavedLocation};

use crate::provider::LocationQuery;

/// Weather condition categories mapped from OpenWeather condition ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeather condition id to a category.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=299 => Self::Thunderstorm,
            300..=399 => Self::Drizzle,
            500 | 501 | 520 | 521 | 531 => Self::Rain,
            502..=504 | 522 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=699 => Self::Snow,
            700..=799 => Self::Fog, // Mist, haze, dust, etc.
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// The API's condition block (`weather[0]`) plus its category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionInfo {
    pub code: i32,
    pub category: WeatherCondition,
    pub main: String,
    pub description: String,
    /// OpenWeather icon code, e.g. `10d`
    pub icon: String,
}

/// Where a snapshot was observed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub coord: Coord,
}

impl LocationInfo {
    /// The shape stored in favorites and recent searches
    pub fn to_saved(&self) -> SavedLocation {
        SavedLocation {
            id: self.id,
            name: self.name.clone(),
            country: self.country.clone(),
            coord: self.coord,
        }
    }
}

/// Temperature fields. Stored in Celsius; see `units` for conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub current: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Wind {
    /// Meters per second
    pub speed: f64,
    pub direction_deg: Option<f64>,
    pub gust: Option<f64>,
}

/// A weather alert. The free API tier never returns any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub event: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Fields synthesized or marked unavailable because the API tier lacks them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Extras {
    /// Rain volume in the last hour, if reported
    pub rain_1h: Option<f64>,
    /// Rain volume in the next forecast slot, if reported
    pub rain_3h: Option<f64>,
    /// Single precipitation figure in mm
    pub precipitation_mm: f64,
    /// Always `None` on the free tier
    pub uv_index: Option<f64>,
    pub alerts: Vec<WeatherAlert>,
}

/// Current conditions view model. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub location: LocationInfo,
    pub observed_at: DateTime<Utc>,
    /// City offset from UTC in seconds
    pub timezone_offset: i32,
    pub temperature: Temperatures,
    pub condition: ConditionInfo,
    pub humidity: u8,
    /// hPa
    pub pressure: u32,
    pub wind: Wind,
    /// Meters
    pub visibility: Option<u32>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub extras: Extras,
}

/// One 3-hour forecast step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub at: DateTime<Utc>,
    pub temperature: Temperatures,
    pub condition: ConditionInfo,
    pub humidity: u8,
    pub wind: Wind,
    pub rain_3h: Option<f64>,
    /// Probability of precipitation, 0-100
    pub precipitation_chance: u8,
}

/// Ordered forecast points plus the city offset used to bucket them into days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: LocationInfo,
    /// City offset from UTC in seconds
    pub timezone_offset: i32,
    pub points: Vec<ForecastPoint>,
}

/// Geolocation failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied: {0}")]
    Denied(String),
    #[error("Location unavailable: {0}")]
    Unavailable(String),
    #[error("Location request timed out")]
    Timeout,
}

/// Synchronizer errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    /// Either endpoint answered with a non-2xx status
    #[error("City not found: {query} (HTTP {status})")]
    CityNotFound { query: LocationQuery, status: u16 },
    #[error("Location access denied: {0}")]
    Location(#[from] LocationError),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("No weather API key configured")]
    MissingCredential,
    #[error("Search term is empty")]
    EmptyQuery,
    #[error("Invalid coordinates: {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

impl SyncError {
    /// Message shown in the error banner
    pub fn user_message(&self) -> String {
        match self {
            Self::CityNotFound {
                query: LocationQuery::Coordinates { .. },
                ..
            } => "Weather data not available".to_string(),
            Self::CityNotFound { .. } => "City not found".to_string(),
            Self::Location(LocationError::Denied(reason)) => {
                format!("Location access denied: {}", reason)
            }
            Self::Location(LocationError::Unavailable(reason)) => {
                format!("Location unavailable: {}", reason)
            }
            Self::Location(LocationError::Timeout) => "Location request timed out".to_string(),
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Parse(_) => "Weather data not available".to_string(),
            Self::MissingCredential => "Weather API key is not configured".to_string(),
            Self::EmptyQuery => "Enter a city name".to_string(),
            Self::InvalidCoordinates { .. } => "Weather data not available".to_string(),
        }
    }

    /// Whether falling back to the default city could help
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, Self::MissingCredential)
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
