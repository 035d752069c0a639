//! Weather data synchronizer for Skycast.
//!
//! Fetches current conditions and the 5-day/3-hour forecast from the
//! OpenWeather API, derives the extras the free tier lacks, converts units
//! on demand, and keeps the data fresh on a timer.

pub mod api;
pub mod extras;
pub mod forecast;
pub mod location;
pub mod provider;
pub mod refresh;
pub mod retry;
pub mod sync;
pub mod types;
pub mod units;

pub use forecast::{ChartPoint, DayForecast};
pub use location::{FixedGeolocator, Geolocator, Position, UnavailableGeolocator};
pub use provider::{LocationQuery, WeatherBundle, WeatherProvider};
pub use refresh::{AutoRefresh, RefreshTarget};
pub use retry::RetryConfig;
pub use sync::{FetchOutcome, SyncSettings, WeatherSynchronizer, WeatherView};
pub use types::*;
pub use units::{celsius_to_fahrenheit, convert_temperature, fahrenheit_to_celsius};

pub use skycast_prefs::TemperatureUnit;
