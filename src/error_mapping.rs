//! Maps service errors onto [`AppError`] for logging and the error banner.
//!
//! Both sides live in other crates, so these are functions rather than
//! `From` impls.

use skycast_core::{
    AppError, ConfigError, LocationError, NetworkError, StorageError, WeatherError,
};
use skycast_offline::OfflineError;
use skycast_prefs::PrefsError;
use skycast_weather::{LocationError as GeoError, LocationQuery, SyncError};

pub fn from_sync(e: SyncError) -> AppError {
    match e {
        SyncError::CityNotFound {
            query: query @ LocationQuery::Coordinates { .. },
            ..
        } => AppError::Weather(WeatherError::DataUnavailable(query.to_string())),
        SyncError::CityNotFound { query, .. } => {
            AppError::Weather(WeatherError::CityNotFound(query.to_string()))
        }
        SyncError::Location(GeoError::Denied(reason)) => {
            AppError::Location(LocationError::Denied(reason))
        }
        SyncError::Location(GeoError::Unavailable(reason)) => {
            AppError::Location(LocationError::Unavailable(reason))
        }
        SyncError::Location(GeoError::Timeout) => {
            AppError::Location(LocationError::Unavailable("timed out".into()))
        }
        SyncError::Network(s) => AppError::Network(NetworkError::ConnectionFailed(s)),
        SyncError::Parse(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        SyncError::MissingCredential => AppError::Weather(WeatherError::MissingApiKey),
        SyncError::EmptyQuery => AppError::Weather(WeatherError::InvalidQuery("empty".into())),
        SyncError::InvalidCoordinates { lat, lon } => {
            AppError::Weather(WeatherError::InvalidQuery(format!("{}, {}", lat, lon)))
        }
    }
}

pub fn from_offline(e: OfflineError) -> AppError {
    match e {
        OfflineError::Network { url, message } => {
            AppError::Network(NetworkError::ConnectionFailed(format!("{}: {}", url, message)))
        }
        OfflineError::Precache { url, status } => AppError::Network(NetworkError::ServerError {
            status,
            message: url,
        }),
        OfflineError::NoResponse { url } => AppError::Network(NetworkError::Offline(url)),
        OfflineError::InvalidUrl { input, source } => {
            AppError::Config(ConfigError::Invalid(format!("offline.origin '{}': {}", input, source)))
        }
        OfflineError::Storage { path, source } => AppError::Storage(StorageError::WriteFailed(
            format!("{}: {}", path.display(), source),
        )),
        OfflineError::Corrupted(e) => AppError::Storage(StorageError::Corruption(e.to_string())),
        e @ OfflineError::InvalidState { .. } => AppError::Other(anyhow::Error::new(e)),
    }
}

pub fn from_prefs(e: PrefsError) -> AppError {
    match e {
        PrefsError::Read { .. } => AppError::Storage(StorageError::ReadFailed(e.to_string())),
        PrefsError::Write { .. } => AppError::Storage(StorageError::WriteFailed(e.to_string())),
        PrefsError::Encode(_) => AppError::Storage(StorageError::Corruption(e.to_string())),
    }
}
