//! Centralized error types for Skycast.
//!
//! Every service error maps into [`AppError`], and every variant carries a
//! short, non-technical `user_message()` for the error banner. The `Display`
//! output keeps the full context for logs.

use thiserror::Error;

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Weather service error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Location(e) => e.user_message(),
            AppError::Storage(e) => e.user_message(),
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Offline and no cached copy available: {0}")]
    Offline(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
            NetworkError::Offline(_) => "You are currently offline. Some features may be limited.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
        }
    }
}

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("No weather data for {0}")]
    DataUnavailable(String),

    #[error("No weather API key configured")]
    MissingApiKey,

    #[error("Invalid search: {0}")]
    InvalidQuery(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::CityNotFound(_) => "City not found. Check the spelling and try again.",
            WeatherError::DataUnavailable(_) => "Weather data not available.",
            WeatherError::MissingApiKey => "Weather API key is missing. Check settings.",
            WeatherError::InvalidQuery(_) => "Enter a city name to search.",
        }
    }
}

/// Geolocation errors.
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Location permission denied: {0}")]
    Denied(String),

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::Denied(_) => "Location access denied. Showing the default city.",
            LocationError::Unavailable(_) => "Your location is unavailable. Search for a city instead.",
        }
    }
}

/// Local storage errors (preferences file, offline cache directory).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage read failed: {0}")]
    ReadFailed(String),

    #[error("Storage write failed: {0}")]
    WriteFailed(String),

    #[error("Stored data is corrupted: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StorageError::ReadFailed(_) => "Unable to read saved settings.",
            StorageError::WriteFailed(_) => "Failed to save settings. Please try again.",
            StorageError::Corruption(_) => "Saved settings were corrupted and have been reset.",
        }
    }
}
