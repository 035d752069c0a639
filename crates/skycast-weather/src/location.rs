//! Geolocation seam.
//!
//! Desktop hosts have no browser geolocation, so the host picks an
//! implementation: fixed coordinates from config, or none at all.

use async_trait::async_trait;

use crate::types::LocationError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: Option<f64>,
}

/// Single "where am I" request. May be denied, unavailable or time out.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self) -> Result<Position, LocationError>;

    /// Whether this geolocator can ever produce a position
    fn is_available(&self) -> bool {
        true
    }
}

/// Always reports the same position.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    position: Position,
}

impl FixedGeolocator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: Position {
                latitude,
                longitude,
                accuracy_meters: None,
            },
        }
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self) -> Result<Position, LocationError> {
        Ok(self.position)
    }
}

/// No geolocation on this host.
#[derive(Debug, Clone, Default)]
pub struct UnavailableGeolocator;

#[async_trait]
impl Geolocator for UnavailableGeolocator {
    async fn current_position(&self) -> Result<Position, LocationError> {
        Err(LocationError::Unavailable(
            "Geolocation is not supported on this device".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }
}
