//! Extras the free API tier does not provide directly.
//!
//! UV index and alerts need the paid One Call API, so they are reported as
//! unavailable. Precipitation prefers the current hour's rain and falls back
//! to the first forecast slot's 3-hour volume.

use crate::api::{CurrentResponse, ForecastResponse};
use crate::types::Extras;

pub fn build_free_extras(current: &CurrentResponse, forecast: &ForecastResponse) -> Extras {
    let rain_1h = current.rain.as_ref().and_then(|r| r.one_hour);
    let rain_3h = forecast
        .list
        .first()
        .and_then(|slot| slot.rain.as_ref())
        .and_then(|r| r.three_hours);

    Extras {
        rain_1h,
        rain_3h,
        precipitation_mm: rain_1h.or(rain_3h).unwrap_or(0.0),
        uv_index: None,
        alerts: Vec::new(),
    }
}
