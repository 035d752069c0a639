//! Temperature unit conversion.
//!
//! Everything is stored in Celsius. Views convert on read, so a unit change
//! never triggers a refetch.

use skycast_prefs::TemperatureUnit;

use crate::types::{ForecastPoint, ForecastSeries, Temperatures, WeatherSnapshot};

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a Celsius value into `unit`.
pub fn convert_temperature(celsius: f64, unit: TemperatureUnit) -> f64 {
    match unit {
        TemperatureUnit::Celsius => celsius,
        TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius),
    }
}

impl Temperatures {
    pub fn in_unit(&self, unit: TemperatureUnit) -> Self {
        Self {
            current: convert_temperature(self.current, unit),
            feels_like: convert_temperature(self.feels_like, unit),
            min: convert_temperature(self.min, unit),
            max: convert_temperature(self.max, unit),
        }
    }
}

impl WeatherSnapshot {
    pub fn in_unit(&self, unit: TemperatureUnit) -> Self {
        Self {
            temperature: self.temperature.in_unit(unit),
            ..self.clone()
        }
    }
}

impl ForecastSeries {
    pub fn in_unit(&self, unit: TemperatureUnit) -> Self {
        Self {
            city: self.city.clone(),
            timezone_offset: self.timezone_offset,
            points: self
                .points
                .iter()
                .map(|p| ForecastPoint {
                    temperature: p.temperature.in_unit(unit),
                    ..p.clone()
                })
                .collect(),
        }
    }
}
