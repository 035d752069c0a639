//! OpenWeather response payloads and their conversion into view models.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use skycast_prefs::Coord;

use crate::extras::build_free_extras;
use crate::types::{
    ConditionInfo, ForecastPoint, ForecastSeries, LocationInfo, Temperatures, WeatherCondition,
    WeatherSnapshot, Wind,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCondition {
    pub id: i32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    #[serde(default)]
    pub pressure: u32,
    #[serde(default)]
    pub humidity: u8,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiWind {
    #[serde(default)]
    pub speed: f64,
    pub deg: Option<f64>,
    pub gust: Option<f64>,
}

/// Rain volume in mm over the last hour / three hours
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiRain {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h")]
    pub three_hours: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiSys {
    pub country: Option<String>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// `GET /weather`
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub id: i64,
    pub name: String,
    pub coord: ApiCoord,
    pub dt: i64,
    #[serde(default)]
    pub timezone: i32,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
    pub main: ApiMain,
    pub visibility: Option<u32>,
    #[serde(default)]
    pub wind: ApiWind,
    pub rain: Option<ApiRain>,
    #[serde(default)]
    pub sys: ApiSys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiForecastEntry {
    pub dt: i64,
    pub main: ApiMain,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
    #[serde(default)]
    pub wind: ApiWind,
    pub rain: Option<ApiRain>,
    pub pop: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCity {
    pub id: i64,
    pub name: String,
    pub coord: ApiCoord,
    pub country: Option<String>,
    #[serde(default)]
    pub timezone: i32,
}

/// `GET /forecast`
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ApiForecastEntry>,
    pub city: ApiCity,
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

impl From<&ApiCoord> for Coord {
    fn from(c: &ApiCoord) -> Self {
        Coord {
            lat: c.lat,
            lon: c.lon,
        }
    }
}

impl From<&ApiMain> for Temperatures {
    fn from(m: &ApiMain) -> Self {
        Temperatures {
            current: m.temp,
            feels_like: m.feels_like,
            min: m.temp_min,
            max: m.temp_max,
        }
    }
}

impl From<&ApiWind> for Wind {
    fn from(w: &ApiWind) -> Self {
        Wind {
            speed: w.speed,
            direction_deg: w.deg,
            gust: w.gust,
        }
    }
}

fn condition(weather: &[ApiCondition]) -> ConditionInfo {
    weather
        .first()
        .map(|c| ConditionInfo {
            code: c.id,
            category: WeatherCondition::from_owm_code(c.id),
            main: c.main.clone(),
            description: c.description.clone(),
            icon: c.icon.clone(),
        })
        .unwrap_or_default()
}

impl ForecastResponse {
    pub fn into_series(self) -> ForecastSeries {
        let points = self
            .list
            .iter()
            .map(|entry| ForecastPoint {
                at: timestamp(entry.dt),
                temperature: Temperatures::from(&entry.main),
                condition: condition(&entry.weather),
                humidity: entry.main.humidity,
                wind: Wind::from(&entry.wind),
                rain_3h: entry.rain.as_ref().and_then(|r| r.three_hours),
                precipitation_chance: entry
                    .pop
                    .map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8)
                    .unwrap_or(0),
            })
            .collect();

        ForecastSeries {
            city: LocationInfo {
                id: self.city.id,
                name: self.city.name,
                country: self.city.country.unwrap_or_default(),
                coord: Coord::from(&self.city.coord),
            },
            timezone_offset: self.city.timezone,
            points,
        }
    }
}

impl CurrentResponse {
    /// Build the snapshot, merging extras derived from both payloads.
    pub fn into_snapshot(self, forecast: &ForecastResponse) -> WeatherSnapshot {
        let extras = build_free_extras(&self, forecast);

        WeatherSnapshot {
            location: LocationInfo {
                id: self.id,
                name: self.name,
                country: self.sys.country.unwrap_or_default(),
                coord: Coord::from(&self.coord),
            },
            observed_at: timestamp(self.dt),
            timezone_offset: self.timezone,
            temperature: Temperatures::from(&self.main),
            condition: condition(&self.weather),
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            wind: Wind::from(&self.wind),
            visibility: self.visibility,
            sunrise: self.sys.sunrise.map(timestamp),
            sunset: self.sys.sunset.map(timestamp),
            extras,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Payloads shaped like real OpenWeather responses.

    use serde_json::{json, Value};

    pub fn current_json(id: i64, name: &str, temp: f64) -> Value {
        json!({
            "coord": {"lon": -0.1257, "lat": 51.5085},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "base": "stations",
            "main": {"temp": temp, "feels_like": temp - 1.0, "temp_min": temp - 2.0,
                     "temp_max": temp + 2.0, "pressure": 1012, "humidity": 81},
            "visibility": 10000,
            "wind": {"speed": 4.1, "deg": 80},
            "rain": {"1h": 0.25},
            "clouds": {"all": 90},
            "dt": 1_700_000_000,
            "sys": {"country": "GB", "sunrise": 1_699_946_000, "sunset": 1_699_979_000},
            "timezone": 0,
            "id": id,
            "name": name,
            "cod": 200
        })
    }

    pub fn forecast_json(id: i64, name: &str, timezone: i32, points: usize) -> Value {
        let list: Vec<Value> = (0..points)
            .map(|i| {
                let rain = if i == 0 { json!({"3h": 1.5}) } else { Value::Null };
                json!({
                    "dt": 1_700_006_400 + (i as i64) * 3 * 3600,
                    "main": {"temp": 10.0 + i as f64, "feels_like": 9.0 + i as f64,
                             "temp_min": 9.5, "temp_max": 11.5 + i as f64,
                             "pressure": 1010, "humidity": 70},
                    "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
                    "wind": {"speed": 3.0, "deg": 200},
                    "pop": 0.2,
                    "rain": rain,
                    "dt_txt": "2023-11-15 00:00:00"
                })
            })
            .collect();

        json!({
            "cod": "200",
            "cnt": points,
            "list": list,
            "city": {"id": id, "name": name, "coord": {"lat": 51.5085, "lon": -0.1257},
                     "country": "GB", "timezone": timezone}
        })
    }
}
