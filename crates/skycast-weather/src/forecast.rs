//! Derived forecast views: day buckets, the 5-day overview and the 24h chart.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ForecastPoint, ForecastSeries, WeatherCondition};

/// Points per day in a 3-hour series
const POINTS_PER_DAY: usize = 8;
const OVERVIEW_DAYS: usize = 5;

/// One calendar day (city local time) of forecast points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub high: f64,
    pub low: f64,
    /// Condition of the day's midday-most point
    pub condition: WeatherCondition,
    /// Highest chance of precipitation in the day, 0-100
    pub precipitation_chance: u8,
    pub hourly: Vec<ForecastPoint>,
}

/// A point on the 24-hour temperature chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub at: DateTime<Utc>,
    /// City local time, `HH:MM`
    pub local_time: String,
    pub temperature: i32,
    pub feels_like: i32,
}

impl ForecastSeries {
    /// Calendar day of `at` in the city's timezone.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local_time(at).date_naive()
    }

    fn local_time(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        at + Duration::seconds(i64::from(self.timezone_offset))
    }

    /// All points whose local calendar day is `date`, in order.
    pub fn hourly_for_day(&self, date: NaiveDate) -> Vec<&ForecastPoint> {
        self.points
            .iter()
            .filter(|p| self.local_date(p.at) == date)
            .collect()
    }

    /// Points grouped by local calendar day.
    pub fn days(&self) -> Vec<DayForecast> {
        let mut days: Vec<DayForecast> = Vec::new();

        for point in &self.points {
            let date = self.local_date(point.at);
            match days.last_mut() {
                Some(day) if day.date == date => day.hourly.push(point.clone()),
                _ => days.push(DayForecast {
                    date,
                    high: f64::NEG_INFINITY,
                    low: f64::INFINITY,
                    condition: WeatherCondition::default(),
                    precipitation_chance: 0,
                    hourly: vec![point.clone()],
                }),
            }
        }

        for day in &mut days {
            for p in &day.hourly {
                day.high = day.high.max(p.temperature.max);
                day.low = day.low.min(p.temperature.min);
                day.precipitation_chance = day.precipitation_chance.max(p.precipitation_chance);
            }
            if let Some(midday) = day
                .hourly
                .iter()
                .min_by_key(|p| (self.local_time(p.at).hour() as i32 - 12).abs())
            {
                day.condition = midday.condition.category;
            }
        }

        days
    }

    /// One point per day: every 8th point, at most 5.
    pub fn daily_overview(&self) -> Vec<&ForecastPoint> {
        self.points
            .iter()
            .step_by(POINTS_PER_DAY)
            .take(OVERVIEW_DAYS)
            .collect()
    }

    /// The next 24 hours (first 8 points) with rounded temperatures.
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.points
            .iter()
            .take(POINTS_PER_DAY)
            .map(|p| ChartPoint {
                at: p.at,
                local_time: self.local_time(p.at).format("%H:%M").to_string(),
                temperature: p.temperature.current.round() as i32,
                feels_like: p.temperature.feels_like.round() as i32,
            })
            .collect()
    }
}
