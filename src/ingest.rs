/// Builds weather snapshots from OpenWeather-shaped JSON payloads.
///
/// The crate never fetches anything; the caller hands over the bodies of the
/// "current weather" and "5 day / 3 hour forecast" responses and gets back a
/// snapshot the alert and recommendation rules understand.
///
/// Forecast handling: the API returns readings every three hours. We keep the
/// first reading of each calendar day (UTC), up to seven days.
use crate::{
    error::Result,
    rules::FORECAST_DAYS,
    snapshot::MetricSnapshot,
};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::collections::HashSet;

const MAX_FORECAST_DAYS: usize = 7;
const MS_TO_KMH:         f64   = 3.6;

// ---------------------------------------------------------------------------
// Payload shapes (only the fields we read)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp:       f64,
    #[serde(default)]
    feels_like: Option<f64>,
    humidity:   f64,
    #[serde(default)]
    pressure:   Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main:        String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon:        Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rain {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentPayload {
    main:       MainReadings,
    wind:       Wind,
    #[serde(default)]
    rain:       Option<Rain>,
    weather:    Vec<Condition>,
    #[serde(default)]
    visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt:      i64,
    main:    MainReadings,
    wind:    Wind,
    weather: Vec<Condition>,
    /// Probability of precipitation, 0–1.
    #[serde(default)]
    pop:     Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastPayload {
    list: Vec<ForecastEntry>,
}

// ---------------------------------------------------------------------------
// Icons
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionIcon {
    Sun,
    Rain,
    Cloud,
}

impl ConditionIcon {
    pub fn from_condition(condition: &str) -> Self {
        let lower = condition.to_lowercase();
        if lower.contains("clear") || lower.contains("sun") {
            Self::Sun
        } else if lower.contains("rain") || lower.contains("drizzle") {
            Self::Rain
        } else {
            Self::Cloud
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sun   => "sun",
            Self::Rain  => "rain",
            Self::Cloud => "cloud",
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

fn primary(conditions: &[Condition]) -> (&str, &str) {
    conditions
        .first()
        .map(|c| (c.main.as_str(), c.description.as_str()))
        .unwrap_or(("Unknown", ""))
}

fn forecast_day(entry: &ForecastEntry, date: NaiveDate) -> MetricSnapshot {
    let (condition, description) = primary(&entry.weather);
    MetricSnapshot::builder()
        .text("day", date.format("%a").to_string())
        .text("date", date.format("%b %-d").to_string())
        .number("temp", entry.main.temp.round())
        .text("condition", condition)
        .text("description", description)
        .number("rain", entry.pop.map(|p| (p * 100.0).round()).unwrap_or(0.0))
        .number("humidity", entry.main.humidity)
        .number("windSpeed", (entry.wind.speed * MS_TO_KMH).round())
        .text("icon", ConditionIcon::from_condition(condition).as_str())
        .build()
}

fn daily_forecast(payload: &ForecastPayload) -> Vec<MetricSnapshot> {
    let mut seen = HashSet::new();
    let mut days = Vec::new();

    for entry in &payload.list {
        if days.len() >= MAX_FORECAST_DAYS {
            break;
        }
        let Some(ts) = DateTime::from_timestamp(entry.dt, 0) else {
            tracing::warn!("Skipping forecast entry with invalid timestamp {}", entry.dt);
            continue;
        };
        let date = ts.date_naive();
        if seen.insert(date) {
            days.push(forecast_day(entry, date));
        }
    }
    days
}

/// Combine a current-weather body and a forecast body into one snapshot.
pub fn weather_snapshot(current_json: &str, forecast_json: &str) -> Result<MetricSnapshot> {
    let current:  CurrentPayload  = serde_json::from_str(current_json)?;
    let forecast: ForecastPayload = serde_json::from_str(forecast_json)?;

    let (condition, description) = primary(&current.weather);
    let mut builder = MetricSnapshot::builder()
        .number("temperature", current.main.temp.round())
        .number("humidity", current.main.humidity)
        .number("windSpeed", (current.wind.speed * MS_TO_KMH).round())
        .number("rainfall", current.rain.and_then(|r| r.one_hour).unwrap_or(0.0))
        .text("condition", condition)
        .text("description", description);

    if let Some(feels_like) = current.main.feels_like {
        builder = builder.number("feelsLike", feels_like.round());
    }
    if let Some(pressure) = current.main.pressure {
        builder = builder.number("pressure", pressure);
    }
    if let Some(visibility) = current.visibility {
        builder = builder.number("visibility", visibility / 1000.0);
    }
    if let Some(icon) = current.weather.first().and_then(|c| c.icon.as_deref()) {
        builder = builder.text("icon", icon);
    }

    let days = daily_forecast(&forecast);
    tracing::debug!("Ingested current weather + {} forecast days", days.len());
    Ok(builder.records(FORECAST_DAYS, days).build())
}
