/// Farm weather alerts. Every condition that holds gets its own alert.
///
/// Rules, in output order:
///   heavy_rainfall          any forecast day with rain > 50%
///   high_temperature        any forecast day above 32°C
///   optimal_harvest_window  3+ days with rain < 20% and temp < 30°C
///   high_humidity           current humidity > 80%
///
/// With no match the result is the single "Normal Conditions" advisory.
use super::{day_name_at, days_where, forecast_days};
use crate::{
    advisory::{Advisory, Category, Severity},
    engine::{evaluate, Rule, RuleEngineConfig, Template},
    error::RuleEvaluationError,
    snapshot::MetricSnapshot,
};
use once_cell::sync::Lazy;

pub const HEAVY_RAINFALL:    &str = "heavy_rainfall";
pub const HIGH_TEMPERATURE:  &str = "high_temperature";
pub const HARVEST_WINDOW:    &str = "optimal_harvest_window";
pub const HIGH_HUMIDITY:     &str = "high_humidity";
pub const NORMAL_CONDITIONS: &str = "normal_conditions";

const HEAVY_RAIN_PCT:     f64   = 50.0;
const HOT_DAY_C:          f64   = 32.0;
const CLEAR_RAIN_PCT:     f64   = 20.0;
const CLEAR_TEMP_C:       f64   = 30.0;
const MIN_CLEAR_DAYS:     usize = 3;
const HUMID_PCT:          f64   = 80.0;

/// Built once per process; rules are pure so the config is shared freely.
pub static WEATHER_ALERTS: Lazy<RuleEngineConfig> = Lazy::new(config);

pub fn generate_alerts(snapshot: &MetricSnapshot) -> Vec<Advisory> {
    evaluate(snapshot, &WEATHER_ALERTS)
}

pub fn config() -> RuleEngineConfig {
    RuleEngineConfig::new(
        vec![heavy_rainfall(), high_temperature(), harvest_window(), high_humidity()],
        normal_conditions(),
    )
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn rainy(rain: f64, _temp: f64) -> bool {
    rain > HEAVY_RAIN_PCT
}

fn clear(rain: f64, temp: f64) -> bool {
    rain < CLEAR_RAIN_PCT && temp < CLEAR_TEMP_C
}

fn heavy_rainfall() -> Rule {
    Rule::new(
        HEAVY_RAINFALL,
        "Heavy Rainfall Expected",
        Category::Alert,
        Severity::Medium,
        |s| Ok(!days_where(forecast_days(s), rainy).is_empty()),
    )
    .message(Template::render(|s| {
        let rainy_days = days_where(forecast_days(s), rainy);
        let day  = day_name_at(&rainy_days, "rainyDays", 0)?;
        let rain = rainy_days[0]
            .get("rain")
            .and_then(|v| v.render())
            .ok_or_else(|| RuleEvaluationError::MissingMetric("rain".to_owned()))?;
        Ok(format!(
            "Plan to complete irrigation before {}. Expected rainfall probability: {}%",
            day, rain
        ))
    }))
    .action(Template::text("Reduce irrigation by 50%"))
}

fn high_temperature() -> Rule {
    Rule::new(
        HIGH_TEMPERATURE,
        "High Temperature Alert",
        Category::Alert,
        Severity::Medium,
        |s| Ok(!days_where(forecast_days(s), |_, temp| temp > HOT_DAY_C).is_empty()),
    )
    .message(Template::text(
        "Increased water requirements for crops. Monitor soil moisture closely.",
    ))
    .action(Template::text("Increase irrigation frequency"))
}

fn harvest_window() -> Rule {
    Rule::new(
        HARVEST_WINDOW,
        "Optimal Harvesting Window",
        Category::Alert,
        Severity::Low,
        |s| Ok(days_where(forecast_days(s), clear).len() >= MIN_CLEAR_DAYS),
    )
    .message(Template::text(
        "Clear weather expected. Ideal conditions for harvesting and field operations.",
    ))
    // Cites the 1st and 3rd entries of the filtered list, not of the forecast.
    .action(Template::render(|s| {
        let clear_days = days_where(forecast_days(s), clear);
        Ok(format!(
            "Schedule harvest for {}-{}",
            day_name_at(&clear_days, "clearDays", 0)?,
            day_name_at(&clear_days, "clearDays", 2)?,
        ))
    }))
}

fn high_humidity() -> Rule {
    Rule::new(
        HIGH_HUMIDITY,
        "High Humidity Alert",
        Category::Alert,
        Severity::High,
        |s| Ok(s.number("humidity").is_some_and(|h| h > HUMID_PCT)),
    )
    .message(Template::text("Increased risk of fungal diseases. Monitor crops closely."))
    .action(Template::text("Apply preventive fungicide"))
}

fn normal_conditions() -> Advisory {
    Advisory::new(
        NORMAL_CONDITIONS,
        Category::Alert,
        Severity::Low,
        "Normal Conditions",
        "Weather conditions are stable. Continue regular farm operations.",
    )
    .with_action("Maintain routine schedule")
}
