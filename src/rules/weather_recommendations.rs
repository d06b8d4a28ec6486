/// Farm recommendations: three independent decision tables.
///
/// Unlike the alerts, each slot (irrigation, pest control, harvesting)
/// produces exactly one recommendation. The `impact` text shown next to each
/// recommendation is carried in the advisory's `action` field.
use super::{require_day_number, FORECAST_DAYS};
use crate::{
    advisory::{Advisory, Category, Severity},
    decision::{DecisionTable, Outcome},
    engine::Template,
    error::{AdvisoryError, Result, RuleEvaluationError},
    snapshot::MetricSnapshot,
};
use once_cell::sync::Lazy;

const LOOKAHEAD_DAYS:     usize = 3;
const PAUSE_RAIN_PCT:     f64   = 40.0;
const DRY_HUMIDITY_PCT:   f64   = 40.0;
const PEST_HUMIDITY_PCT:  f64   = 70.0;
const HARVEST_RAIN_PCT:   f64   = 20.0;
const HARVEST_MIN_TEMP_C: f64   = 20.0;
const HARVEST_MAX_TEMP_C: f64   = 32.0;
const MIN_HARVEST_DAYS:   usize = 2;

pub static IRRIGATION:   Lazy<DecisionTable> = Lazy::new(irrigation_table);
pub static PEST_CONTROL: Lazy<DecisionTable> = Lazy::new(pest_control_table);
pub static HARVESTING:   Lazy<DecisionTable> = Lazy::new(harvesting_table);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn irrigation(snapshot: &MetricSnapshot) -> Result<Advisory> {
    IRRIGATION.decide(snapshot)
}

pub fn pest_control(snapshot: &MetricSnapshot) -> Result<Advisory> {
    PEST_CONTROL.decide(snapshot)
}

pub fn harvesting(snapshot: &MetricSnapshot) -> Result<Advisory> {
    HARVESTING.decide(snapshot)
}

/// Irrigation, pest control and harvesting, in that order.
pub fn recommend(snapshot: &MetricSnapshot) -> Result<Vec<Advisory>> {
    Ok(vec![irrigation(snapshot)?, pest_control(snapshot)?, harvesting(snapshot)?])
}

// ---------------------------------------------------------------------------
// Shared conditions
// ---------------------------------------------------------------------------

/// Rain above 40% on any of the next three days.
fn upcoming_rain(snapshot: &MetricSnapshot) -> Result<bool> {
    let days = snapshot.require_records(FORECAST_DAYS)?;
    for (i, day) in days.iter().take(LOOKAHEAD_DAYS).enumerate() {
        if require_day_number(day, i, "rain")? > PAUSE_RAIN_PCT {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Names of days that are dry and mild enough to harvest, in forecast order.
fn harvest_days(snapshot: &MetricSnapshot) -> Result<Vec<String>> {
    let days = snapshot.require_records(FORECAST_DAYS)?;
    let mut names = Vec::new();
    for (i, day) in days.iter().enumerate() {
        let rain = require_day_number(day, i, "rain")?;
        let temp = require_day_number(day, i, "temp")?;
        if rain < HARVEST_RAIN_PCT && temp > HARVEST_MIN_TEMP_C && temp < HARVEST_MAX_TEMP_C {
            let name = day.text("day").ok_or_else(|| {
                AdvisoryError::invalid(&format!("{}[{}].day", FORECAST_DAYS, i), "missing")
            })?;
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

/// "Ideal harvesting window: {first} to {second}. ..." from the qualifying
/// days. A malformed forecast surfaces as the offending field.
fn harvest_window_message(snapshot: &MetricSnapshot) -> Result<String, RuleEvaluationError> {
    let days = harvest_days(snapshot).map_err(|e| match e {
        AdvisoryError::InvalidInput { field, .. } => RuleEvaluationError::MissingMetric(field),
        other => RuleEvaluationError::MissingMetric(format!("{} ({})", FORECAST_DAYS, other)),
    })?;
    match (days.first(), days.get(1)) {
        (Some(first), Some(second)) => Ok(format!(
            "Ideal harvesting window: {} to {}. Clear and dry conditions.",
            first, second
        )),
        _ => Err(RuleEvaluationError::IndexOutOfRange {
            list:  "goodHarvestDays".to_owned(),
            index: 1,
            len:   days.len(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

fn irrigation_table() -> DecisionTable {
    DecisionTable::new(
        "irrigation",
        "Irrigation",
        Category::Recommendation,
        Outcome::new("regular", Severity::Low, Template::text("Continue regular irrigation schedule"))
            .action(Template::text("Optimal water usage")),
    )
    .branch(
        |s| {
            s.require_number("humidity")?;
            upcoming_rain(s)
        },
        Outcome::new(
            "pause",
            Severity::Medium,
            Template::text("Pause irrigation for 48-72 hours due to expected rainfall"),
        )
        .action(Template::text("Save 300-500L of water")),
    )
    .branch(
        |s| Ok(s.require_number("humidity")? < DRY_HUMIDITY_PCT),
        Outcome::new(
            "increase",
            Severity::Medium,
            Template::text("Increase irrigation frequency due to low humidity and dry conditions"),
        )
        .action(Template::text("Maintain optimal soil moisture")),
    )
}

fn pest_control_table() -> DecisionTable {
    DecisionTable::new(
        "pest_control",
        "Pest Control",
        Category::Recommendation,
        Outcome::new(
            "monitor",
            Severity::Low,
            Template::text("Regular monitoring recommended. No immediate action needed."),
        )
        .action(Template::text("Maintain crop health")),
    )
    .branch(
        |s| Ok(s.require_number("humidity")? > PEST_HUMIDITY_PCT || upcoming_rain(s)?),
        Outcome::new(
            "organic_spray",
            Severity::Medium,
            Template::text(
                "Apply organic pest spray before rainfall to prevent fungal growth and pest attacks",
            ),
        )
        .action(Template::text("Prevent 30-40% crop damage")),
    )
}

fn harvesting_table() -> DecisionTable {
    DecisionTable::new(
        "harvesting",
        "Harvesting",
        Category::Recommendation,
        Outcome::new(
            "wait",
            Severity::Low,
            Template::text("Wait for better weather conditions before harvesting"),
        )
        .action(Template::text("Preserve crop quality")),
    )
    .branch(
        |s| Ok(harvest_days(s)?.len() >= MIN_HARVEST_DAYS),
        Outcome::new(
            "window",
            Severity::Low,
            Template::render(harvest_window_message),
        )
        .action(Template::text("Maximize crop quality")),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::fixtures::{day, weather};

    #[test]
    fn rain_in_lookahead_pauses_irrigation() {
        let snap = weather(30.0, vec![day("Mon", 10.0, 25.0), day("Tue", 45.0, 25.0)]);
        let a = irrigation(&snap).unwrap();
        assert_eq!(a.rule_id, "irrigation.pause");
        assert_eq!(a.action.as_deref(), Some("Save 300-500L of water"));
    }

    #[test]
    fn rain_after_lookahead_is_ignored() {
        let snap = weather(
            30.0,
            vec![day("Mon", 0.0, 25.0), day("Tue", 0.0, 25.0), day("Wed", 0.0, 25.0), day("Thu", 90.0, 25.0)],
        );
        assert_eq!(irrigation(&snap).unwrap().rule_id, "irrigation.increase");
    }

    #[test]
    fn moderate_humidity_keeps_regular_schedule() {
        let snap = weather(55.0, vec![day("Mon", 0.0, 25.0)]);
        assert_eq!(irrigation(&snap).unwrap().message, "Continue regular irrigation schedule");
    }

    #[test]
    fn pest_spray_on_humidity_or_rain() {
        let humid = weather(75.0, vec![day("Mon", 0.0, 25.0)]);
        let rainy = weather(50.0, vec![day("Mon", 60.0, 25.0)]);
        let calm  = weather(50.0, vec![day("Mon", 0.0, 25.0)]);
        assert_eq!(pest_control(&humid).unwrap().rule_id, "pest_control.organic_spray");
        assert_eq!(pest_control(&rainy).unwrap().rule_id, "pest_control.organic_spray");
        assert_eq!(pest_control(&calm).unwrap().rule_id, "pest_control.monitor");
    }

    #[test]
    fn harvest_needs_two_qualifying_days() {
        let one = weather(50.0, vec![day("Mon", 10.0, 25.0), day("Tue", 60.0, 25.0)]);
        let a   = harvesting(&one).unwrap();
        assert_eq!(a.rule_id, "harvesting.wait");
        assert_eq!(a.message, "Wait for better weather conditions before harvesting");

        let two = weather(50.0, vec![day("Mon", 10.0, 25.0), day("Tue", 60.0, 25.0), day("Wed", 5.0, 31.0)]);
        let a   = harvesting(&two).unwrap();
        assert_eq!(a.rule_id, "harvesting.window");
        assert_eq!(a.message, "Ideal harvesting window: Mon to Wed. Clear and dry conditions.");
    }

    #[test]
    fn harvest_message_reports_the_bad_forecast_field() {
        let no_day_name = MetricSnapshot::builder().number("rain", 5.0).number("temp", 25.0).build();
        let snap = weather(50.0, vec![day("Mon", 5.0, 25.0), no_day_name]);

        assert_eq!(
            harvest_window_message(&snap).unwrap_err(),
            RuleEvaluationError::MissingMetric("forecastDays[1].day".to_owned())
        );
        assert!(matches!(
            harvesting(&snap),
            Err(AdvisoryError::InvalidInput { ref field, .. }) if field == "forecastDays[1].day"
        ));
    }

    #[test]
    fn harvest_message_needs_two_days() {
        let snap = weather(50.0, vec![day("Mon", 5.0, 25.0)]);
        assert!(matches!(
            harvest_window_message(&snap),
            Err(RuleEvaluationError::IndexOutOfRange { len: 1, .. })
        ));
    }

    #[test]
    fn harvest_temperature_bounds_are_exclusive() {
        let snap = weather(50.0, vec![day("Mon", 10.0, 20.0), day("Tue", 10.0, 32.0)]);
        assert_eq!(harvesting(&snap).unwrap().rule_id, "harvesting.wait");
    }

    #[test]
    fn recommend_returns_three_slots_in_order() {
        let recs = recommend(&weather(50.0, vec![day("Mon", 10.0, 25.0)])).unwrap();
        let titles: Vec<&str> = recs.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Irrigation", "Pest Control", "Harvesting"]);
        assert!(recs.iter().all(|a| a.category == Category::Recommendation));
    }

    #[test]
    fn missing_humidity_is_invalid_input() {
        let snap = MetricSnapshot::builder().records(FORECAST_DAYS, vec![]).build();
        let err  = irrigation(&snap).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput { ref field, .. } if field == "humidity"));
    }

    #[test]
    fn missing_forecast_is_invalid_input() {
        let snap = MetricSnapshot::builder().number("humidity", 50.0).build();
        assert!(matches!(harvesting(&snap), Err(AdvisoryError::InvalidInput { .. })));
    }

    #[test]
    fn malformed_day_names_the_field() {
        let bad  = MetricSnapshot::builder().text("day", "Mon").text("rain", "lots").build();
        let snap = weather(50.0, vec![bad]);
        let err  = pest_control(&snap).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput { ref field, .. } if field == "forecastDays[0].rain"));
    }
}
