pub mod threshold;
pub mod weather_alerts;
pub mod weather_recommendations;

use crate::{
    error::{AdvisoryError, Result, RuleEvaluationError},
    snapshot::MetricSnapshot,
};

/// Snapshot key holding the per-day forecast records.
pub const FORECAST_DAYS: &str = "forecastDays";

// ---------------------------------------------------------------------------
// Forecast helpers shared by the weather rule sets
// ---------------------------------------------------------------------------

/// Forecast days, or an empty slice when the snapshot has none.
/// Rule predicates use this so a missing forecast simply never matches.
pub fn forecast_days(snapshot: &MetricSnapshot) -> &[MetricSnapshot] {
    snapshot.records(FORECAST_DAYS).unwrap_or(&[])
}

/// Days whose `rain` and `temp` readings satisfy `keep`, in forecast order.
/// Days missing either reading never qualify.
pub fn days_where<F>(days: &[MetricSnapshot], keep: F) -> Vec<&MetricSnapshot>
where
    F: Fn(f64, f64) -> bool,
{
    days.iter()
        .filter(|d| match (d.number("rain"), d.number("temp")) {
            (Some(rain), Some(temp)) => keep(rain, temp),
            _ => false,
        })
        .collect()
}

/// Name of `days[index]`, where `days` is a filtered list called `list`.
pub fn day_name_at(days: &[&MetricSnapshot], list: &str, index: usize) -> Result<String, RuleEvaluationError> {
    let day = days.get(index).ok_or_else(|| RuleEvaluationError::IndexOutOfRange {
        list:  list.to_owned(),
        index,
        len:   days.len(),
    })?;
    day.text("day")
        .map(str::to_owned)
        .ok_or_else(|| RuleEvaluationError::MissingMetric("day".to_owned()))
}

/// Strict numeric reading from forecast day `index`, for decision tables.
pub fn require_day_number(day: &MetricSnapshot, index: usize, key: &str) -> Result<f64> {
    day.number(key).ok_or_else(|| {
        AdvisoryError::invalid(
            &format!("{}[{}].{}", FORECAST_DAYS, index, key),
            "missing or not numeric",
        )
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::snapshot::MetricSnapshot;

    pub fn day(name: &str, rain: f64, temp: f64) -> MetricSnapshot {
        MetricSnapshot::builder()
            .text("day", name)
            .number("rain", rain)
            .number("temp", temp)
            .build()
    }

    pub fn weather(humidity: f64, days: Vec<MetricSnapshot>) -> MetricSnapshot {
        MetricSnapshot::builder()
            .number("humidity", humidity)
            .records(super::FORECAST_DAYS, days)
            .build()
    }

    pub const WEEK: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
}

#[cfg(test)]
mod tests {
    use super::fixtures::day;
    use super::*;

    #[test]
    fn days_where_skips_incomplete_days() {
        let partial = MetricSnapshot::builder().text("day", "Tue").number("rain", 5.0).build();
        let days    = vec![day("Mon", 5.0, 25.0), partial];
        let dry     = days_where(&days, |rain, _| rain < 20.0);
        assert_eq!(dry.len(), 1);
    }

    #[test]
    fn day_name_at_reports_out_of_range() {
        let days = vec![day("Mon", 0.0, 20.0)];
        let refs: Vec<&MetricSnapshot> = days.iter().collect();
        assert_eq!(day_name_at(&refs, "clearDays", 0).unwrap(), "Mon");
        assert_eq!(
            day_name_at(&refs, "clearDays", 2).unwrap_err(),
            RuleEvaluationError::IndexOutOfRange { list: "clearDays".into(), index: 2, len: 1 }
        );
    }
}
