/// Appointment no-show risk: a single additive score, not a rule set.
///
/// Four independent factors are summed and reported as a percentage rounded
/// to one decimal:
///
///   time of day      0.15 before 10:00, else 0.08
///   day of week      0.12 on Monday, else 0.05
///   advance booking  0.06, always applied
///   patient age      0.10 under 30, else 0.04
///
/// The advance-booking term never varies with the input. It is kept as a
/// weight (default 0.06) so a deployment can tune or zero it.
///
/// Inputs are validated up front: a missing, NaN or out-of-range reading is
/// an `InvalidInput` error rather than a meaningless percentage.
use crate::{
    advisory::{Advisory, Category, Severity},
    error::{AdvisoryError, Result},
    snapshot::{MetricSnapshot, MetricValue},
};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RULE_ID: &str = "no_show_risk";

// ---------------------------------------------------------------------------
// Weights / bands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoShowWeights {
    /// Slots starting before this hour count as early.
    pub early_before_hour: f64,
    pub early_slot:        f64,
    pub later_slot:        f64,
    pub monday:            f64,
    pub other_day:         f64,
    pub advance_booking:   f64,
    /// Patients younger than this count as young.
    pub young_below_age:   f64,
    pub young_patient:     f64,
    pub older_patient:     f64,
}

impl Default for NoShowWeights {
    fn default() -> Self {
        Self {
            early_before_hour: 10.0,
            early_slot:        0.15,
            later_slot:        0.08,
            monday:            0.12,
            other_day:         0.05,
            advance_booking:   0.06,
            young_below_age:   30.0,
            young_patient:     0.10,
            older_patient:     0.04,
        }
    }
}

/// Percent cut-offs used to colour the risk: below `low_below` is low,
/// below `medium_below` is medium, anything else high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskBands {
    pub low_below:    f64,
    pub medium_below: f64,
}

impl Default for RiskBands {
    fn default() -> Self {
        Self { low_below: 10.0, medium_below: 20.0 }
    }
}

impl RiskBands {
    pub fn classify(&self, percent: f64) -> Severity {
        if percent < self.low_below {
            Severity::Low
        } else if percent < self.medium_below {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub time_slot_hour: f64,
    pub day_of_week:    Weekday,
    pub patient_age:    f64,
}

impl Appointment {
    /// Reads `timeSlotHour`, `dayOfWeek` and `patientAge` from a snapshot.
    ///
    /// `timeSlotHour` may be a number or a slot label like "09:00 AM" or
    /// "14:30" (minutes are dropped). `dayOfWeek` may be a weekday name, an
    /// ISO date, or 0–6 with 0 = Sunday. `patientAge` may be numeric text.
    pub fn from_snapshot(snapshot: &MetricSnapshot) -> Result<Self> {
        let appt = Self {
            time_slot_hour: read_hour(snapshot)?,
            day_of_week:    read_weekday(snapshot)?,
            patient_age:    read_age(snapshot)?,
        };
        appt.validate()?;
        Ok(appt)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_slot_hour.is_finite() || !(0.0..24.0).contains(&self.time_slot_hour) {
            return Err(AdvisoryError::invalid("timeSlotHour", "must be an hour between 0 and 23"));
        }
        if !self.patient_age.is_finite() || self.patient_age < 0.0 {
            return Err(AdvisoryError::invalid("patientAge", "must be a non-negative number"));
        }
        Ok(())
    }
}

/// Slot labels are read as 12-hour ("02:00 PM") or 24-hour ("14:00") clock
/// times; a bare number is taken as the hour.
fn read_hour(snapshot: &MetricSnapshot) -> Result<f64> {
    match snapshot.get("timeSlotHour") {
        Some(MetricValue::Text(slot)) => {
            let slot = slot.trim();
            NaiveTime::parse_from_str(slot, "%I:%M %p")
                .or_else(|_| NaiveTime::parse_from_str(slot, "%H:%M"))
                .map(|t| t.hour() as f64)
                .or_else(|_| slot.parse::<f64>())
                .map_err(|_| AdvisoryError::invalid("timeSlotHour", format!("cannot read an hour from '{}'", slot)))
        }
        _ => snapshot.require_number("timeSlotHour"),
    }
}

fn read_weekday(snapshot: &MetricSnapshot) -> Result<Weekday> {
    match snapshot.get("dayOfWeek") {
        None => Err(AdvisoryError::invalid("dayOfWeek", "missing")),
        Some(MetricValue::Text(raw)) => {
            let raw = raw.trim();
            raw.parse::<Weekday>()
                .ok()
                .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|d| d.weekday()))
                .ok_or_else(|| AdvisoryError::invalid("dayOfWeek", format!("unknown day '{}'", raw)))
        }
        Some(MetricValue::Number(n)) if n.fract() == 0.0 && (0.0..=6.0).contains(n) => {
            // 0 = Sunday; chrono counts from Monday.
            Ok((0..*n as u32).fold(Weekday::Sun, |d, _| d.succ()))
        }
        Some(_) => Err(AdvisoryError::invalid("dayOfWeek", "expected a weekday name or 0-6")),
    }
}

fn read_age(snapshot: &MetricSnapshot) -> Result<f64> {
    match snapshot.get("patientAge") {
        Some(MetricValue::Text(raw)) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| AdvisoryError::invalid("patientAge", format!("'{}' is not a number", raw))),
        _ => snapshot.require_number("patientAge"),
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShowFactors {
    pub time_of_day:     f64,
    pub day_of_week:     f64,
    pub advance_booking: f64,
    pub age:             f64,
}

impl NoShowFactors {
    pub fn sum(&self) -> f64 {
        self.time_of_day + self.day_of_week + self.advance_booking + self.age
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoShowRisk {
    /// Percentage, rounded to one decimal.
    pub percent: f64,
    pub band:    Severity,
    pub factors: NoShowFactors,
}

impl fmt::Display for NoShowRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.percent)
    }
}

impl NoShowRisk {
    pub fn to_advisory(&self) -> Advisory {
        Advisory::new(
            RULE_ID,
            Category::Risk,
            self.band,
            "No-Show Risk",
            format!("Predicted no-show risk: {}%", self),
        )
        .with_confidence(self.percent)
    }
}

pub fn score(appt: &Appointment, weights: &NoShowWeights, bands: &RiskBands) -> Result<NoShowRisk> {
    appt.validate()?;

    let factors = NoShowFactors {
        time_of_day: if appt.time_slot_hour < weights.early_before_hour {
            weights.early_slot
        } else {
            weights.later_slot
        },
        day_of_week: if appt.day_of_week == Weekday::Mon {
            weights.monday
        } else {
            weights.other_day
        },
        advance_booking: weights.advance_booking,
        age: if appt.patient_age < weights.young_below_age {
            weights.young_patient
        } else {
            weights.older_patient
        },
    };

    let percent = (factors.sum() * 100.0 * 10.0).round() / 10.0;
    tracing::debug!("No-show risk {:.1}% from {:?}", percent, factors);

    Ok(NoShowRisk { percent, band: bands.classify(percent), factors })
}

/// Validate the snapshot and score it in one step.
pub fn predict_no_show(
    snapshot: &MetricSnapshot,
    weights:  &NoShowWeights,
    bands:    &RiskBands,
) -> Result<NoShowRisk> {
    score(&Appointment::from_snapshot(snapshot)?, weights, bands)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;

    fn predict(snap: &MetricSnapshot) -> Result<NoShowRisk> {
        predict_no_show(snap, &NoShowWeights::default(), &RiskBands::default())
    }

    fn appt(hour: f64, day: &str, age: f64) -> MetricSnapshot {
        MetricSnapshot::builder()
            .number("timeSlotHour", hour)
            .text("dayOfWeek", day)
            .number("patientAge", age)
            .build()
    }

    #[test]
    fn early_monday_young_patient_scores_43() {
        let risk = predict(&appt(9.0, "Monday", 25.0)).unwrap();
        assert_eq!(risk.percent, 43.0);
        assert_eq!(risk.to_string(), "43.0");
        assert_eq!(risk.band, Severity::High);
    }

    #[test]
    fn afternoon_wednesday_older_patient_scores_23() {
        let risk = predict(&appt(14.0, "Wednesday", 45.0)).unwrap();
        assert_eq!(risk.to_string(), "23.0");
        assert_eq!(risk.factors.advance_booking, 0.06);
    }

    #[test]
    fn advance_booking_weight_is_configurable() {
        let weights = NoShowWeights { advance_booking: 0.0, ..NoShowWeights::default() };
        let risk = predict_no_show(&appt(14.0, "Wed", 45.0), &weights, &RiskBands::default()).unwrap();
        assert_eq!(risk.to_string(), "17.0");
        assert_eq!(risk.band, Severity::Medium);
    }

    #[test]
    fn accepts_slot_labels_numeric_days_and_dates() {
        let labelled = MetricSnapshot::builder()
            .text("timeSlotHour", "09:30 AM")
            .number("dayOfWeek", 1.0)
            .text("patientAge", "25")
            .build();
        assert_eq!(predict(&labelled).unwrap().percent, 43.0);

        // 2024-06-03 was a Monday.
        let dated = appt(9.0, "2024-06-03", 25.0);
        assert_eq!(predict(&dated).unwrap().percent, 43.0);

        let sunday = MetricSnapshot::builder()
            .number("timeSlotHour", 9.0)
            .number("dayOfWeek", 0.0)
            .number("patientAge", 25.0)
            .build();
        assert_eq!(predict(&sunday).unwrap().percent, 36.0);
    }

    #[test]
    fn pm_slot_labels_are_afternoon() {
        let afternoon = MetricSnapshot::builder()
            .text("timeSlotHour", "02:00 PM")
            .text("dayOfWeek", "Wednesday")
            .number("patientAge", 45.0)
            .build();
        let risk = predict(&afternoon).unwrap();
        assert_eq!(risk.factors.time_of_day, 0.08);
        assert_eq!(risk.to_string(), "23.0");

        let noon = MetricSnapshot::builder()
            .text("timeSlotHour", "12:00 PM")
            .text("dayOfWeek", "Wednesday")
            .number("patientAge", 45.0)
            .build();
        assert_eq!(predict(&noon).unwrap().factors.time_of_day, 0.08);
    }

    #[test]
    fn twenty_four_hour_and_unreadable_labels() {
        let evening = MetricSnapshot::builder()
            .text("timeSlotHour", "16:30")
            .text("dayOfWeek", "Monday")
            .number("patientAge", 25.0)
            .build();
        assert_eq!(predict(&evening).unwrap().factors.time_of_day, 0.08);

        let garbled = MetricSnapshot::builder()
            .text("timeSlotHour", "after lunch")
            .text("dayOfWeek", "Monday")
            .number("patientAge", 25.0)
            .build();
        let err = predict(&garbled).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput { ref field, .. } if field == "timeSlotHour"));
    }

    #[test]
    fn scores_records_carrying_flags_and_nulls() {
        let snap = MetricSnapshot::from_json_str(
            r#"{"timeSlotHour": 9, "dayOfWeek": "Monday", "patientAge": 25,
                "reminderSent": false, "confirmationSent": true, "notes": null}"#,
        )
        .unwrap();
        assert_eq!(predict(&snap).unwrap().percent, 43.0);
    }

    #[test]
    fn nan_age_is_invalid_input_not_nan_percent() {
        let err = predict(&appt(9.0, "Monday", f64::NAN)).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput { ref field, .. } if field == "patientAge"));
    }

    #[test]
    fn missing_and_malformed_fields_are_rejected() {
        let no_day = MetricSnapshot::builder().number("timeSlotHour", 9.0).number("patientAge", 30.0).build();
        assert!(matches!(predict(&no_day), Err(AdvisoryError::InvalidInput { ref field, .. }) if field == "dayOfWeek"));
        assert!(predict(&appt(9.0, "Someday", 30.0)).is_err());
        assert!(predict(&appt(25.0, "Monday", 30.0)).is_err());
    }

    #[test]
    fn risk_becomes_risk_advisory() {
        let a = predict(&appt(9.0, "Monday", 25.0)).unwrap().to_advisory();
        assert_eq!(a.category, Category::Risk);
        assert_eq!(a.confidence, Some(43.0));
        assert_eq!(a.message, "Predicted no-show risk: 43.0%");
    }

    #[test]
    fn bands_follow_display_thresholds() {
        let bands = RiskBands::default();
        assert_eq!(bands.classify(9.9), Severity::Low);
        assert_eq!(bands.classify(10.0), Severity::Medium);
        assert_eq!(bands.classify(20.0), Severity::High);
    }
}
