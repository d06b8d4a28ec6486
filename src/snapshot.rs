/// Immutable bundle of named readings that rules and decision tables read from.
///
/// A snapshot is built once (via `SnapshotBuilder` or deserialized from a JSON
/// object) and then only read. Every accessor is total: a missing key or a
/// value of the wrong shape comes back as `None`, never a panic, so rule
/// predicates can stay total without extra plumbing.
use crate::error::{AdvisoryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Nested records, e.g. one entry per forecast day.
    Records(Vec<MetricSnapshot>),
    /// JSON `null`; kept so an optional field never fails the whole snapshot.
    Null,
}

impl MetricValue {
    /// Text form used for `{placeholder}` substitution.
    /// Integral numbers print without a fractional part (60, not 60.0).
    pub fn render(&self) -> Option<String> {
        match self {
            MetricValue::Number(n) if !n.is_finite() => None,
            MetricValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            MetricValue::Number(n) => Some(n.to_string()),
            MetricValue::Text(s)   => Some(s.clone()),
            MetricValue::Bool(b)   => Some(b.to_string()),
            MetricValue::Records(_) | MetricValue::Null => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSnapshot {
    metrics: BTreeMap<String, MetricValue>,
}

impl MetricSnapshot {
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    /// Parse a snapshot from a JSON object such as
    /// `{"humidity": 85, "forecastDays": [{"day": "Mon", "rain": 60}]}`.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let snapshot: MetricSnapshot = serde_json::from_str(raw)?;
        Ok(snapshot)
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.metrics.get(key)
    }

    /// Finite numeric reading. NaN and infinities read as absent.
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.metrics.get(key)? {
            MetricValue::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.metrics.get(key)? {
            MetricValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn records(&self, key: &str) -> Option<&[MetricSnapshot]> {
        match self.metrics.get(key)? {
            MetricValue::Records(r) => Some(r.as_slice()),
            _ => None,
        }
    }

    /// Like `number`, but a missing or malformed reading is an `InvalidInput`.
    pub fn require_number(&self, key: &str) -> Result<f64> {
        match self.metrics.get(key) {
            None => Err(AdvisoryError::invalid(key, "missing")),
            Some(MetricValue::Number(n)) if n.is_finite() => Ok(*n),
            Some(MetricValue::Number(_)) => Err(AdvisoryError::invalid(key, "not a finite number")),
            Some(_) => Err(AdvisoryError::invalid(key, "not numeric")),
        }
    }

    pub fn require_records(&self, key: &str) -> Result<&[MetricSnapshot]> {
        match self.metrics.get(key) {
            None => Err(AdvisoryError::invalid(key, "missing")),
            Some(MetricValue::Records(r)) => Ok(r.as_slice()),
            Some(_) => Err(AdvisoryError::invalid(key, "not a list of records")),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.metrics.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.metrics.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    metrics: BTreeMap<String, MetricValue>,
}

impl SnapshotBuilder {
    pub fn number(mut self, key: &str, value: f64) -> Self {
        self.metrics.insert(key.to_owned(), MetricValue::Number(value));
        self
    }

    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metrics.insert(key.to_owned(), MetricValue::Text(value.into()));
        self
    }

    pub fn records(mut self, key: &str, value: Vec<MetricSnapshot>) -> Self {
        self.metrics.insert(key.to_owned(), MetricValue::Records(value));
        self
    }

    pub fn build(self) -> MetricSnapshot {
        MetricSnapshot { metrics: self.metrics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_forecast_days() {
        let snap = MetricSnapshot::from_json_str(
            r#"{"humidity": 85, "condition": "Rain",
                "forecastDays": [{"day": "Mon", "rain": 60, "temp": 25}]}"#,
        )
        .unwrap();

        assert_eq!(snap.number("humidity"), Some(85.0));
        assert_eq!(snap.text("condition"), Some("Rain"));
        let days = snap.records("forecastDays").unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].text("day"), Some("Mon"));
        assert_eq!(days[0].number("rain"), Some(60.0));
    }

    #[test]
    fn accessors_are_total() {
        let snap = MetricSnapshot::builder().text("humidity", "high").build();
        assert_eq!(snap.number("humidity"), None);
        assert_eq!(snap.number("missing"), None);
        assert!(snap.records("humidity").is_none());
    }

    #[test]
    fn nan_reads_as_absent() {
        let snap = MetricSnapshot::builder().number("patientAge", f64::NAN).build();
        assert_eq!(snap.number("patientAge"), None);
        assert!(matches!(
            snap.require_number("patientAge"),
            Err(AdvisoryError::InvalidInput { .. })
        ));
    }

    #[test]
    fn render_drops_fraction_for_integers() {
        assert_eq!(MetricValue::Number(60.0).render().as_deref(), Some("60"));
        assert_eq!(MetricValue::Number(12.5).render().as_deref(), Some("12.5"));
        assert_eq!(MetricValue::Records(vec![]).render(), None);
        assert_eq!(MetricValue::Bool(false).render().as_deref(), Some("false"));
        assert_eq!(MetricValue::Null.render(), None);
    }

    #[test]
    fn booleans_and_nulls_parse_but_read_as_absent() {
        let snap = MetricSnapshot::from_json_str(
            r#"{"patientAge": 25, "reminderSent": false, "notes": null}"#,
        )
        .unwrap();

        assert_eq!(snap.get("reminderSent"), Some(&MetricValue::Bool(false)));
        assert_eq!(snap.get("notes"), Some(&MetricValue::Null));
        assert_eq!(snap.number("reminderSent"), None);
        assert_eq!(snap.text("notes"), None);
        assert!(snap.records("notes").is_none());
        assert_eq!(snap.number("patientAge"), Some(25.0));
    }
}
