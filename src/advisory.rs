/// Output unit of every evaluator in the crate.
///
/// Advisories are plain data: they are rendered, transmitted or discarded by
/// the caller and never stored here.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Severity / category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low"    => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high"   => Ok(Self::High),
            _ => Err(ConfigError::UnknownSeverity(s.to_owned())),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low    => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High   => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Alert,
    Recommendation,
    Risk,
}

impl FromStr for Category {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alert"          => Ok(Self::Alert),
            "recommendation" => Ok(Self::Recommendation),
            "risk"           => Ok(Self::Risk),
            _ => Err(ConfigError::UnknownCategory(s.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    pub rule_id:    String,
    pub category:   Category,
    pub severity:   Severity,
    pub title:      String,
    pub message:    String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action:     Option<String>,
    /// 0–100 when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Advisory {
    pub fn new(
        rule_id:  &str,
        category: Category,
        severity: Severity,
        title:    &str,
        message:  impl Into<String>,
    ) -> Self {
        Self {
            rule_id:    rule_id.to_owned(),
            category,
            severity,
            title:      title.to_owned(),
            message:    message.into(),
            action:     None,
            confidence: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Clamped into 0–100.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 100.0));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_without_empty_options() {
        let a = Advisory::new("high_humidity", Category::Alert, Severity::High, "High Humidity Alert", "msg");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["ruleId"], "high_humidity");
        assert_eq!(json["severity"], "high");
        assert!(json.get("action").is_none());
        assert!(json.get("confidence").is_none());
    }

    #[test]
    fn parses_severity_and_category_case_insensitively() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert_eq!("Risk".parse::<Category>().unwrap(), Category::Risk);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn confidence_is_clamped() {
        let a = Advisory::new("x", Category::Risk, Severity::Low, "t", "m").with_confidence(140.0);
        assert_eq!(a.confidence, Some(100.0));
    }
}
