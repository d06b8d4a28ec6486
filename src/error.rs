/// Error kinds surfaced by the advisory core.
///
/// `RuleEvaluationError` never escapes the engine: it is caught per rule,
/// logged, and the rule is treated as not matching. `AdvisoryError` is what
/// decision tables, the no-show scorer and the ingest layer hand back to the
/// caller. `ConfigError` is raised while building or loading rule sets.
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleEvaluationError {
    #[error("metric '{0}' is missing or has the wrong type")]
    MissingMetric(String),

    #[error("index {index} out of range for '{list}' (len {len})")]
    IndexOutOfRange {
        list:  String,
        index: usize,
        len:   usize,
    },

    #[error("malformed template: {0}")]
    MalformedTemplate(String),

    #[error("rule panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("rule engine config has no default advisory")]
    MissingDefaultAdvisory,

    #[error("unknown compare operator: {0}")]
    UnknownOperator(String),

    #[error("unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("rule '{rule}' has a malformed template: {reason}")]
    MalformedTemplate {
        rule:   String,
        reason: String,
    },

    #[error("rule file parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("invalid input for '{field}': {reason}")]
    InvalidInput {
        field:  String,
        reason: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rule(#[from] RuleEvaluationError),

    #[error("payload decode error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl AdvisoryError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field:  field.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = AdvisoryError> = std::result::Result<T, E>;
