/// Declarative threshold rules loaded from TOML.
///
/// Lets a deployment add simple "metric above/below value" advisories without
/// code. A rule file looks like:
///
///   [default]
///   id       = "vitals_stable"
///   title    = "Vitals Stable"
///   message  = "All readings within range."
///
///   [[rule]]
///   id       = "tachycardia"
///   title    = "Elevated Heart Rate"
///   metric   = "heartRate"
///   op       = "gt"
///   value    = 100
///   severity = "high"
///   message  = "Heart rate at {heartRate} bpm."
///   action   = "Notify the on-call clinician"
///
/// `severity` defaults to medium, `category` to alert. The compiled rules go
/// through the ordinary rule engine, so file order is output order and the
/// `[default]` table is mandatory.
use crate::{
    advisory::{Advisory, Category, Severity},
    engine::{Rule, RuleEngineConfig, Template},
    error::ConfigError,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Compare operator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
}

impl FromStr for CompareOp {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greater_than" | "gt"   => Ok(Self::GreaterThan),
            "less_than" | "lt"      => Ok(Self::LessThan),
            "greater_equal" | "gte" => Ok(Self::GreaterEqual),
            "less_equal" | "lte"    => Ok(Self::LessEqual),
            _ => Err(ConfigError::UnknownOperator(s.to_owned())),
        }
    }
}

impl CompareOp {
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan  => value > threshold,
            Self::LessThan     => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual    => value <= threshold,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::GreaterThan  => "above",
            Self::LessThan     => "below",
            Self::GreaterEqual => "at or above",
            Self::LessEqual    => "at or below",
        }
    }
}

// ---------------------------------------------------------------------------
// TOML deserialization structs (private)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TomlRuleFile {
    default: Option<TomlAdvisory>,
    #[serde(default)]
    rule:    Vec<TomlRule>,
}

#[derive(Deserialize)]
struct TomlAdvisory {
    id:       String,
    title:    String,
    message:  String,
    action:   Option<String>,
    severity: Option<String>,
    category: Option<String>,
}

#[derive(Deserialize)]
struct TomlRule {
    id:       String,
    title:    String,
    metric:   String,
    op:       String,
    value:    f64,
    severity: Option<String>,
    category: Option<String>,
    message:  Option<String>,
    action:   Option<String>,
}

fn severity_or(raw: Option<&str>, fallback: Severity) -> Result<Severity, ConfigError> {
    raw.map(Severity::from_str).unwrap_or(Ok(fallback))
}

fn category_or_alert(raw: Option<&str>) -> Result<Category, ConfigError> {
    raw.map(Category::from_str).unwrap_or(Ok(Category::Alert))
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn compile_rule(def: TomlRule) -> Result<Rule, ConfigError> {
    let op       = CompareOp::from_str(&def.op)?;
    let severity = severity_or(def.severity.as_deref(), Severity::Medium)?;
    let category = category_or_alert(def.category.as_deref())?;
    let message  = def.message.unwrap_or_else(|| {
        format!("{} is {} {}", def.metric, op.describe(), def.value)
    });

    let message = checked(&def.id, Template::text(message))?;
    let action  = def.action.map(|a| checked(&def.id, Template::text(a))).transpose()?;

    let metric    = def.metric;
    let threshold = def.value;
    let mut rule = Rule::new(&def.id, &def.title, category, severity, move |s| {
        Ok(s.number(&metric).is_some_and(|v| op.check(v, threshold)))
    })
    .message(message);

    if let Some(action) = action {
        rule = rule.action(action);
    }
    Ok(rule)
}

/// Brace mistakes in a hand-written file are reported at load time, not as a
/// rule that silently never fires.
fn checked(rule_id: &str, template: Template) -> Result<Template, ConfigError> {
    template.check().map_err(|e| ConfigError::MalformedTemplate {
        rule:   rule_id.to_owned(),
        reason: e.to_string(),
    })?;
    Ok(template)
}

fn compile_default(def: TomlAdvisory) -> Result<Advisory, ConfigError> {
    let severity = severity_or(def.severity.as_deref(), Severity::Low)?;
    let category = category_or_alert(def.category.as_deref())?;
    let mut advisory = Advisory::new(&def.id, category, severity, &def.title, def.message);
    advisory.action = def.action;
    Ok(advisory)
}

/// Parse a rule file into an engine config.
pub fn parse_rule_file(raw: &str) -> Result<RuleEngineConfig, ConfigError> {
    let file: TomlRuleFile = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let rules = file
        .rule
        .into_iter()
        .map(compile_rule)
        .collect::<Result<Vec<_>, _>>()?;

    RuleEngineConfig::builder()
        .rules(rules)
        .default_advisory(compile_default(file.default.ok_or(ConfigError::MissingDefaultAdvisory)?)?)
        .build()
}

pub fn load_rule_file(path: &Path) -> Result<RuleEngineConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading rule file {}", path.display()))?;
    let config = parse_rule_file(&raw)
        .with_context(|| format!("compiling rule file {}", path.display()))?;
    tracing::info!("Loaded {} threshold rules from {}", config.rules().len(), path.display());
    Ok(config)
}
