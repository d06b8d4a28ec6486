/// Rule accumulator: the core of the advisory pipeline.
///
/// Evaluates an ordered list of rules against one snapshot. Every matching
/// rule contributes one advisory, in stored order; there is no early exit.
/// When nothing matches, the config's default advisory is returned verbatim,
/// so the output always has at least one element.
///
/// Each rule runs in isolation: an error or a panic inside a predicate or a
/// template is logged with the rule id and counted as "did not match". The
/// remaining rules still run.
use crate::{
    advisory::{Advisory, Category, Severity},
    error::{ConfigError, RuleEvaluationError},
    snapshot::MetricSnapshot,
};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

pub type Predicate =
    Arc<dyn Fn(&MetricSnapshot) -> Result<bool, RuleEvaluationError> + Send + Sync>;
pub type Renderer =
    Arc<dyn Fn(&MetricSnapshot) -> Result<String, RuleEvaluationError> + Send + Sync>;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Message or action text for a rule.
///
/// `Text` substitutes `{metric}` placeholders from top-level scalar readings
/// (`{{` and `}}` are literal braces). `Render` builds the text from the whole
/// snapshot, for messages that cite nested records.
#[derive(Clone)]
pub enum Template {
    Text(String),
    Render(Renderer),
}

impl Template {
    pub fn text(s: impl Into<String>) -> Self {
        Template::Text(s.into())
    }

    pub fn render<F>(f: F) -> Self
    where
        F: Fn(&MetricSnapshot) -> Result<String, RuleEvaluationError> + Send + Sync + 'static,
    {
        Template::Render(Arc::new(f))
    }

    /// Checks `{}` placement without a snapshot. `Render` templates always pass.
    pub fn check(&self) -> Result<(), RuleEvaluationError> {
        match self {
            Template::Text(t)   => pieces(t).map(|_| ()),
            Template::Render(_) => Ok(()),
        }
    }

    pub fn apply(&self, snapshot: &MetricSnapshot) -> Result<String, RuleEvaluationError> {
        match self {
            Template::Text(t)   => substitute(t, snapshot),
            Template::Render(f) => f(snapshot),
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Text(t)   => f.debug_tuple("Text").field(t).finish(),
            Template::Render(_) => f.write_str("Render(<fn>)"),
        }
    }
}

enum Piece<'a> {
    Literal(char),
    Metric(&'a str),
}

/// Splits a text template into literal characters and `{metric}` references.
/// An unclosed `{` or a lone `}` is a `MalformedTemplate` error.
fn pieces(template: &str) -> Result<Vec<Piece<'_>>, RuleEvaluationError> {
    let malformed = |reason: &str| {
        RuleEvaluationError::MalformedTemplate(format!("{} in \"{}\"", reason, template))
    };

    let mut out  = Vec::new();
    let mut rest = template.char_indices().peekable();

    while let Some((i, c)) = rest.next() {
        match c {
            '{' if rest.peek().map(|&(_, n)| n) == Some('{') => {
                rest.next();
                out.push(Piece::Literal('{'));
            }
            '}' if rest.peek().map(|&(_, n)| n) == Some('}') => {
                rest.next();
                out.push(Piece::Literal('}'));
            }
            '{' => {
                let start = i + 1;
                let end = loop {
                    match rest.next() {
                        Some((j, '}')) => break j,
                        Some(_) => {}
                        None => return Err(malformed("unclosed '{'")),
                    }
                };
                out.push(Piece::Metric(template[start..end].trim()));
            }
            '}' => return Err(malformed("unmatched '}'")),
            _ => out.push(Piece::Literal(c)),
        }
    }
    Ok(out)
}

fn substitute(template: &str, snapshot: &MetricSnapshot) -> Result<String, RuleEvaluationError> {
    let mut out = String::with_capacity(template.len());
    for piece in pieces(template)? {
        match piece {
            Piece::Literal(c) => out.push(c),
            Piece::Metric(key) => {
                let value = snapshot
                    .get(key)
                    .and_then(|v| v.render())
                    .ok_or_else(|| RuleEvaluationError::MissingMetric(key.to_owned()))?;
                out.push_str(&value);
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Rule {
    pub id:       String,
    pub title:    String,
    pub category: Category,
    pub severity: Severity,
    predicate:    Predicate,
    message:      Template,
    action:       Option<Template>,
}

impl Rule {
    /// A rule with an empty message; set one with [`Rule::message`].
    pub fn new<F>(id: &str, title: &str, category: Category, severity: Severity, predicate: F) -> Self
    where
        F: Fn(&MetricSnapshot) -> Result<bool, RuleEvaluationError> + Send + Sync + 'static,
    {
        Self {
            id:        id.to_owned(),
            title:     title.to_owned(),
            category,
            severity,
            predicate: Arc::new(predicate),
            message:   Template::text(""),
            action:    None,
        }
    }

    pub fn message(mut self, message: Template) -> Self {
        self.message = message;
        self
    }

    pub fn action(mut self, action: Template) -> Self {
        self.action = Some(action);
        self
    }

    /// Runs the predicate and, on a match, renders the advisory.
    pub fn fire(&self, snapshot: &MetricSnapshot) -> Result<Option<Advisory>, RuleEvaluationError> {
        if !(self.predicate)(snapshot)? {
            return Ok(None);
        }

        let mut advisory = Advisory::new(
            &self.id,
            self.category,
            self.severity,
            &self.title,
            self.message.apply(snapshot)?,
        );
        if let Some(action) = &self.action {
            advisory.action = Some(action.apply(snapshot)?);
        }
        Ok(Some(advisory))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("severity", &self.severity)
            .field("message", &self.message)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RuleEngineConfig {
    rules:            Vec<Rule>,
    default_advisory: Advisory,
}

impl RuleEngineConfig {
    pub fn new(rules: Vec<Rule>, default_advisory: Advisory) -> Self {
        Self { rules, default_advisory }
    }

    pub fn builder() -> RuleEngineConfigBuilder {
        RuleEngineConfigBuilder::default()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_advisory(&self) -> &Advisory {
        &self.default_advisory
    }

    /// Returns a new config with `rule` appended last. `self` is unchanged.
    pub fn add_rule(&self, rule: Rule) -> Self {
        let mut next = self.clone();
        next.rules.push(rule);
        next
    }
}

#[derive(Debug, Default)]
pub struct RuleEngineConfigBuilder {
    rules:            Vec<Rule>,
    default_advisory: Option<Advisory>,
}

impl RuleEngineConfigBuilder {
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    pub fn default_advisory(mut self, advisory: Advisory) -> Self {
        self.default_advisory = Some(advisory);
        self
    }

    pub fn build(self) -> Result<RuleEngineConfig, ConfigError> {
        let default_advisory = self
            .default_advisory
            .ok_or(ConfigError::MissingDefaultAdvisory)?;
        Ok(RuleEngineConfig { rules: self.rules, default_advisory })
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate every rule in `config` against `snapshot`, in stored order.
pub fn evaluate(snapshot: &MetricSnapshot, config: &RuleEngineConfig) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    for rule in &config.rules {
        match fire_isolated(rule, snapshot) {
            Ok(Some(advisory)) => {
                tracing::debug!("Rule '{}' matched ({})", rule.id, advisory.severity);
                advisories.push(advisory);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(rule_id = %rule.id, "Rule evaluation failed, treating as no match: {}", e);
            }
        }
    }

    if advisories.is_empty() {
        tracing::debug!("No rule matched, using default '{}'", config.default_advisory.rule_id);
        advisories.push(config.default_advisory.clone());
    }
    advisories
}

/// Free-function form of [`RuleEngineConfig::add_rule`].
pub fn add_rule(config: &RuleEngineConfig, rule: Rule) -> RuleEngineConfig {
    config.add_rule(rule)
}

fn fire_isolated(rule: &Rule, snapshot: &MetricSnapshot) -> Result<Option<Advisory>, RuleEvaluationError> {
    catch_unwind(AssertUnwindSafe(|| rule.fire(snapshot)))
        .unwrap_or_else(|payload| Err(RuleEvaluationError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
