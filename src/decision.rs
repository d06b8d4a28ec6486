/// Decision tables: exactly one winning branch per evaluation.
///
/// Where the rule engine keeps every match, a decision table walks its
/// branches in order and stops at the first condition that holds. The
/// `otherwise` outcome is mandatory and supplied at construction, so `decide`
/// always yields one advisory unless the input itself is invalid.
///
/// Conditions return `Result` so a table can reject a snapshot that lacks the
/// readings it depends on (`AdvisoryError::InvalidInput`) instead of quietly
/// falling through to `otherwise`.
use crate::{
    advisory::{Advisory, Category, Severity},
    engine::Template,
    error::Result,
    snapshot::MetricSnapshot,
};
use std::fmt;
use std::sync::Arc;

pub type Condition = Arc<dyn Fn(&MetricSnapshot) -> Result<bool> + Send + Sync>;

/// What a branch produces when it wins.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub id:       String,
    pub severity: Severity,
    message:      Template,
    action:       Option<Template>,
}

impl Outcome {
    pub fn new(id: &str, severity: Severity, message: Template) -> Self {
        Self { id: id.to_owned(), severity, message, action: None }
    }

    pub fn action(mut self, action: Template) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Clone)]
struct Branch {
    condition: Condition,
    outcome:   Outcome,
}

#[derive(Clone)]
pub struct DecisionTable {
    pub id:       String,
    pub title:    String,
    pub category: Category,
    branches:     Vec<Branch>,
    otherwise:    Outcome,
}

impl DecisionTable {
    pub fn new(id: &str, title: &str, category: Category, otherwise: Outcome) -> Self {
        Self {
            id:       id.to_owned(),
            title:    title.to_owned(),
            category,
            branches: Vec::new(),
            otherwise,
        }
    }

    /// Appends a branch; earlier branches take precedence.
    pub fn branch<F>(mut self, condition: F, outcome: Outcome) -> Self
    where
        F: Fn(&MetricSnapshot) -> Result<bool> + Send + Sync + 'static,
    {
        self.branches.push(Branch { condition: Arc::new(condition), outcome });
        self
    }

    pub fn decide(&self, snapshot: &MetricSnapshot) -> Result<Advisory> {
        let mut winner = &self.otherwise;
        for branch in &self.branches {
            if (branch.condition)(snapshot)? {
                winner = &branch.outcome;
                break;
            }
        }

        tracing::debug!("Decision '{}' → '{}'", self.id, winner.id);

        let mut advisory = Advisory::new(
            &format!("{}.{}", self.id, winner.id),
            self.category,
            winner.severity,
            &self.title,
            winner.message.apply(snapshot)?,
        );
        if let Some(action) = &winner.action {
            advisory.action = Some(action.apply(snapshot)?);
        }
        Ok(advisory)
    }
}

impl fmt::Debug for DecisionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.branches.iter().map(|b| b.outcome.id.as_str()).collect();
        f.debug_struct("DecisionTable")
            .field("id", &self.id)
            .field("branches", &ids)
            .field("otherwise", &self.otherwise.id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisoryError;

    fn moisture_table() -> DecisionTable {
        DecisionTable::new(
            "moisture",
            "Moisture",
            Category::Recommendation,
            Outcome::new("steady", Severity::Low, Template::text("steady")),
        )
        .branch(
            |s| Ok(s.require_number("humidity")? < 40.0),
            Outcome::new("dry", Severity::Medium, Template::text("dry at {humidity}%")),
        )
        .branch(
            |s| Ok(s.require_number("humidity")? < 60.0),
            Outcome::new("mild", Severity::Low, Template::text("mild")),
        )
    }

    #[test]
    fn first_matching_branch_wins() {
        let snap = MetricSnapshot::builder().number("humidity", 30.0).build();
        let a    = moisture_table().decide(&snap).unwrap();
        assert_eq!(a.rule_id, "moisture.dry");
        assert_eq!(a.message, "dry at 30%");
        assert_eq!(a.severity, Severity::Medium);
    }

    #[test]
    fn falls_back_to_otherwise() {
        let snap = MetricSnapshot::builder().number("humidity", 75.0).build();
        assert_eq!(moisture_table().decide(&snap).unwrap().rule_id, "moisture.steady");
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = moisture_table().decide(&MetricSnapshot::default()).unwrap_err();
        assert!(matches!(err, AdvisoryError::InvalidInput { ref field, .. } if field == "humidity"));
    }
}
