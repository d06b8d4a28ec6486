pub mod advisory;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod no_show;
pub mod rules;
pub mod snapshot;

pub use advisory::{Advisory, Category, Severity};
pub use decision::{DecisionTable, Outcome};
pub use engine::{add_rule, evaluate, Rule, RuleEngineConfig, Template};
pub use error::{AdvisoryError, ConfigError, RuleEvaluationError};
pub use snapshot::{MetricSnapshot, MetricValue};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE:       &str = "advisor.log";
const DEFAULT_FILTER: &str = "ecohealth_advisor=info";

// ---------------------------------------------------------------------------
// Logging: a daily rolling file in `log_dir`. RUST_LOG wins over the
// configured filter, which wins over the crate default.
// ---------------------------------------------------------------------------

/// Install the global subscriber and panic hook.
///
/// Returns the appender guard; the caller must hold it until exit or
/// buffered lines are lost.
pub fn init_logging(log_dir: &Path, filter: &str) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let directives = if filter.trim().is_empty() { DEFAULT_FILTER } else { filter };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives))
        .map_err(|e| anyhow::anyhow!("Invalid log filter '{}': {}", directives, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Logging already initialised: {}", e))?;

    // Panics outside rule evaluation would otherwise only reach stderr.
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());
        let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        tracing::error!("PANIC at {}: {}", location, message);
    }));

    tracing::info!("EcoHealth advisor v{} logging to {}", env!("CARGO_PKG_VERSION"), log_dir.display());
    Ok(guard)
}
