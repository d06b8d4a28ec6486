/// Advisor configuration, persisted as TOML in the config directory.
///
/// Example `config.toml`:
///
///   log_filter = "ecohealth_advisor=debug"
///
///   [no_show]
///   advance_booking = 0.0
///
///   [risk_bands]
///   medium_below = 25.0
///
/// Every field has a default, so a missing file or a partial file is fine.
use crate::no_show::{NoShowWeights, RiskBands};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

// ---------------------------------------------------------------------------
// AdvisorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Directory for the rolling `advisor.log`. Empty = `<config dir>/logs`.
    #[serde(default)]
    pub log_dir: PathBuf,

    /// `tracing` filter directive, e.g. "ecohealth_advisor=debug".
    /// `RUST_LOG` directives are applied on top.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Factor weights for the appointment no-show score.
    #[serde(default)]
    pub no_show: NoShowWeights,

    /// Percent cut-offs for low / medium / high no-show risk.
    #[serde(default)]
    pub risk_bands: RiskBands,
}

fn default_log_filter() -> String {
    "ecohealth_advisor=info".to_owned()
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            log_dir:    PathBuf::new(),
            log_filter: default_log_filter(),
            no_show:    NoShowWeights::default(),
            risk_bands: RiskBands::default(),
        }
    }
}

impl AdvisorConfig {
    pub fn resolved_log_dir(&self, config_dir: &Path) -> PathBuf {
        if self.log_dir.as_os_str().is_empty() {
            config_dir.join("logs")
        } else {
            self.log_dir.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AdvisorConfig> {
    let path = config_dir.join(CONFIG_FILE);
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AdvisorConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error in {}: {}", path.display(), e))?;
        Ok(cfg)
    } else {
        Ok(AdvisorConfig::default())
    }
}

pub fn save(config: &AdvisorConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join(CONFIG_FILE), raw)?;
    Ok(())
}
