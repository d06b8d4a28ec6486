use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use ecohealth_advisor::{
    config, engine, ingest, no_show,
    rules::{threshold, weather_alerts, weather_recommendations},
    MetricSnapshot,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "ecohealth-advisor",
    version,
    about = "Rule-based weather and clinic advisories from metric snapshots."
)]
struct Args {
    /// Directory holding config.toml (and logs/ unless log_dir is set).
    #[arg(long, global = true, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Weather alerts for a snapshot JSON file.
    Alerts { snapshot: PathBuf },
    /// Irrigation, pest control and harvesting recommendations.
    Recommend { snapshot: PathBuf },
    /// No-show risk for an appointment JSON file.
    NoShow { appointment: PathBuf },
    /// Evaluate a TOML threshold rule file against a snapshot.
    Evaluate {
        #[arg(short, long)]
        rules: PathBuf,
        snapshot: PathBuf,
    },
    /// Build a weather snapshot from OpenWeather current + forecast bodies.
    Ingest {
        #[arg(long)]
        current: PathBuf,
        #[arg(long)]
        forecast: PathBuf,
    },
    /// Write config.toml with every default filled in.
    InitConfig,
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn read_snapshot(path: &Path) -> anyhow::Result<MetricSnapshot> {
    let raw = read(path)?;
    MetricSnapshot::from_json_str(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NoShowReport {
    risk:     no_show::NoShowRisk,
    advisory: ecohealth_advisor::Advisory,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg  = config::load_or_default(&args.config_dir)?;

    let log_dir = cfg.resolved_log_dir(&args.config_dir);
    let _guard  = ecohealth_advisor::init_logging(&log_dir, &cfg.log_filter)?;
    tracing::info!("Running {:?}", args.command);

    match args.command {
        Command::Alerts { snapshot } => {
            let snap = read_snapshot(&snapshot)?;
            let out  = weather_alerts::generate_alerts(&snap);
            tracing::info!("{} alert(s) for {}", out.len(), snapshot.display());
            print_json(&out)
        }
        Command::Recommend { snapshot } => {
            let snap = read_snapshot(&snapshot)?;
            let out  = weather_recommendations::recommend(&snap)
                .with_context(|| format!("recommendations for {}", snapshot.display()))?;
            print_json(&out)
        }
        Command::NoShow { appointment } => {
            let snap = read_snapshot(&appointment)?;
            let risk = no_show::predict_no_show(&snap, &cfg.no_show, &cfg.risk_bands)
                .with_context(|| format!("scoring {}", appointment.display()))?;
            tracing::info!("No-show risk {}% ({})", risk, risk.band);
            let advisory = risk.to_advisory();
            print_json(&NoShowReport { risk, advisory })
        }
        Command::Evaluate { rules, snapshot } => {
            let rule_set = threshold::load_rule_file(&rules)?;
            let snap     = read_snapshot(&snapshot)?;
            print_json(&engine::evaluate(&snap, &rule_set))
        }
        Command::Ingest { current, forecast } => {
            let snap = ingest::weather_snapshot(&read(&current)?, &read(&forecast)?)
                .context("building weather snapshot")?;
            print_json(&snap)
        }
        Command::InitConfig => {
            config::save(&cfg, &args.config_dir)?;
            tracing::info!("Wrote {}", args.config_dir.join(config::CONFIG_FILE).display());
            Ok(())
        }
    }
}
