// tally CLI - reconcile observations from several sources into one trusted record

mod exit_codes;
mod report;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tally_config::Settings;
use tally_recon::{ReconConfig, ReconError};
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_ERROR, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Multi-source reconciliation: consensus values, confidence scores, anomaly flags")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate observations from a CSV or JSON file against a domain
    #[command(after_help = "\
Examples:
  tally validate week-18.csv --domain nfl
  tally validate week-18.csv --domain nfl --entity phi-sf --json
  tally validate night.json --domain nba --json --output night.result.json
  tally validate week-18.csv --domain nfl --save --db scores.db

Exit code 7 means at least one record has critical errors or anomalies.")]
    Validate {
        /// Observation file (.csv: entity_id,source,field,value[,domain]; .json: nested objects)
        file: PathBuf,

        /// Domain whose required fields and baseline apply
        #[arg(long)]
        domain: String,

        /// Validate a single entity instead of every entity in the file
        #[arg(long)]
        entity: Option<String>,

        /// Reconciliation config (TOML)
        #[arg(long, env = "TALLY_CONFIG")]
        config: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Persist every validation to the record store
        #[arg(long)]
        save: bool,

        /// Record store (SQLite)
        #[arg(long, env = "TALLY_DB")]
        db: Option<PathBuf>,
    },

    /// Aggregate stored validations for a domain over a date range
    #[command(after_help = "\
Examples:
  tally report --domain nfl
  tally report --domain nfl --from 2026-01-01 --to 2026-01-31 --json")]
    Report {
        /// Domain to report on
        #[arg(long)]
        domain: String,

        /// First day included (YYYY-MM-DD); defaults to report.defaultDays ago
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD); defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Record store (SQLite)
        #[arg(long, env = "TALLY_DB")]
        db: Option<PathBuf>,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,
    },

    /// Reconciliation config commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Parse and validate a config without running anything
    #[command(after_help = "\
Examples:
  tally config check
  tally config check --config ./sports.toml")]
    Check {
        /// Reconciliation config (TOML)
        #[arg(long, env = "TALLY_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // stdout is reserved for JSON output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let settings = Settings::load();
    init_logging(&settings);

    let result = match cli.command {
        Commands::Validate { file, domain, entity, config, json, output, save, db } => {
            validate::cmd_validate(
                &settings,
                validate::ValidateArgs { file, domain, entity, config, json, output, save, db },
            )
        }
        Commands::Report { domain, from, to, db, json } => {
            report::cmd_report(&settings, domain, from, to, db, json)
        }
        Commands::Config { command } => match command {
            ConfigCommands::Check { config } => cmd_config_check(&settings, config),
        },
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::new(EXIT_STORE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let code = recon_exit_code(&err);
        let hint = match &err {
            ReconError::UnknownDomain(_) => Some("run `tally config check` to list configured domains"),
            ReconError::ConfigValidation(_) => {
                Some("weights and thresholds must lie in [0, 1]; every domain needs required_fields")
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint: hint.map(String::from) }
    }
}

/// Load the reconciliation config, resolving its path through flag, env
/// and settings.
pub fn load_config(settings: &Settings, explicit: Option<PathBuf>) -> Result<ReconConfig, CliError> {
    let path = settings.resolve_config_path(explicit);
    tracing::debug!(path = %path.display(), "loading reconciliation config");
    ReconConfig::from_file(&path).map_err(|e| match e {
        ReconError::Io(io) => CliError::new(
            exit_codes::EXIT_INVALID_CONFIG,
            format!("cannot read config {}: {io}", path.display()),
        )
        .with_hint("pass --config or set TALLY_CONFIG"),
        other => CliError::from(other),
    })
}

fn cmd_config_check(settings: &Settings, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(settings, config)?;

    println!(
        "config ok: {} source(s), {} domain(s), acceptance threshold {:.2}",
        config.sources.len(),
        config.domains.len(),
        config.acceptance_threshold,
    );
    for (name, domain) in &config.domains {
        println!(
            "  {name}: {} field(s){}",
            domain.required_fields.len(),
            if domain.baseline.is_some() { ", baseline" } else { "" },
        );
    }
    Ok(())
}
