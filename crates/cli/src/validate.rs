//! `tally validate`: reconcile an observation file against one domain.

use std::path::{Path, PathBuf};

use tally_config::Settings;
use tally_recon::{CsvFeed, JsonFeed, RecordValidation, Reconciler, SourceFeed, SourceSet};
use tally_store::{RecordStore, SqliteStore};
use tracing::info;

use crate::exit_codes::{EXIT_INPUT, EXIT_NEEDS_REVIEW};
use crate::{load_config, CliError};

pub struct ValidateArgs {
    pub file: PathBuf,
    pub domain: String,
    pub entity: Option<String>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub save: bool,
    pub db: Option<PathBuf>,
}

pub fn cmd_validate(settings: &Settings, args: ValidateArgs) -> Result<(), CliError> {
    let reconciler = Reconciler::new(load_config(settings, args.config.clone())?);
    // Fail on an unknown domain before reading any input.
    reconciler.config().domain(&args.domain)?;

    let feed = load_feed(&args.file)?;

    let records = match args.entity {
        Some(ref entity_id) => vec![reconciler.validate_feed(feed.as_ref(), entity_id, &args.domain)?],
        None => {
            let entities = collect_entities(feed.as_ref(), &args.domain)?;
            if entities.is_empty() {
                return Err(CliError::new(
                    EXIT_INPUT,
                    format!("no entities for domain '{}' in {}", args.domain, args.file.display()),
                ));
            }
            reconciler.validate_batch(&args.domain, &entities)?
        }
    };

    // A single --entity prints an object, a batch prints an array.
    let json_str = if args.entity.is_some() {
        serde_json::to_string_pretty(&records[0])
    } else {
        serde_json::to_string_pretty(&records)
    }
    .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::general(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    if args.save {
        let db_path = settings.resolve_database_path(args.db);
        let mut store = SqliteStore::open(&db_path)
            .map_err(|e| CliError::store(format!("cannot open {}: {e}", db_path.display())))?;
        for record in &records {
            store
                .save(record)
                .map_err(|e| CliError::store(format!("cannot save {}: {e}", record.entity_id)))?;
        }
        info!(path = %db_path.display(), records = records.len(), "saved validations");
        eprintln!("saved {} record(s) to {}", records.len(), db_path.display());
    }

    // Human summary to stderr
    for record in &records {
        eprintln!("{}", summary_line(record));
    }

    let needs_review = records.iter().filter(|r| !r.is_clean()).count();
    if needs_review > 0 {
        return Err(CliError::new(
            EXIT_NEEDS_REVIEW,
            format!("{needs_review} of {} record(s) need review", records.len()),
        ));
    }

    Ok(())
}

enum FeedFormat {
    Csv,
    Json,
}

/// Pick the feed parser from the file extension.
fn load_feed(path: &Path) -> Result<Box<dyn SourceFeed>, CliError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let format = match extension.as_deref() {
        Some("csv") => FeedFormat::Csv,
        Some("json") => FeedFormat::Json,
        _ => {
            return Err(CliError::usage(format!(
                "unsupported observation file: {}",
                path.display()
            ))
            .with_hint("use a .csv or .json file"))
        }
    };

    let data = std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_INPUT, format!("cannot read {}: {e}", path.display())))?;
    let input_err = |e: tally_recon::ReconError| CliError::new(EXIT_INPUT, format!("{}: {e}", path.display()));

    let feed: Box<dyn SourceFeed> = match format {
        FeedFormat::Csv => Box::new(CsvFeed::from_csv(&data).map_err(input_err)?),
        FeedFormat::Json => Box::new(JsonFeed::from_json(&data).map_err(input_err)?),
    };
    Ok(feed)
}

fn collect_entities(feed: &dyn SourceFeed, domain: &str) -> Result<Vec<(String, SourceSet)>, CliError> {
    let mut entities = Vec::new();
    for id in feed.entity_ids(domain) {
        let set = feed.fetch_observations(&id, domain)?;
        entities.push((id, set));
    }
    Ok(entities)
}

fn summary_line(record: &RecordValidation) -> String {
    let status = if record.is_clean() {
        "ok"
    } else {
        "REVIEW"
    };
    format!(
        "{}: {status} confidence {:.2}, {} warning(s), {} critical, {} anomal{}",
        record.entity_id,
        record.overall_confidence,
        record.warnings.len(),
        record.critical_errors.len(),
        record.anomalies.len(),
        if record.anomalies.len() == 1 { "y" } else { "ies" },
    )
}
