//! `tally report`: aggregate stats over stored validations.

use std::path::PathBuf;

use chrono::{Days, NaiveDate, Utc};
use tally_config::Settings;
use tally_store::{DateRange, RecordStats, RecordStore, SqliteStore};

use crate::CliError;

pub fn cmd_report(
    settings: &Settings,
    domain: String,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    db: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let to = to.unwrap_or_else(|| Utc::now().date_naive());
    let from = match from {
        Some(from) => from,
        None => default_from(to, settings.report_default_days),
    };
    if from > to {
        return Err(CliError::usage(format!("--from {from} is after --to {to}")));
    }

    let db_path = settings.resolve_database_path(db);
    if !db_path.exists() {
        return Err(CliError::store(format!("no record store at {}", db_path.display()))
            .with_hint("run `tally validate ... --save` first, or pass --db"));
    }
    let store = SqliteStore::open(&db_path)
        .map_err(|e| CliError::store(format!("cannot open {}: {e}", db_path.display())))?;

    let stats = store
        .load_recent(&domain, &DateRange::days(from, to))
        .map_err(|e| CliError::store(format!("cannot query {}: {e}", db_path.display())))?;

    if json {
        let json_str = serde_json::to_string_pretty(&ReportOutput { domain: &domain, from, to, stats: &stats })
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        print_human(&domain, from, to, &stats);
    }
    Ok(())
}

/// `days` whole days ending on `to`, inclusive.
fn default_from(to: NaiveDate, days: u32) -> NaiveDate {
    to.checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN)
}

#[derive(serde::Serialize)]
struct ReportOutput<'a> {
    domain: &'a str,
    from: NaiveDate,
    to: NaiveDate,
    #[serde(flatten)]
    stats: &'a RecordStats,
}

fn print_human(domain: &str, from: NaiveDate, to: NaiveDate, stats: &RecordStats) {
    println!("{domain} {from} .. {to}");
    if stats.count == 0 {
        println!("  no validations");
        return;
    }
    println!("  records:          {}", stats.count);
    println!("  avg confidence:   {:.2}", stats.avg_confidence);
    println!("  high confidence:  {:.1}%", stats.high_confidence_rate * 100.0);
    println!("  critical errors:  {}", stats.critical_error_count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_window_includes_today() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        assert_eq!(default_from(today, 7), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert_eq!(default_from(today, 1), today);
        assert_eq!(default_from(today, 0), today);
    }

    #[test]
    fn report_json_is_flat() {
        let stats = RecordStats { count: 2, avg_confidence: 0.9, high_confidence_rate: 0.5, critical_error_count: 1 };
        let day = NaiveDate::from_ymd_opt(2026, 1, 11).unwrap();
        let value = serde_json::to_value(ReportOutput { domain: "nfl", from: day, to: day, stats: &stats }).unwrap();
        assert_eq!(value["domain"], "nfl");
        assert_eq!(value["from"], "2026-01-11");
        assert_eq!(value["count"], 2);
        assert_eq!(value["critical_error_count"], 1);
    }
}
