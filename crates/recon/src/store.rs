//! Record store boundary. The core only produces [`RecordValidation`]s;
//! persistence lives behind this trait.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::RecordValidation;
use crate::stats::{summarize, RecordStats};

/// Inclusive range over validation timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Whole calendar days, `from` 00:00:00 through `to` 23:59:59.999.
    pub fn days(from: NaiveDate, to: NaiveDate) -> Self {
        let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        Self {
            from: from.and_time(NaiveTime::MIN).and_utc(),
            to: to.and_time(end).and_utc(),
        }
    }

    /// Everything ever stored.
    pub fn all() -> Self {
        Self {
            from: DateTime::<Utc>::MIN_UTC,
            to: DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        self.from <= *at && *at <= self.to
    }
}

pub trait RecordStore {
    type Error: std::error::Error;

    fn save(&mut self, record: &RecordValidation) -> Result<(), Self::Error>;

    fn load_recent(&self, domain: &str, range: &DateRange) -> Result<RecordStats, Self::Error>;
}

/// Vec-backed store. Used in tests and for one-shot runs that never persist.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<RecordValidation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[RecordValidation] {
        &self.records
    }
}

impl RecordStore for MemoryStore {
    type Error = std::convert::Infallible;

    fn save(&mut self, record: &RecordValidation) -> Result<(), Self::Error> {
        self.records.push(record.clone());
        Ok(())
    }

    fn load_recent(&self, domain: &str, range: &DateRange) -> Result<RecordStats, Self::Error> {
        Ok(summarize(
            self.records
                .iter()
                .filter(|r| r.domain == domain && range.contains(&r.timestamp)),
        ))
    }
}
