//! `tally-recon`: multi-source reconciliation core.
//!
//! Pure engine crate: receives observations from several sources, returns a
//! consensus value and a confidence score per field plus a record-level
//! aggregate. No network or database dependencies.

pub mod anomaly;
pub mod categorical;
pub mod config;
pub mod engine;
pub mod error;
pub mod feed;
pub mod field;
pub mod model;
pub mod numeric;
pub mod record;
pub mod registry;
pub mod stats;
pub mod store;
pub mod value;

pub use config::{Baseline, DomainConfig, ReconConfig};
pub use engine::Reconciler;
pub use error::ReconError;
pub use feed::{CsvFeed, JsonFeed, SourceFeed};
pub use model::{Discrepancy, FieldValidation, RecordValidation};
pub use registry::{ReliabilityRegistry, SharedRegistry};
pub use stats::RecordStats;
pub use store::{DateRange, RecordStore};
pub use value::{Observation, SourceSet, Value};
