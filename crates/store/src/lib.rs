//! `tally-store`: persists [`RecordValidation`]s in SQLite and answers
//! aggregate reporting queries.

mod sqlite;

pub use sqlite::{SqliteStore, StoreError};

pub use tally_recon::store::{DateRange, RecordStore};
pub use tally_recon::{RecordStats, RecordValidation};
