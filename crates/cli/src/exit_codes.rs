//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `tally` exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, unsupported input format)      |
//! | 3    | Reconciliation config failed to parse or validate         |
//! | 4    | Domain not present in the config                          |
//! | 5    | Observation file could not be read or parsed              |
//! | 6    | Record store could not be opened, written or queried      |
//! | 7    | Validation finished but records need review               |
//!
//! # Adding New Exit Codes
//!
//! Append; never renumber. Code 7 is the only "soft" failure: output has
//! already been written when it is returned.

use tally_recon::ReconError;

/// Success.
pub const EXIT_SUCCESS: u8 = 0;

/// General error (unspecified).
pub const EXIT_ERROR: u8 = 1;

/// CLI usage error (bad args, unknown file extension).
pub const EXIT_USAGE: u8 = 2;

/// Reconciliation config invalid (parse error, weight out of range, ...).
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// `--domain` names a domain the config does not define.
pub const EXIT_UNKNOWN_DOMAIN: u8 = 4;

/// Observation file unreadable or malformed, or entity not in the file.
pub const EXIT_INPUT: u8 = 5;

/// SQLite store failure.
pub const EXIT_STORE: u8 = 6;

/// At least one record has critical errors or anomalies.
pub const EXIT_NEEDS_REVIEW: u8 = 7;

/// Map a reconciliation error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::UnknownDomain(_) => EXIT_UNKNOWN_DOMAIN,
        ReconError::Feed(_) | ReconError::Io(_) => EXIT_INPUT,
        // Malformed values are reported inside the record, never raised this far.
        ReconError::MalformedValue { .. } => EXIT_ERROR,
    }
}
