use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad weight, empty field list, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// Domain has no required-fields entry in the loaded config.
    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    /// Observations for one field cannot be reconciled as a single type.
    #[error("field '{field}': malformed value: {detail}")]
    MalformedValue { field: String, detail: String },
    /// Feed input could not be parsed into observations.
    #[error("feed error: {0}")]
    Feed(String),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
