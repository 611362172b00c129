//! Library error type

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by flagstone.
///
/// Construction errors (revision, date, timezone) surface before the process
/// starts; decode errors abort resolver construction. A missing configuration
/// file is never an error, only a skipped source.
#[derive(Debug, Error)]
pub enum Error {
    #[error("build revision must be at least 8 characters long")]
    RevisionTooShort,

    #[error("invalid build date: {0}")]
    InvalidDate(#[from] chrono::ParseError),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("configuration root must be a mapping")]
    NotAMapping,

    #[error("invalid configuration file {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    #[error("failed reading {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("metric registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}
