use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading `config.properties` and `profile.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A properties line that is neither a comment nor `key=value`.
    #[error("Invalid properties file: {reason} at line {line}")]
    Parse { line: usize, reason: String },

    #[error("Failed to parse profile {path}: {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A required key is absent from every source.
    #[error("Missing required setting: {0}")]
    MissingKey(String),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// The selected transport or lookup needs credentials but no profile
    /// was found.
    #[error("Connection profile required but not found at {0}")]
    MissingProfile(PathBuf),
}
