//! Error types for roster-core.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed or ambiguous input. Always fatal, and always raised before any
/// network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading an input file.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A desired-state record has an empty or unrecognized field.
    #[error("user {record}: invalid `{field}`: {reason}")]
    InvalidField {
        /// Login of the offending record, or `#<position>` when the login itself is missing.
        record: String,
        field: &'static str,
        reason: String,
    },

    /// Two records share a login identifier (compared case-insensitively).
    #[error("duplicate login '{login}' (records #{first} and #{second})")]
    DuplicateLogin {
        login: String,
        first: usize,
        second: usize,
    },

    /// A required environment setting is missing or empty.
    #[error("environment setting `{key}` is required")]
    MissingSetting { key: &'static str },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
