//! Configuration error types
//!
//! This module provides the error types for everything that can go wrong
//! during a resolution pass: provider failures, missing required parameters,
//! and per-type value conversion failures.

/// Boxed error used to carry per-type conversion causes across the
/// type-erased parse and stringify functions.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a resolution pass
///
/// Configuration errors are startup-fatal conditions: the embedding
/// application is expected to report them and terminate rather than retry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter had no value in any source and no default
    #[error("parameter {name:?} required but not set")]
    RequiredMissing { name: String },

    /// A raw value could not be converted into its parameter's type
    #[error("error parsing parameter {name}: {source}")]
    InvalidValue { name: String, source: BoxedError },

    /// An environment entry had no `=` separator
    #[error("malformed environment variable: {entry:?}")]
    MalformedEnvEntry { entry: String },

    /// The config file named by `config-json-file` could not be read
    #[error("failed to read config file {path:?}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    /// The config file was not a decodable JSON object
    #[error("failed to decode config file {path:?}: {source}")]
    FileDecode {
        path: String,
        source: serde_json::Error,
    },

    /// A JSON document value could not be rendered into the raw string form
    /// its parameter's type expects
    #[error("cannot stringify json value for parameter {name}: {source}")]
    Stringify { name: String, source: BoxedError },
}

impl ConfigError {
    /// Create a missing-required-parameter error
    pub fn required_missing<S: Into<String>>(name: S) -> Self {
        Self::RequiredMissing { name: name.into() }
    }

    /// Create a conversion-failure error wrapping the underlying cause
    pub fn invalid_value<S: Into<String>>(name: S, source: BoxedError) -> Self {
        Self::InvalidValue {
            name: name.into(),
            source,
        }
    }

    /// Create a malformed-environment-entry error
    pub fn malformed_env_entry<S: Into<String>>(entry: S) -> Self {
        Self::MalformedEnvEntry {
            entry: entry.into(),
        }
    }

    /// Create a config-file read error
    pub fn file_read<S: Into<String>>(path: S, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Create a config-file decode error
    pub fn file_decode<S: Into<String>>(path: S, source: serde_json::Error) -> Self {
        Self::FileDecode {
            path: path.into(),
            source,
        }
    }

    /// Create a stringify error wrapping the underlying cause
    pub fn stringify<S: Into<String>>(name: S, source: BoxedError) -> Self {
        Self::Stringify {
            name: name.into(),
            source,
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
