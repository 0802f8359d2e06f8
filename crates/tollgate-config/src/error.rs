//! Configuration errors.

use std::path::Path;

use thiserror::Error;

/// Why configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("malformed config in {path}: {source}")]
    Parse {
        /// The file, or a `<...>` label for in-memory sources.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A config file exceeds the size limit.
    #[error("{path} is {size} bytes; config files are limited to {limit} bytes")]
    TooLarge {
        /// The file.
        path: String,
        /// Its size.
        size: u64,
        /// The limit.
        limit: u64,
    },

    /// A field holds a value Tollgate cannot use.
    #[error("invalid `{field}`: {message}")]
    Invalid {
        /// Dotted field path, e.g. `policy.agent_id`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The current user has no home directory.
    #[error("no home directory found for the current user")]
    NoHomeDir,
}

impl ConfigError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        Self::Read {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<String>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// Result alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
