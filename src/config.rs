//! Escaper configuration loaded from an optional JSON file.

use crate::dialect::DialectId;
use crate::escape::{Escaper, UnsafeMissing};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every escaping call of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EscaperConfig {
    /// Behaviour of unsafe mode for paths missing from the context
    pub unsafe_missing: UnsafeMissing,
    /// Dialect used when the caller does not name one
    pub default_dialect: DialectId,
}

impl EscaperConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Build an escaper for `dialect`, or the configured default dialect.
    pub fn escaper(&self, dialect: Option<DialectId>) -> Escaper {
        let dialect = dialect.unwrap_or(self.default_dialect);
        Escaper::new(dialect.policy()).with_unsafe_missing(self.unsafe_missing)
    }
}
