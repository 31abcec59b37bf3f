//! Error types for sampling and configuration
//!
//! Sampling errors never escape the sampler: they are logged and turned into
//! a `NaN` reading. Configuration errors abort startup.

use std::path::PathBuf;
use thiserror::Error;

/// Why a single telemetry read produced no value
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("no thermal zone under {}", .0.display())]
    NoThermalZone(PathBuf),

    /// Two samples taken at identical (or regressed) counter state
    #[error("{0} counters did not advance")]
    Stalled(&'static str),

    /// First sample after startup, nothing to diff against yet
    #[error("{0} rate counter warming up")]
    WarmingUp(&'static str),
}

impl SampleError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            detail: detail.into(),
        }
    }

    /// Expected conditions that do not deserve a warning
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::WarmingUp(_))
    }
}

/// Invalid startup configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bracket pair {0:?} must be two characters or two strings separated by a space")]
    InvalidBrackets(String),

    #[error("date format {0:?} is not a valid strftime string")]
    InvalidDateFormat(String),

    #[error("delay must be a positive number of seconds, got {0}")]
    InvalidDelay(f64),

    #[error("{0} command is empty")]
    EmptyCommand(&'static str),

    #[error("{what} command {line:?} has unbalanced quoting")]
    BadQuoting { what: &'static str, line: String },

    #[error("cannot read config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
