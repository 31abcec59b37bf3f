//! Center-region clock

use crate::error::ConfigError;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};
use std::fmt::{self, Write};

/// A strftime format chrono is known to accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockFormat(String);

impl ClockFormat {
    pub fn new(format: impl Into<String>) -> Result<Self, ConfigError> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidDateFormat(format));
        }
        Ok(Self(format))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local wall-clock time
    pub fn now(&self) -> String {
        self.render(&Local::now())
    }

    pub fn render<Tz>(&self, time: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut out = String::new();
        // Only specifiers chrono cannot fill fail here; leave the clock blank
        if write!(out, "{}", time.format(&self.0)).is_err() {
            out.clear();
        }
        out
    }
}

impl Default for ClockFormat {
    fn default() -> Self {
        Self("%H:%M:%S".to_string())
    }
}
