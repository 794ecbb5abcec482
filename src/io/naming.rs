//! Archive and per-type file naming.
//!
//! Names are pure functions of a [`Naming`] value and a clock reading, so the
//! timestamp format travels with the configuration instead of living in
//! shared state.

use crate::io::formats::Format;
use crate::{Error, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt::Write as _;

/// Default archive name prefix.
pub const DEFAULT_ARCHIVE_PREFIX: &str = "export";
/// Default separator between archive date parts.
pub const DEFAULT_DATE_SEPARATOR: &str = "-";
/// Default per-file timestamp format (strftime syntax).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Naming rules for exported archives and files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Naming {
    /// Fixed archive name prefix.
    pub archive_prefix: String,
    /// Separator between the prefix and each date part.
    pub date_separator: String,
    /// strftime pattern for per-file export timestamps.
    pub timestamp_format: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            date_separator: DEFAULT_DATE_SEPARATOR.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Naming {
    /// Sets the archive prefix.
    #[must_use]
    pub fn with_archive_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.archive_prefix = prefix.into();
        self
    }

    /// Sets the date separator.
    #[must_use]
    pub fn with_date_separator(mut self, separator: impl Into<String>) -> Self {
        self.date_separator = separator.into();
        self
    }

    /// Sets the timestamp format.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    /// Checks that generated names are plain file names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty prefix, a path separator
    /// in the prefix or separator, or a timestamp format that is malformed or
    /// renders a path separator.
    pub fn validate(&self) -> Result<()> {
        if self.archive_prefix.is_empty() {
            return Err(Error::InvalidInput(
                "archive prefix must not be empty".to_string(),
            ));
        }
        for (field, value) in [
            ("archive prefix", &self.archive_prefix),
            ("date separator", &self.date_separator),
        ] {
            if value.contains(['/', '\\']) || value.contains("..") {
                return Err(Error::InvalidInput(format!(
                    "{field} '{value}' must not contain path separators"
                )));
            }
        }
        if StrftimeItems::new(&self.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(Error::InvalidInput(format!(
                "invalid timestamp format '{}'",
                self.timestamp_format
            )));
        }
        // Specifiers such as %D render separators the pattern text does not show.
        let sample = self.export_file_name("x", NaiveDateTime::default())?;
        if sample.contains(['/', '\\']) {
            return Err(Error::InvalidInput(format!(
                "timestamp format '{}' must not render path separators",
                self.timestamp_format
            )));
        }
        Ok(())
    }

    /// Archive name for `date`: `<prefix><sep>YYYY<sep>MM<sep>DD.zip`.
    ///
    /// Two exports on the same day share a name; the later one overwrites.
    #[must_use]
    pub fn archive_name(&self, date: NaiveDate) -> String {
        let sep = &self.date_separator;
        format!(
            "{}{sep}{:04}{sep}{:02}{sep}{:02}.{}",
            self.archive_prefix,
            date.year(),
            date.month(),
            date.day(),
            Format::Zip.extension()
        )
    }

    /// Per-type file name: `<base>_<timestamp>.csv`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the timestamp format cannot be
    /// rendered.
    pub fn export_file_name(&self, base_name: &str, at: NaiveDateTime) -> Result<String> {
        let mut name = String::with_capacity(base_name.len() + 20);
        write!(
            name,
            "{base_name}_{}.{}",
            at.format(&self.timestamp_format),
            Format::Csv.extension()
        )
        .map_err(|_| {
            Error::InvalidInput(format!(
                "invalid timestamp format '{}'",
                self.timestamp_format
            ))
        })?;
        Ok(name)
    }
}

/// Source of the export timestamp.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// Reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
