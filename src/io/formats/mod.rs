//! Format adapters for import/export.
//!
//! CSV is the only tabular format; zip is the only container.

pub mod csv;

/// File formats the bundle pipeline reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Comma-separated values, header row first.
    Csv,
    /// Zip archive holding one CSV file per record type.
    Zip,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Zip => "zip",
        }
    }

    /// Returns the MIME type for this format.
    ///
    /// Passed to the file picker as a filter hint.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Zip => "application/zip",
        }
    }
}
