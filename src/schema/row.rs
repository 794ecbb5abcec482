//! Header-keyed rows read back from a tabular file.

use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

/// One data row, keyed by header name.
///
/// All values are strings; conversion is the record schema's job, using the
/// typed helpers below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a row from `(header, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Sets a cell, replacing any previous value.
    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(header.into(), value.into());
    }

    /// Returns the raw value for `header`, if present.
    #[must_use]
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(header).map(String::as_str)
    }

    /// Returns the raw value for `header`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the header is absent.
    pub fn require(&self, header: &str) -> Result<&str> {
        self.get(header).ok_or_else(|| Error::Parse {
            header: header.to_string(),
            message: "missing column".to_string(),
        })
    }

    /// Parses the value under `header` with [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the header is absent or conversion fails.
    pub fn parse<F>(&self, header: &str) -> Result<F>
    where
        F: FromStr,
        F::Err: Display,
    {
        let raw = self.require(header)?;
        raw.parse::<F>().map_err(|e| Error::Parse {
            header: header.to_string(),
            message: format!("cannot convert '{raw}': {e}"),
        })
    }

    /// Parses a nullable value; an empty cell is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if the header is absent or a non-empty value
    /// fails to convert.
    pub fn parse_optional<F>(&self, header: &str) -> Result<Option<F>>
    where
        F: FromStr,
        F::Err: Display,
    {
        if self.require(header)?.is_empty() {
            return Ok(None);
        }
        self.parse(header).map(Some)
    }

    /// Iterates over header names in arbitrary order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    /// Number of cells in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns whether the row has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
