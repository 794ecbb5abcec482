//! Record schemas.
//!
//! A record type opts into CSV conversion by implementing [`Convertible`]:
//! it declares an ordered list of [`Column`]s, the base name of its exported
//! file, and how to rebuild an instance from a [`Row`]. Both directions are
//! derived from that one declaration.
//!
//! # Example
//!
//! ```rust
//! use csvbundle::schema::{Column, Convertible, Row};
//!
//! #[derive(Debug, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: u32,
//! }
//!
//! impl Convertible for Person {
//!     const SAVE_BASE_NAME: &'static str = "people";
//!
//!     fn columns() -> Vec<Column<Self>> {
//!         vec![
//!             Column::value("Name", |p: &Self| p.name.clone()),
//!             Column::value("Age", |p: &Self| p.age),
//!         ]
//!     }
//!
//!     fn parse_row(row: &Row) -> csvbundle::Result<Self> {
//!         Ok(Self {
//!             name: row.require("Name")?.to_string(),
//!             age: row.parse("Age")?,
//!         })
//!     }
//! }
//!
//! let ann = Person { name: "Ann".into(), age: 30 };
//! assert_eq!(ann.row_of(), vec![Some("Ann".to_string()), Some("30".to_string())]);
//! ```

mod column;
mod row;

pub use column::{Accessor, Column};
pub use row::Row;

use crate::{Error, Result};
use std::any::TypeId;
use std::collections::BTreeSet;
use std::fmt;

/// Per-type contract for flattening records to rows and parsing them back.
///
/// `parse_row` must accept exactly the header set produced by `columns`;
/// round-trip fidelity depends on it.
pub trait Convertible: Sized {
    /// Base name of this type's exported file.
    const SAVE_BASE_NAME: &'static str;

    /// Ordered column declarations.
    fn columns() -> Vec<Column<Self>>;

    /// Rebuilds one record from a header-keyed row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] if a required header is absent or a value
    /// cannot be converted.
    fn parse_row(row: &Row) -> Result<Self>;

    /// Header names in column order.
    fn header_list() -> Vec<String> {
        Self::columns()
            .iter()
            .map(|c| c.header().to_string())
            .collect()
    }

    /// Unordered, de-duplicated header names.
    fn header_set() -> BTreeSet<String> {
        Self::columns()
            .iter()
            .map(|c| c.header().to_string())
            .collect()
    }

    /// Applies every column accessor to `self`, in column order.
    fn row_of(&self) -> Vec<Option<String>> {
        Self::columns().iter().map(|c| c.extract(self)).collect()
    }

    /// Checks that header names are non-empty and pairwise distinct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the offending header.
    fn validate_columns() -> Result<()> {
        validate_headers(Self::SAVE_BASE_NAME, &Self::header_list())
    }
}

/// Checks a header list for empty or repeated names.
pub(crate) fn validate_headers(schema: &str, headers: &[String]) -> Result<()> {
    if headers.is_empty() {
        return Err(Error::InvalidInput(format!(
            "schema '{schema}' declares no columns"
        )));
    }
    let mut seen = BTreeSet::new();
    for header in headers {
        if header.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "schema '{schema}' has an empty header name"
            )));
        }
        if !seen.insert(header.as_str()) {
            return Err(Error::InvalidInput(format!(
                "schema '{schema}' repeats header '{header}'"
            )));
        }
    }
    Ok(())
}

/// Identifies one record schema at runtime.
///
/// Used as the key of [`crate::io::ResultMap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId {
    type_id: TypeId,
    name: &'static str,
}

impl SchemaId {
    /// Returns the identifier for `T`.
    #[must_use]
    pub fn of<T: Convertible + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::SAVE_BASE_NAME,
        }
    }

    /// The schema's save base name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaId({})", self.name)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
