//! # csvbundle
//!
//! Typed record collections to a zip of CSV files, and back.
//!
//! Each record type declares its columns once through
//! [`schema::Convertible`]. Export writes one CSV file per type and bundles
//! them into a single archive. Import reads an archive of unlabeled CSV
//! files and routes each file to the registered type whose header set
//! matches, collecting the parsed records in a type-indexed
//! [`io::ResultMap`].
//!
//! ## Features
//!
//! - Declarative, reflection-free column mapping
//! - Order-independent header-set matching on import
//! - Sandboxed extraction: entry names cannot escape the extraction root
//! - Per-pack and per-entry failure isolation
//!
//! ## Example
//!
//! ```rust,ignore
//! use csvbundle::io::{ExportOptions, ExportService, ImportOptions, ImportPack, ImportService};
//!
//! let exporter = ExportService::new(ExportOptions::default());
//! let result = exporter.export(&[&exporter.pack(&people)?])?;
//!
//! let importer = ImportService::new(ImportOptions::default());
//! let archive = std::fs::File::open(result.archive.unwrap())?;
//! importer.import(archive, &[ImportPack::of::<Person>()], None, |map| {
//!     assert_eq!(map.get::<Person>(), people.as_slice());
//! })?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod io;
pub mod observability;
pub mod schema;

// Re-exports for convenience
pub use config::BundleConfig;
pub use io::{
    ExportOptions, ExportPack, ExportService, ImportOptions, ImportPack, ImportService, ResultMap,
};
pub use schema::{Column, Convertible, Row, SchemaId};

/// Error type for csvbundle operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Scope |
/// |---------|-------------|-------|
/// | `InvalidInput` | Bad schema declaration, bad config value | caller |
/// | `OperationFailed` | I/O, zip, or CSV failures | call |
/// | `Allocation` | A per-type export file cannot be created | one export pack |
/// | `PathTraversal` | An archive entry name escapes the extraction root | whole import |
/// | `Parse` | A row value is missing or unconvertible | one archive entry |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A per-type export file could not be created.
    ///
    /// Recovered by the exporter: the pack is reported and skipped.
    #[error("could not create export file '{file_name}': {cause}")]
    Allocation {
        /// The pack's target file name.
        file_name: String,
        /// The underlying cause.
        cause: String,
    },

    /// An archive entry name resolves outside the extraction root.
    ///
    /// Fatal for the whole import.
    #[error("archive entry '{entry}' escapes extraction root {}", root.display())]
    PathTraversal {
        /// The stored entry name.
        entry: String,
        /// The extraction root.
        root: PathBuf,
    },

    /// A row could not be converted to its record type.
    ///
    /// Recovered by the importer: the offending entry is dropped.
    #[error("parse error in column '{header}': {message}")]
    Parse {
        /// The column involved, or `*` for whole-row problems.
        header: String,
        /// What went wrong.
        message: String,
    },
}

/// Result type alias for csvbundle operations.
pub type Result<T> = std::result::Result<T, Error>;
