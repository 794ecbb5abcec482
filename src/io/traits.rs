//! Core traits for tabular reading and writing.
//!
//! Defines the [`ImportSource`] and [`ExportSink`] traits that the CSV adapter
//! implements, plus [`ExportablePack`], the type-erased view of an export
//! request that lets one batch carry several record types.

use crate::Result;
use crate::schema::Row;

/// Source of header-keyed rows.
///
/// # Example Implementation
///
/// ```rust,ignore
/// impl ImportSource for CsvImportSource {
///     fn headers(&self) -> &[String] {
///         &self.headers
///     }
///
///     fn next(&mut self) -> Result<Option<Row>> {
///         // Read next record, zip it with the headers
///     }
/// }
/// ```
pub trait ImportSource {
    /// Header names in file order.
    fn headers(&self) -> &[String];

    /// Reads the next row.
    ///
    /// Returns `Ok(None)` when the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying data is malformed or unreadable.
    fn next(&mut self) -> Result<Option<Row>>;

    /// Returns an estimate of the remaining number of rows.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Sink for one tabular file.
///
/// # Lifecycle
///
/// 1. Call `write_header()` once
/// 2. Call `write_row()` for each record
/// 3. Call `finalize()` to flush
pub trait ExportSink {
    /// Writes the header row.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn write_header(&mut self, headers: &[String]) -> Result<()>;

    /// Writes one data row; `None` becomes an empty cell.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn write_row(&mut self, values: &[Option<String>]) -> Result<()>;

    /// Flushes buffered output.
    ///
    /// This method consumes the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails.
    fn finalize(self: Box<Self>) -> Result<()>;
}

/// Type-erased export request.
///
/// Implemented by [`crate::io::ExportPack`] for every record type, so the
/// exporter can take a heterogeneous slice of packs.
pub trait ExportablePack {
    /// Target file name inside the archive.
    fn file_name(&self) -> &str;

    /// Ordered header row.
    fn header_list(&self) -> &[String];

    /// Number of records the pack will write.
    fn len(&self) -> usize;

    /// Returns whether the pack holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the header row and one row per record to `sink`.
    ///
    /// Returns the number of data rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails.
    fn write_to(&self, sink: &mut dyn ExportSink) -> Result<usize>;
}
