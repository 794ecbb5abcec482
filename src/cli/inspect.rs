//! Inspect CLI command.

use crate::io::archive::{ArchiveEntry, read_entries};
use crate::io::formats::csv::CsvTable;
use crate::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;

/// Summary of one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    /// Stored entry name.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: usize,
    /// Header names in file order; empty when the entry is not CSV.
    pub headers: Vec<String>,
    /// Number of data rows.
    pub rows: usize,
    /// Why the entry could not be read as CSV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntrySummary {
    fn from_entry(entry: &ArchiveEntry) -> Self {
        let (headers, rows, error) = match CsvTable::from_reader(entry.bytes.as_slice()) {
            Ok(table) => (table.headers, table.rows.len(), None),
            Err(e) => (Vec::new(), 0, Some(e.to_string())),
        };
        Self {
            name: entry.name.clone(),
            size: entry.bytes.len(),
            headers,
            rows,
            error,
        }
    }
}

/// Inspect command handler.
pub struct InspectCommand;

impl InspectCommand {
    /// Creates a new inspect command.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Inspects `archive` and writes a table or JSON to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read or writing fails.
    pub fn run<W: Write>(&self, archive: &Path, json: bool, writer: &mut W) -> Result<()> {
        let summaries = inspect_archive(archive)?;
        let written = if json {
            write_json(writer, &summaries)
        } else {
            write_table(writer, &summaries)
        };
        written.map_err(|e| Error::OperationFailed {
            operation: "write_output".to_string(),
            cause: e.to_string(),
        })
    }
}

impl Default for InspectCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads every file entry of the archive at `path` and summarizes it.
///
/// Entries that are not valid CSV are still listed, with `error` set.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a zip archive.
pub fn inspect_archive(path: &Path) -> Result<Vec<EntrySummary>> {
    let file = File::open(path).map_err(|e| Error::OperationFailed {
        operation: "open_archive".to_string(),
        cause: format!("{}: {e}", path.display()),
    })?;
    let entries = read_entries(BufReader::new(file))?;
    tracing::debug!(archive = %path.display(), entries = entries.len(), "Inspecting archive");
    Ok(entries.iter().map(EntrySummary::from_entry).collect())
}

/// Writes summaries as a table.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_table<W: Write>(writer: &mut W, summaries: &[EntrySummary]) -> io::Result<()> {
    if summaries.is_empty() {
        return writeln!(writer, "Archive has no file entries.");
    }

    writeln!(writer, "{:<40}{:>10}{:>8}  HEADERS", "ENTRY", "BYTES", "ROWS")?;
    for summary in summaries {
        let headers = summary
            .error
            .as_ref()
            .map_or_else(|| summary.headers.join(", "), |e| format!("<unreadable: {e}>"));
        writeln!(
            writer,
            "{:<40}{:>10}{:>8}  {}",
            summary.name, summary.size, summary.rows, headers
        )?;
    }
    Ok(())
}

/// Writes summaries as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, summaries: &[EntrySummary]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(summaries).map_err(io::Error::other)?;
    writeln!(writer, "{json}")
}
