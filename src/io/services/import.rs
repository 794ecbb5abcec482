//! Bundle import service.
//!
//! Unpacks an archive of unlabeled CSV files and routes each file to the
//! registered record type whose header set equals the file's header set.

use crate::config::BundleConfig;
use crate::io::archive::{ArchiveEntry, SafeExtractor, read_entries};
use crate::io::collaborators::FilePicker;
use crate::io::formats::Format;
use crate::io::formats::csv::CsvTable;
use crate::io::result_map::ResultMap;
use crate::schema::{Convertible, Row, SchemaId};
use crate::{Error, Result};
use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Parses every row of one entry into a type-erased `Vec<T>`.
type ParseFn = fn(&[Row]) -> Result<Box<dyn Any + Send>>;

/// Handler for entry-level failures: receives the entry name and the error.
pub type EntryErrorHandler<'a> = &'a mut dyn FnMut(&str, &Error);

/// Import registration for one record type.
///
/// Pairs the type's header set with its row parser. Header sets of all packs
/// registered in one call must be pairwise distinct.
#[derive(Clone)]
pub struct ImportPack {
    schema: SchemaId,
    header_set: BTreeSet<String>,
    parse: ParseFn,
}

impl ImportPack {
    /// Registers `T`.
    #[must_use]
    pub fn of<T: Convertible + Send + 'static>() -> Self {
        Self {
            schema: SchemaId::of::<T>(),
            header_set: T::header_set(),
            parse: parse_all::<T>,
        }
    }

    /// The registered schema.
    #[must_use]
    pub const fn schema(&self) -> SchemaId {
        self.schema
    }

    /// Header names identifying this type's files.
    #[must_use]
    pub const fn header_set(&self) -> &BTreeSet<String> {
        &self.header_set
    }

    /// Exact, order-independent header-set match.
    #[must_use]
    pub fn matches(&self, headers: &BTreeSet<String>) -> bool {
        &self.header_set == headers
    }
}

impl fmt::Debug for ImportPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportPack")
            .field("schema", &self.schema)
            .field("header_set", &self.header_set)
            .finish_non_exhaustive()
    }
}

fn parse_all<T: Convertible + Send + 'static>(rows: &[Row]) -> Result<Box<dyn Any + Send>> {
    let items = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            T::parse_row(row).map_err(|e| match e {
                Error::Parse { header, message } => Error::Parse {
                    header,
                    message: format!("row {}: {message}", i + 1),
                },
                other => other,
            })
        })
        .collect::<Result<Vec<T>>>()?;
    Ok(Box::new(items))
}

/// Records parsed from one matched entry.
pub struct ParsedEntry {
    /// The schema the entry matched.
    pub schema: SchemaId,
    /// Number of records parsed.
    pub rows: usize,
    /// The records, as a `Vec<T>` for the matched `T`.
    items: Box<dyn Any + Send>,
}

impl ParsedEntry {
    /// Downcasts the records to `T`; `None` if the entry matched another type.
    pub fn into_items<T: Convertible + 'static>(self) -> Option<Vec<T>> {
        self.items.downcast::<Vec<T>>().ok().map(|items| *items)
    }
}

impl fmt::Debug for ParsedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedEntry")
            .field("schema", &self.schema)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

/// Matches one entry against the registered packs and parses it.
///
/// Returns `Ok(None)` when the entry's header set matches no pack. A table
/// without data rows has an empty header set.
///
/// # Errors
///
/// Returns an error if the entry is not readable CSV or any row fails to
/// parse; the entry contributes nothing in that case.
pub fn match_and_parse(
    entry_name: &str,
    entry_bytes: &[u8],
    packs: &[ImportPack],
) -> Result<Option<ParsedEntry>> {
    match_and_parse_reader(entry_name, entry_bytes, packs)
}

fn match_and_parse_reader<R: Read>(
    entry_name: &str,
    reader: R,
    packs: &[ImportPack],
) -> Result<Option<ParsedEntry>> {
    let table = CsvTable::from_reader(reader)?;
    let headers = table.header_set();

    let Some(pack) = packs.iter().find(|pack| pack.matches(&headers)) else {
        tracing::debug!(entry = entry_name, ?headers, "No registered schema matches entry");
        return Ok(None);
    };

    let items = (pack.parse)(&table.rows)?;
    tracing::debug!(
        entry = entry_name,
        schema = %pack.schema,
        rows = table.rows.len(),
        "Entry matched"
    );
    Ok(Some(ParsedEntry {
        schema: pack.schema,
        rows: table.rows.len(),
        items,
    }))
}

/// Options for bundle import.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Private root under which archive entries are extracted.
    pub extraction_dir: PathBuf,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::from_config(&BundleConfig::default())
    }
}

impl ImportOptions {
    /// Derives import options from configuration.
    #[must_use]
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            extraction_dir: config.extraction_dir.clone(),
        }
    }

    /// Sets the extraction root.
    #[must_use]
    pub fn with_extraction_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extraction_dir = dir.into();
        self
    }
}

/// Result of an import operation.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// File entries found in the archive.
    pub entries_seen: usize,
    /// Entries routed to a registered schema.
    pub matched: usize,
    /// Entries whose header set matched no schema.
    pub skipped_unrecognized: usize,
    /// Entries dropped because they failed to parse.
    pub failed: usize,
    /// Matched entries that replaced an earlier entry of the same schema.
    pub overwritten: usize,
    /// One message per failed entry.
    pub errors: Vec<String>,
}

impl ImportResult {
    /// Returns whether any entry was imported.
    #[must_use]
    pub const fn has_imports(&self) -> bool {
        self.matched > 0
    }

    /// Returns whether any entry failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Service for importing CSV archives into typed record lists.
pub struct ImportService {
    options: ImportOptions,
}

impl ImportService {
    /// Creates a new import service.
    #[must_use]
    pub const fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    /// The service's options.
    #[must_use]
    pub const fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports an archive and delivers the populated map to `on_complete`.
    ///
    /// `on_complete` runs exactly once when the archive was processed, even
    /// if every entry was skipped or failed. It does not run on a fatal
    /// error.
    ///
    /// # Errors
    ///
    /// See [`Self::import_archive`].
    pub fn import<R, F>(
        &self,
        reader: R,
        packs: &[ImportPack],
        on_error: Option<EntryErrorHandler<'_>>,
        on_complete: F,
    ) -> Result<ImportResult>
    where
        R: Read,
        F: FnOnce(ResultMap),
    {
        let (map, result) = self.import_archive(reader, packs, on_error)?;
        on_complete(map);
        Ok(result)
    }

    /// Asks `picker` for an archive and imports it.
    ///
    /// A cancelled pick returns `Ok(None)` without calling `on_complete`.
    ///
    /// # Errors
    ///
    /// See [`Self::import_archive`].
    pub fn import_picked<F>(
        &self,
        picker: &mut dyn FilePicker,
        packs: &[ImportPack],
        on_error: Option<EntryErrorHandler<'_>>,
        on_complete: F,
    ) -> Result<Option<ImportResult>>
    where
        F: FnOnce(ResultMap),
    {
        let Some(reader) = picker.pick(Format::Zip.mime_type()) else {
            tracing::info!("Import cancelled");
            return Ok(None);
        };
        self.import(reader, packs, on_error, on_complete).map(Some)
    }

    /// Imports an archive, returning the populated map.
    ///
    /// Entries are processed in archive order. Each is extracted under the
    /// extraction root, matched by header set, and parsed. Unrecognized
    /// entries are skipped; entries that fail to parse are reported to
    /// `on_error` and dropped. A later entry matching an already populated
    /// schema replaces the earlier list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathTraversal`] as soon as an entry name resolves
    /// outside the extraction root, before anything is written for it, and
    /// [`Error::OperationFailed`] if the archive is unreadable. Failing to
    /// write or read back one entry only drops that entry.
    #[instrument(
        skip(self, reader, packs, on_error),
        fields(operation = "import", packs = packs.len())
    )]
    pub fn import_archive<R: Read>(
        &self,
        mut reader: R,
        packs: &[ImportPack],
        mut on_error: Option<EntryErrorHandler<'_>>,
    ) -> Result<(ResultMap, ImportResult)> {
        warn_on_ambiguous(packs);

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| Error::OperationFailed {
                operation: "read_archive".to_string(),
                cause: e.to_string(),
            })?;
        let entries = read_entries(Cursor::new(bytes))?;
        let extractor = SafeExtractor::new(&self.options.extraction_dir);

        let mut map = ResultMap::new();
        let mut result = ImportResult::default();

        for entry in entries {
            result.entries_seen += 1;
            let dest = extractor.destination(&entry.name)?;

            match extract_and_parse(&extractor, &dest, &entry, packs) {
                Ok(Some(parsed)) => {
                    result.matched += 1;
                    let schema = parsed.schema;
                    if map.put_erased(schema, parsed.items) {
                        result.overwritten += 1;
                        tracing::warn!(
                            entry = %entry.name,
                            %schema,
                            "Entry replaces earlier entry of the same schema"
                        );
                    }
                },
                Ok(None) => {
                    result.skipped_unrecognized += 1;
                },
                Err(e) => {
                    result.failed += 1;
                    tracing::warn!(entry = %entry.name, error = %e, "Entry dropped");
                    result.errors.push(format!("{}: {e}", entry.name));
                    if let Some(handler) = on_error.as_deref_mut() {
                        handler(&entry.name, &e);
                    }
                },
            }
        }

        tracing::info!(
            entries = result.entries_seen,
            matched = result.matched,
            skipped = result.skipped_unrecognized,
            failed = result.failed,
            "Import complete"
        );
        Ok((map, result))
    }
}

/// Materializes one entry at `dest`, parses it, and removes it again.
///
/// Leaves nothing behind under the extraction root, whatever the outcome.
fn extract_and_parse(
    extractor: &SafeExtractor,
    dest: &Path,
    entry: &ArchiveEntry,
    packs: &[ImportPack],
) -> Result<Option<ParsedEntry>> {
    let outcome = extractor
        .extract(&entry.name, &entry.bytes)
        .and_then(|path| {
            File::open(&path).map_err(|e| Error::OperationFailed {
                operation: "open_extracted_entry".to_string(),
                cause: format!("{}: {e}", path.display()),
            })
        })
        .and_then(|file| match_and_parse_reader(&entry.name, BufReader::new(file), packs));
    extractor.discard(dest);
    outcome
}

/// Logs every pair of packs sharing a header set; the first one wins.
fn warn_on_ambiguous(packs: &[ImportPack]) {
    for (i, first) in packs.iter().enumerate() {
        for second in &packs[i + 1..] {
            if first.header_set == second.header_set {
                tracing::warn!(
                    first = %first.schema,
                    second = %second.schema,
                    "Import packs share a header set; only the first will match"
                );
            }
        }
    }
}
