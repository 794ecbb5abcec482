//! Bundle export service.
//!
//! Writes one CSV file per export pack into a staging directory, zips the
//! files into a single dated archive, removes the staged files, and hands the
//! archive to the share target.

use crate::config::BundleConfig;
use crate::io::archive::ArchiveWriter;
use crate::io::collaborators::{KeepInPlace, LogNotifier, Notifier, ShareTarget};
use crate::io::formats::csv::CsvExportSink;
use crate::io::naming::{Clock, Naming, SystemClock};
use crate::io::traits::{ExportSink, ExportablePack};
use crate::schema::{Column, Convertible, validate_headers};
use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Export request for one record type.
///
/// Borrows the caller's records; built fresh per export call and consumed
/// once.
pub struct ExportPack<'a, T> {
    items: &'a [T],
    file_name: String,
    columns: Vec<Column<T>>,
    header_list: Vec<String>,
}

impl<'a, T: Convertible> ExportPack<'a, T> {
    /// Creates a pack that writes `items` to `file_name`.
    pub fn new(items: &'a [T], file_name: impl Into<String>) -> Self {
        let columns = T::columns();
        let header_list = columns.iter().map(|c| c.header().to_string()).collect();
        Self {
            items,
            file_name: file_name.into(),
            columns,
            header_list,
        }
    }

    /// The records to write.
    #[must_use]
    pub const fn items(&self) -> &[T] {
        self.items
    }

    /// Flattens one record, in column order.
    #[must_use]
    pub fn row_of(&self, item: &T) -> Vec<Option<String>> {
        self.columns.iter().map(|c| c.extract(item)).collect()
    }
}

impl<T: Convertible> ExportablePack for ExportPack<'_, T> {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn header_list(&self) -> &[String] {
        &self.header_list
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn write_to(&self, sink: &mut dyn ExportSink) -> Result<usize> {
        validate_headers(T::SAVE_BASE_NAME, &self.header_list)?;
        sink.write_header(&self.header_list)?;
        for item in self.items {
            sink.write_row(&self.row_of(item))?;
        }
        Ok(self.items.len())
    }
}

/// Options for bundle export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Private directory for staged CSV files and the finished archive.
    pub staging_dir: PathBuf,
    /// Archive and file naming rules.
    pub naming: Naming,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from_config(&BundleConfig::default())
    }
}

impl ExportOptions {
    /// Derives export options from configuration.
    #[must_use]
    pub fn from_config(config: &BundleConfig) -> Self {
        Self {
            staging_dir: config.staging_dir.clone(),
            naming: config.naming.clone(),
        }
    }

    /// Sets the staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    /// Sets the naming rules.
    #[must_use]
    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }
}

/// One CSV file that made it into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Entry name inside the archive.
    pub file_name: String,
    /// Number of data rows written.
    pub rows: usize,
}

/// One pack that could not be exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFailure {
    /// The pack's target file name.
    pub file_name: String,
    /// Why it failed.
    pub reason: String,
}

/// Result of an export operation.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    /// Path of the finished archive; `None` if no pack succeeded.
    pub archive: Option<PathBuf>,
    /// Files bundled into the archive, in pack order.
    pub files: Vec<ExportedFile>,
    /// Packs that were reported and skipped.
    pub failures: Vec<PackFailure>,
}

impl ExportResult {
    /// Returns whether any file was exported.
    #[must_use]
    pub fn has_exports(&self) -> bool {
        !self.files.is_empty()
    }

    /// Returns whether any pack failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Staged files, removed on drop whatever the outcome of the export.
#[derive(Default)]
struct StagedFiles {
    files: Vec<(String, PathBuf)>,
}

impl StagedFiles {
    fn push(&mut self, file_name: &str, path: PathBuf) {
        self.files.push((file_name.to_string(), path));
    }

    fn contains(&self, file_name: &str) -> bool {
        self.files.iter().any(|(name, _)| name == file_name)
    }

    fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.files
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }
}

impl Drop for StagedFiles {
    fn drop(&mut self) {
        for (_, path) in self.files.drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
            }
        }
    }
}

/// Service for exporting record collections as one CSV archive.
pub struct ExportService {
    options: ExportOptions,
    share: Arc<dyn ShareTarget>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ExportService {
    /// Creates a new export service.
    ///
    /// Archives stay in the staging directory and notifications go to the
    /// log until other collaborators are set.
    #[must_use]
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            share: Arc::new(KeepInPlace),
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the share target.
    #[must_use]
    pub fn with_share_target(mut self, share: Arc<dyn ShareTarget>) -> Self {
        self.share = share;
        self
    }

    /// Sets the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The service's options.
    #[must_use]
    pub const fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Builds a pack named `<base name>_<timestamp>.csv` from the current
    /// clock reading.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp format cannot be rendered.
    pub fn pack<'a, T: Convertible>(&self, items: &'a [T]) -> Result<ExportPack<'a, T>> {
        let file_name = self
            .options
            .naming
            .export_file_name(T::SAVE_BASE_NAME, self.clock.now())?;
        Ok(ExportPack::new(items, file_name))
    }

    /// Exports every pack into one archive and shares it.
    ///
    /// A pack whose file cannot be created or written is reported through
    /// the notifier and skipped. If no pack succeeds, no archive is built and
    /// nothing is shared. Staged CSV files are removed in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if the naming rules are invalid or the archive cannot
    /// be written.
    #[instrument(skip(self, packs), fields(operation = "export", packs = packs.len()))]
    pub fn export(&self, packs: &[&dyn ExportablePack]) -> Result<ExportResult> {
        self.options.naming.validate()?;
        let now = self.clock.now();
        let staging_dir = &self.options.staging_dir;

        if let Err(e) = fs::create_dir_all(staging_dir) {
            tracing::warn!(
                dir = %staging_dir.display(),
                error = %e,
                "Failed to create staging directory"
            );
        }

        let mut result = ExportResult::default();
        let mut staged = StagedFiles::default();

        for pack in packs {
            match self.stage_pack(*pack, &staged) {
                Ok((path, rows)) => {
                    tracing::debug!(file = pack.file_name(), rows, "Staged export file");
                    staged.push(pack.file_name(), path);
                    result.files.push(ExportedFile {
                        file_name: pack.file_name().to_string(),
                        rows,
                    });
                },
                Err(e) => {
                    tracing::warn!(file = pack.file_name(), error = %e, "Export pack failed");
                    self.notifier
                        .notify(&format!("Could not export {}: {e}", pack.file_name()));
                    result.failures.push(PackFailure {
                        file_name: pack.file_name().to_string(),
                        reason: e.to_string(),
                    });
                },
            }
        }

        if staged.is_empty() {
            tracing::info!(failed = result.failures.len(), "Nothing to bundle");
            return Ok(result);
        }

        let archive_path = staging_dir.join(self.options.naming.archive_name(now.date()));
        if let Err(e) = Self::bundle(&staged, &archive_path) {
            remove_partial(&archive_path);
            return Err(e);
        }
        drop(staged);

        tracing::info!(
            archive = %archive_path.display(),
            files = result.files.len(),
            failed = result.failures.len(),
            "Export complete"
        );
        self.share.share(&archive_path);
        result.archive = Some(archive_path);
        Ok(result)
    }

    /// Writes every pack into an archive on `writer`, without staging,
    /// sharing, or notifying.
    ///
    /// # Errors
    ///
    /// Returns the first pack or archive failure.
    pub fn write_archive<W: Write + Seek>(
        &self,
        packs: &[&dyn ExportablePack],
        writer: W,
    ) -> Result<W> {
        let mut archive = ArchiveWriter::new(writer);
        for pack in packs {
            let mut bytes = Vec::new();
            write_csv(*pack, &mut bytes)?;
            archive.add_bytes(pack.file_name(), &bytes)?;
        }
        archive.finish()
    }

    /// Writes one pack to a fresh file in the staging directory.
    fn stage_pack(
        &self,
        pack: &dyn ExportablePack,
        staged: &StagedFiles,
    ) -> Result<(PathBuf, usize)> {
        let file_name = pack.file_name();
        let allocation = |cause: String| Error::Allocation {
            file_name: file_name.to_string(),
            cause,
        };

        if !is_plain_file_name(file_name) {
            return Err(allocation("not a plain file name".to_string()));
        }
        if staged.contains(file_name) {
            return Err(allocation("file name already used in this export".to_string()));
        }

        let path = self.options.staging_dir.join(file_name);
        let file = File::create(&path).map_err(|e| allocation(e.to_string()))?;

        match write_csv(pack, BufWriter::new(file)) {
            Ok(rows) => Ok((path, rows)),
            Err(e) => {
                remove_partial(&path);
                Err(e)
            },
        }
    }

    fn bundle(staged: &StagedFiles, archive_path: &Path) -> Result<()> {
        let mut writer = ArchiveWriter::create(archive_path)?;
        for (name, path) in staged.iter() {
            writer.add_file(name, path)?;
        }
        writer.finish()?;
        Ok(())
    }
}

/// Renders one pack as CSV into `writer`.
fn write_csv<W: Write>(pack: &dyn ExportablePack, writer: W) -> Result<usize> {
    let mut sink = CsvExportSink::new(writer);
    let rows = pack.write_to(&mut sink)?;
    Box::new(sink).finalize()?;
    Ok(rows)
}

/// Removes a half-written file after a failure.
fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Failed to remove partial file");
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::archive::read_entries;
    use crate::io::naming::FixedClock;
    use crate::schema::Row;
    use chrono::NaiveDate;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        name: String,
        age: u32,
    }

    impl Convertible for Person {
        const SAVE_BASE_NAME: &'static str = "people";

        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::value("Name", |p: &Self| p.name.clone()),
                Column::value("Age", |p: &Self| p.age),
            ]
        }

        fn parse_row(row: &Row) -> Result<Self> {
            Ok(Self {
                name: row.require("Name")?.to_string(),
                age: row.parse("Age")?,
            })
        }
    }

    fn people() -> Vec<Person> {
        vec![
            Person {
                name: "Ann".to_string(),
                age: 30,
            },
            Person {
                name: "Bo".to_string(),
                age: 40,
            },
        ]
    }

    fn service(dir: &Path) -> ExportService {
        let at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap();
        ExportService::new(ExportOptions::default().with_staging_dir(dir))
            .with_clock(Arc::new(FixedClock(at)))
    }

    fn archive_entries(path: &Path) -> Vec<(String, String)> {
        read_entries(File::open(path).unwrap())
            .unwrap()
            .into_iter()
            .map(|e| (e.name, String::from_utf8(e.bytes).unwrap()))
            .collect()
    }

    #[test]
    fn test_export_writes_archive_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&shared);
        let service = service(dir.path()).with_share_target(Arc::new(move |p: &Path| {
            sink.lock().unwrap().push(p.to_path_buf());
        }));

        let people = people();
        let pack = service.pack(&people).unwrap();
        let result = service.export(&[&pack]).unwrap();

        let archive = result.archive.clone().unwrap();
        assert_eq!(archive, dir.path().join("export-2024-05-06.zip"));
        assert_eq!(*shared.lock().unwrap(), vec![archive.clone()]);
        assert_eq!(
            result.files,
            vec![ExportedFile {
                file_name: "people_20240506070809.csv".to_string(),
                rows: 2,
            }]
        );
        assert_eq!(
            archive_entries(&archive),
            vec![(
                "people_20240506070809.csv".to_string(),
                "Name,Age\nAnn,30\nBo,40\n".to_string()
            )]
        );
        assert!(!dir.path().join("people_20240506070809.csv").exists());
    }

    #[test]
    fn test_empty_pack_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let none: Vec<Person> = Vec::new();
        let pack = ExportPack::new(&none, "people.csv");
        let result = service.export(&[&pack]).unwrap();

        let entries = archive_entries(&result.archive.unwrap());
        assert_eq!(entries, vec![("people.csv".to_string(), "Name,Age\n".to_string())]);
    }

    #[test]
    fn test_failed_pack_is_notified_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&messages);
        let service = service(dir.path())
            .with_notifier(Arc::new(move |m: &str| sink.lock().unwrap().push(m.to_string())));

        let people = people();
        let good = ExportPack::new(&people, "people.csv");
        let bad = ExportPack::new(&people, "../escape.csv");
        let dup = ExportPack::new(&people, "people.csv");
        let result = service.export(&[&bad, &good, &dup]).unwrap();

        assert_eq!(result.files.len(), 1);
        assert_eq!(result.failures.len(), 2);
        assert_eq!(messages.lock().unwrap().len(), 2);
        assert!(messages.lock().unwrap()[0].contains("../escape.csv"));
        assert_eq!(archive_entries(&result.archive.unwrap()).len(), 1);
    }

    #[test]
    fn test_all_packs_failing_shares_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let shared = Arc::new(Mutex::new(0_usize));
        let sink = Arc::clone(&shared);
        let service = service(dir.path())
            .with_share_target(Arc::new(move |_: &Path| *sink.lock().unwrap() += 1));

        let people = people();
        let bad = ExportPack::new(&people, "");
        let result = service.export(&[&bad]).unwrap();

        assert!(result.archive.is_none());
        assert!(result.has_failures());
        assert!(!result.has_exports());
        assert_eq!(*shared.lock().unwrap(), 0);
    }

    #[test]
    fn test_timestamp_with_separator_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let naming = Naming::default().with_timestamp_format("%Y/%m/%d");
        let service = ExportService::new(
            ExportOptions::default()
                .with_staging_dir(dir.path())
                .with_naming(naming),
        );

        let people = people();
        let pack = service.pack(&people).unwrap();
        let err = service.export(&[&pack]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_write_archive_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let people = people();
        let pack = ExportPack::new(&people, "people.csv");

        let bytes = service
            .write_archive(&[&pack], Cursor::new(Vec::new()))
            .unwrap()
            .into_inner();
        let entries = read_entries(Cursor::new(bytes)).unwrap();
        assert_eq!(entries[0].bytes, b"Name,Age\nAnn,30\nBo,40\n");
    }

    #[test]
    fn test_pack_row_of_matches_schema() {
        let people = people();
        let pack = ExportPack::new(&people, "people.csv");
        assert_eq!(pack.header_list(), ["Name", "Age"]);
        assert_eq!(pack.row_of(&people[0]), people[0].row_of());
        assert_eq!(pack.items().len(), 2);
    }
}
