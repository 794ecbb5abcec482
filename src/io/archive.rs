//! Zip bundling and sandboxed extraction.
//!
//! Entry names inside an archive are untrusted. [`SafeExtractor`] resolves
//! each name lexically under its root and refuses anything that would land
//! on or outside that root.

use crate::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Builds a zip archive one entry at a time.
pub struct ArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
    entries: Vec<String>,
}

impl ArchiveWriter<File> {
    /// Creates (or truncates) an archive file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::OperationFailed {
            operation: "create_archive".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Wraps a writer. Entries are deflate-compressed.
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: Vec::new(),
        }
    }

    /// Adds an entry named `name` with the given contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry name repeats or the write fails.
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.start_entry(name)?;
        self.zip.write_all(bytes).map_err(|e| archive_error("write_entry", &e))
    }

    /// Adds an entry named `name`, streaming its contents from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry name repeats, the file cannot be read, or
    /// the write fails.
    pub fn add_file(&mut self, name: &str, path: &Path) -> Result<()> {
        let mut source = File::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_staged_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        self.start_entry(name)?;
        io::copy(&mut source, &mut self.zip).map_err(|e| archive_error("write_entry", &e))?;
        Ok(())
    }

    /// Entry names added so far, in order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Writes the central directory and returns the inner writer.
    ///
    /// # Errors
    ///
    /// Returns an error if finalization fails.
    pub fn finish(mut self) -> Result<W> {
        self.zip.finish().map_err(|e| archive_error("finish_archive", &e))
    }

    fn start_entry(&mut self, name: &str) -> Result<()> {
        if self.entries.iter().any(|existing| existing == name) {
            return Err(Error::InvalidInput(format!(
                "archive already contains an entry named '{name}'"
            )));
        }
        self.zip
            .start_file(name, self.options)
            .map_err(|e| archive_error("start_entry", &e))?;
        self.entries.push(name.to_string());
        Ok(())
    }
}

/// One file entry read from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Stored entry name, as found in the archive.
    pub name: String,
    /// Uncompressed contents.
    pub bytes: Vec<u8>,
}

/// Reads every file entry of an in-memory archive, in archive order.
///
/// Directory entries are skipped. Names are returned verbatim; pair with
/// [`SafeExtractor`] before touching the filesystem.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable zip archive.
pub fn read_entries<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(reader).map_err(|e| archive_error("open_archive", &e))?;
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| archive_error("read_archive_entry", &e))?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut bytes)
            .map_err(|e| archive_error("read_archive_entry", &e))?;
        entries.push(ArchiveEntry { name, bytes });
    }

    Ok(entries)
}

/// Materializes archive entries strictly inside one root directory.
#[derive(Debug, Clone)]
pub struct SafeExtractor {
    root: PathBuf,
}

impl SafeExtractor {
    /// Creates an extractor rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The extraction root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `entry_name` under the root.
    ///
    /// Both `/` and `\` separate components. `.` is dropped and `..` pops the
    /// previous component; absolute names, drive prefixes, and names that
    /// climb above or resolve to the root itself are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathTraversal`] if the name escapes the root.
    pub fn destination(&self, entry_name: &str) -> Result<PathBuf> {
        let escape = || Error::PathTraversal {
            entry: entry_name.to_string(),
            root: self.root.clone(),
        };

        if entry_name.starts_with(['/', '\\']) || entry_name.contains('\0') {
            return Err(escape());
        }

        let mut parts: Vec<&str> = Vec::new();
        for (i, part) in entry_name.split(['/', '\\']).enumerate() {
            match part {
                "" | "." => {},
                ".." => {
                    if parts.pop().is_none() {
                        return Err(escape());
                    }
                },
                drive if i == 0 && is_drive_prefix(drive) => return Err(escape()),
                normal => parts.push(normal),
            }
        }

        if parts.is_empty() {
            return Err(escape());
        }

        let dest = parts.iter().fold(self.root.clone(), |acc, part| acc.join(part));
        if dest.starts_with(&self.root) && dest != self.root {
            Ok(dest)
        } else {
            Err(escape())
        }
    }

    /// Writes `bytes` to the resolved destination of `entry_name`.
    ///
    /// Nothing is written when the name escapes the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PathTraversal`] for an escaping name, or an I/O
    /// failure as [`Error::OperationFailed`].
    pub fn extract(&self, entry_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let dest = self.destination(entry_name)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_extraction_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }
        fs::write(&dest, bytes).map_err(|e| Error::OperationFailed {
            operation: "extract_entry".to_string(),
            cause: format!("{}: {e}", dest.display()),
        })?;
        Ok(dest)
    }

    /// Removes an extracted file and every directory left empty between it
    /// and the root.
    ///
    /// The root itself is kept. Removal failures are logged, not returned.
    pub fn discard(&self, dest: &Path) {
        if let Err(e) = fs::remove_file(dest) {
            tracing::debug!(path = %dest.display(), error = %e, "Failed to remove extracted entry");
        }

        let mut dir = dest.parent();
        while let Some(current) = dir {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            // Stops at the first directory still holding something.
            if fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

fn is_drive_prefix(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn archive_error(operation: &str, cause: &dyn std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: cause.to_string(),
    }
}
