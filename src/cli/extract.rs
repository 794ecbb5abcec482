//! Extract CLI command.

use crate::io::archive::{SafeExtractor, read_entries};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// Extract command handler.
pub struct ExtractCommand {
    into: PathBuf,
}

impl ExtractCommand {
    /// Creates an extract command targeting `into`.
    pub fn new(into: impl Into<PathBuf>) -> Self {
        Self { into: into.into() }
    }

    /// Extracts `archive` and lists the written files on `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read, any entry escapes the
    /// target directory, or writing fails.
    pub fn run<W: Write>(&self, archive: &Path, writer: &mut W) -> Result<()> {
        let written = extract_archive(archive, &self.into)?;
        let report = |e: std::io::Error| Error::OperationFailed {
            operation: "write_output".to_string(),
            cause: e.to_string(),
        };
        for path in &written {
            writeln!(writer, "{}", path.display()).map_err(report)?;
        }
        writeln!(
            writer,
            "Extracted {} file(s) into {}",
            written.len(),
            self.into.display()
        )
        .map_err(report)
    }
}

/// Extracts every file entry of `archive` under `into`.
///
/// All destinations are resolved before anything is written, so an archive
/// containing one escaping name writes nothing at all.
///
/// # Errors
///
/// Returns [`Error::PathTraversal`] for an escaping entry name, or an I/O or
/// archive failure as [`Error::OperationFailed`].
pub fn extract_archive(archive: &Path, into: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive).map_err(|e| Error::OperationFailed {
        operation: "open_archive".to_string(),
        cause: format!("{}: {e}", archive.display()),
    })?;
    let entries = read_entries(BufReader::new(file))?;

    let extractor = SafeExtractor::new(into);
    for entry in &entries {
        extractor.destination(&entry.name)?;
    }

    let mut written = Vec::with_capacity(entries.len());
    for entry in &entries {
        written.push(extractor.extract(&entry.name, &entry.bytes)?);
    }
    tracing::info!(
        archive = %archive.display(),
        into = %into.display(),
        files = written.len(),
        "Extracted archive"
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::archive::ArchiveWriter;

    #[test]
    fn test_extract_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.zip");
        let mut writer = ArchiveWriter::create(&archive).unwrap();
        writer.add_bytes("a.csv", b"x\n1\n").unwrap();
        writer.add_bytes("nested/b.csv", b"y\n2\n").unwrap();
        writer.finish().unwrap();

        let into = dir.path().join("out");
        let mut out = Vec::new();
        ExtractCommand::new(&into).run(&archive, &mut out).unwrap();

        assert_eq!(std::fs::read(into.join("a.csv")).unwrap(), b"x\n1\n");
        assert_eq!(std::fs::read(into.join("nested/b.csv")).unwrap(), b"y\n2\n");
        assert!(String::from_utf8(out).unwrap().contains("Extracted 2 file(s)"));
    }

    #[test]
    fn test_escaping_entry_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("evil.zip");
        let mut writer = ArchiveWriter::create(&archive).unwrap();
        writer.add_bytes("good.csv", b"x\n1\n").unwrap();
        writer.add_bytes("../evil.csv", b"x\n1\n").unwrap();
        writer.finish().unwrap();

        let into = dir.path().join("out");
        let err = extract_archive(&archive, &into).unwrap_err();

        assert!(matches!(err, Error::PathTraversal { .. }));
        assert!(!into.join("good.csv").exists());
        assert!(!dir.path().join("evil.csv").exists());
    }
}
