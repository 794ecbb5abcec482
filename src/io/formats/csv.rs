//! CSV format adapter.
//!
//! The first row is always the header row; every value is a string.

use crate::io::traits::{ExportSink, ImportSource};
use crate::schema::Row;
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::io::{Read, Write};

/// CSV import source.
///
/// Reads a header row, then yields one [`Row`] per record. A record whose
/// field count differs from the header count is an error.
pub struct CsvImportSource<R: Read> {
    /// CSV reader.
    reader: csv::Reader<R>,
    /// Header names in file order.
    headers: Vec<String>,
}

impl<R: Read> CsvImportSource<R> {
    /// Creates a new CSV import source.
    ///
    /// # Errors
    ///
    /// Returns an error if the header row cannot be read.
    pub fn new(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| Error::OperationFailed {
                operation: "read_csv_headers".to_string(),
                cause: e.to_string(),
            })?
            .iter()
            .map(String::from)
            .collect();

        Ok(Self {
            reader: csv_reader,
            headers,
        })
    }

    /// Zips a record with the header row.
    fn parse_record(&self, record: &csv::StringRecord) -> Result<Row> {
        if record.len() != self.headers.len() {
            let line = record.position().map_or(0, csv::Position::line);
            return Err(Error::Parse {
                header: "*".to_string(),
                message: format!(
                    "line {line} has {} fields, expected {}",
                    record.len(),
                    self.headers.len()
                ),
            });
        }

        Ok(Row::from_pairs(
            self.headers.iter().map(String::as_str).zip(record.iter()),
        ))
    }
}

impl<R: Read> ImportSource for CsvImportSource<R> {
    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn next(&mut self) -> Result<Option<Row>> {
        let mut record = csv::StringRecord::new();

        let has_record = self
            .reader
            .read_record(&mut record)
            .map_err(|e| Error::OperationFailed {
                operation: "read_csv".to_string(),
                cause: e.to_string(),
            })?;
        if !has_record {
            return Ok(None);
        }

        self.parse_record(&record).map(Some)
    }
}

/// A fully materialized CSV table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    /// Header names in file order.
    pub headers: Vec<String>,
    /// Data rows in file order.
    pub rows: Vec<Row>,
}

impl CsvTable {
    /// Reads every row from `source`.
    ///
    /// # Errors
    ///
    /// Returns the first error the source reports.
    pub fn read(source: &mut dyn ImportSource) -> Result<Self> {
        let headers = source.headers().to_vec();
        let mut rows = Vec::with_capacity(source.size_hint().unwrap_or(0));
        while let Some(row) = source.next()? {
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    /// Reads a table from CSV bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not well-formed CSV.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut source = CsvImportSource::new(reader)?;
        Self::read(&mut source)
    }

    /// The header set used for schema matching.
    ///
    /// Derived from the data rows, so a table without data rows has an
    /// empty header set.
    #[must_use]
    pub fn header_set(&self) -> BTreeSet<String> {
        self.rows
            .first()
            .map(|row| row.headers().map(String::from).collect())
            .unwrap_or_default()
    }
}

/// CSV export sink.
pub struct CsvExportSink<W: Write> {
    writer: csv::Writer<W>,
    /// Number of fields in the header row, once written.
    width: Option<usize>,
}

impl<W: Write> CsvExportSink<W> {
    /// Creates a new CSV export sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        let csv_writer = csv::WriterBuilder::new()
            .has_headers(false) // We write headers manually
            .from_writer(writer);

        Self {
            writer: csv_writer,
            width: None,
        }
    }
}

impl<W: Write> ExportSink for CsvExportSink<W> {
    fn write_header(&mut self, headers: &[String]) -> Result<()> {
        if self.width.is_some() {
            return Err(Error::InvalidInput(
                "CSV header row already written".to_string(),
            ));
        }
        self.writer
            .write_record(headers)
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv_headers".to_string(),
                cause: e.to_string(),
            })?;
        self.width = Some(headers.len());
        Ok(())
    }

    fn write_row(&mut self, values: &[Option<String>]) -> Result<()> {
        match self.width {
            None => {
                return Err(Error::InvalidInput(
                    "CSV row written before header row".to_string(),
                ));
            },
            Some(width) if width != values.len() => {
                return Err(Error::InvalidInput(format!(
                    "CSV row has {} values, header has {width}",
                    values.len()
                )));
            },
            Some(_) => {},
        }

        self.writer
            .write_record(values.iter().map(|v| v.as_deref().unwrap_or("")))
            .map_err(|e| Error::OperationFailed {
                operation: "write_csv".to_string(),
                cause: e.to_string(),
            })
    }

    fn finalize(mut self: Box<Self>) -> Result<()> {
        self.writer.flush().map_err(|e| Error::OperationFailed {
            operation: "flush_csv".to_string(),
            cause: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_import_basic_csv() {
        let input = "Name,Age\nAnn,30\n\"Bo, Jr.\",40\n";
        let mut source = CsvImportSource::new(Cursor::new(input)).unwrap();
        assert_eq!(source.headers(), ["Name", "Age"]);

        let first = source.next().unwrap().unwrap();
        assert_eq!(first.get("Name"), Some("Ann"));
        assert_eq!(first.get("Age"), Some("30"));

        let second = source.next().unwrap().unwrap();
        assert_eq!(second.get("Name"), Some("Bo, Jr."));

        assert!(source.next().unwrap().is_none());
    }

    #[test]
    fn test_ragged_record_is_parse_error() {
        let input = "Name,Age\nAnn\n";
        let err = CsvTable::from_reader(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_header_set_is_empty_without_rows() {
        let table = CsvTable::from_reader(Cursor::new("Name,Age\n")).unwrap();
        assert_eq!(table.headers, headers(&["Name", "Age"]));
        assert!(table.rows.is_empty());
        assert!(table.header_set().is_empty());

        let table = CsvTable::from_reader(Cursor::new("Age,Name\n1,x\n")).unwrap();
        let expected: BTreeSet<String> = headers(&["Name", "Age"]).into_iter().collect();
        assert_eq!(table.header_set(), expected);
    }

    #[test]
    fn test_export_csv() {
        let mut output = Vec::new();
        {
            let mut sink = CsvExportSink::new(&mut output);
            sink.write_header(&headers(&["Name", "Age"])).unwrap();
            sink.write_row(&[Some("Ann".to_string()), Some("30".to_string())])
                .unwrap();
            sink.write_row(&[Some("Bo".to_string()), None]).unwrap();
            Box::new(sink).finalize().unwrap();
        }

        assert_eq!(String::from_utf8(output).unwrap(), "Name,Age\nAnn,30\nBo,\n");
    }

    #[test]
    fn test_export_rejects_row_width_mismatch() {
        let mut sink = CsvExportSink::new(Vec::new());
        assert!(sink.write_row(&[None]).is_err());
        sink.write_header(&headers(&["A", "B"])).unwrap();
        assert!(sink.write_row(&[None]).is_err());
        assert!(sink.write_header(&headers(&["A"])).is_err());
    }
}
