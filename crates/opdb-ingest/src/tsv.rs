//! Streaming tab-separated reader
//!
//! Wraps `csv-async` with the conventions every source file follows: tab
//! delimiter, no quoting, one record per line. Records whose width does not
//! match the expected width are handed back as malformed instead of failing
//! the read, so callers can warn and keep going.

use crate::catalog::Column;
use crate::error::{IngestError, Result};
use csv_async::{AsyncReader, AsyncReaderBuilder, ErrorKind, StringRecord};
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// How the width of a data row is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// First line is a header; every row must have as many fields
    Header,
    /// No header line; every row must have exactly this many fields
    Fixed(usize),
}

/// One data line
#[derive(Debug)]
pub enum TsvRow {
    Record(StringRecord),
    Malformed { line: u64, reason: String },
}

pub struct TsvReader {
    path: PathBuf,
    reader: AsyncReader<File>,
    headers: Option<StringRecord>,
    width: usize,
    line: u64,
}

impl TsvReader {
    /// Open a source file. A missing file is reported before anything is read.
    pub async fn open(path: &Path, layout: Layout) -> Result<Self> {
        if !path.is_file() {
            return Err(IngestError::MissingFile(path.to_path_buf()));
        }

        let file = File::open(path)
            .await
            .map_err(|e| IngestError::read(path, e))?;

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .has_headers(layout == Layout::Header)
            .create_reader(file);

        let (headers, width, line) = match layout {
            Layout::Header => {
                let headers = reader
                    .headers()
                    .await
                    .map_err(|e| IngestError::read(path, e))?
                    .clone();
                if headers.is_empty() {
                    return Err(IngestError::read(path, "missing header line"));
                }
                let width = headers.len();
                (Some(headers), width, 1)
            },
            Layout::Fixed(width) => (None, width, 0),
        };

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            headers,
            width,
            line,
        })
    }

    pub fn headers(&self) -> Option<&StringRecord> {
        self.headers.as_ref()
    }

    /// Next data row, or `None` at end of input.
    ///
    /// I/O failures are fatal; decoding problems on a single line (wrong
    /// width, invalid UTF-8) come back as [`TsvRow::Malformed`].
    pub async fn next_row(&mut self) -> Result<Option<TsvRow>> {
        let mut record = StringRecord::new();
        let read = self.reader.read_record(&mut record).await;
        self.line += 1;

        match read {
            Ok(false) => Ok(None),
            Ok(true) if record.len() != self.width => Ok(Some(TsvRow::Malformed {
                line: self.line,
                reason: format!("expected {} fields, found {}", self.width, record.len()),
            })),
            Ok(true) => Ok(Some(TsvRow::Record(record))),
            Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => {
                Err(IngestError::read(&self.path, e))
            },
            Err(e) => Ok(Some(TsvRow::Malformed {
                line: self.line,
                reason: e.to_string(),
            })),
        }
    }
}

/// Positions of catalog columns within a header line
///
/// Unknown file columns are ignored; catalog columns missing from the file
/// map to `None` and read as empty.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    positions: Vec<Option<usize>>,
}

impl HeaderMap {
    pub fn new<'c>(headers: &StringRecord, columns: impl IntoIterator<Item = &'c Column>) -> Self {
        let positions = columns
            .into_iter()
            .map(|column| {
                column
                    .source_header
                    .and_then(|h| headers.iter().position(|field| field.trim() == h))
            })
            .collect();
        Self { positions }
    }

    /// Value of the `index`-th mapped column, empty when absent.
    pub fn get<'r>(&self, record: &'r StringRecord, index: usize) -> &'r str {
        self.positions
            .get(index)
            .copied()
            .flatten()
            .and_then(|pos| record.get(pos))
            .unwrap_or("")
    }

    /// Whether the `index`-th column was found in the header line.
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.positions.get(index), Some(Some(_)))
    }

    pub fn missing(&self) -> usize {
        self.positions.iter().filter(|p| p.is_none()).count()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn record(fields: &[&str]) -> StringRecord {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field);
        }
        record
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = TsvReader::open(Path::new("/nonexistent/input.tsv"), Layout::Header)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, IngestError::MissingFile(_)));
    }

    #[tokio::test]
    async fn test_header_layout_flags_wrong_width() {
        let file = write_file("Entry\tLength\nP1\t10\nP2\nP3\t30\textra\nP4\t\n");
        let mut reader = TsvReader::open(file.path(), Layout::Header).await.unwrap();
        assert_eq!(reader.headers().unwrap().len(), 2);

        let mut good = Vec::new();
        let mut bad = Vec::new();
        while let Some(row) = reader.next_row().await.unwrap() {
            match row {
                TsvRow::Record(r) => good.push(r.get(0).unwrap().to_string()),
                TsvRow::Malformed { line, .. } => bad.push(line),
            }
        }

        assert_eq!(good, vec!["P1", "P4"]);
        assert_eq!(bad, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_quotes_are_literal() {
        let file = write_file("Entry\tProtein names\nP1\t\"quoted\" name\n");
        let mut reader = TsvReader::open(file.path(), Layout::Header).await.unwrap();
        match reader.next_row().await.unwrap() {
            Some(TsvRow::Record(r)) => assert_eq!(r.get(1), Some("\"quoted\" name")),
            other => panic!("unexpected row {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fixed_layout() {
        let file = write_file("P1\tHGNC\tHGNC:5\nP2\tGene_Name\nP3\tGeneWiki\tX\n");
        let mut reader = TsvReader::open(file.path(), Layout::Fixed(3)).await.unwrap();
        assert!(reader.headers().is_none());

        assert!(matches!(reader.next_row().await.unwrap(), Some(TsvRow::Record(_))));
        assert!(matches!(
            reader.next_row().await.unwrap(),
            Some(TsvRow::Malformed { line: 2, .. })
        ));
        assert!(matches!(reader.next_row().await.unwrap(), Some(TsvRow::Record(_))));
        assert!(reader.next_row().await.unwrap().is_none());
    }

    #[test]
    fn test_header_map() {
        let columns = vec![
            Column::new("entry", ColumnType::Text).header("Entry"),
            Column::new("length", ColumnType::Integer).header("Length"),
            Column::new("pdb", ColumnType::Text).header("PDB"),
        ];
        let headers = record(&["Length", "Unknown", "Entry"]);
        let map = HeaderMap::new(&headers, &columns);

        let row = record(&["42", "ignored", "P69905"]);
        assert_eq!(map.get(&row, 0), "P69905");
        assert_eq!(map.get(&row, 1), "42");
        assert_eq!(map.get(&row, 2), "");
        assert_eq!(map.missing(), 1);
        assert!(map.contains(0));
        assert!(!map.contains(2));
        assert_eq!(map.len(), 3);
    }
}
