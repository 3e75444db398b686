//! Bulk-copy loader
//!
//! Streams an already-clean TSV body straight into `COPY ... FROM STDIN`. The
//! column list comes from the file's own header line. There is no conflict
//! handling: the table is expected to be freshly provisioned.

use crate::catalog::{Dataset, TableSchema};
use crate::db::{count_rows, DatabaseHandle};
use crate::error::{IngestError, Result};
use crate::progress::Progress;
use opdb_common::sql::{quote_ident, quote_list};
use serde::Serialize;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of one bulk copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub table: String,
    pub columns: usize,
    pub bytes_sent: u64,
    /// Rows the server reported for the `COPY`
    pub rows_copied: u64,
    /// `COUNT(*)` on the table after commit
    pub rows_in_table: i64,
    pub elapsed_ms: u64,
}

pub struct BulkCopyLoader {
    db: DatabaseHandle,
    progress: Progress,
}

impl BulkCopyLoader {
    pub fn new(db: DatabaseHandle) -> Self {
        Self {
            db,
            progress: Progress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Copy the dataset file into its (empty) table and verify the row count.
    pub async fn load(&self, dataset: &Dataset) -> Result<CopyStats> {
        let table = &dataset.table;
        let path = dataset.file.as_path();
        let started = Instant::now();

        if !path.is_file() {
            return Err(IngestError::MissingFile(path.to_path_buf()));
        }

        let file = File::open(path)
            .await
            .map_err(|e| IngestError::read(path, e))?;
        let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);

        let mut header = String::new();
        reader
            .read_line(&mut header)
            .await
            .map_err(|e| IngestError::read(path, e))?;
        let columns = parse_header(&header);
        if columns.is_empty() {
            return Err(IngestError::read(path, "missing header line"));
        }
        check_columns(table, &columns)?;

        let statement = copy_statement(table.name, &columns);
        info!(table = table.name, file = %path.display(), columns = columns.len(), "Starting bulk copy");

        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| IngestError::copy(table.name, e))?;

        let (bytes_sent, rows_copied) = {
            let mut copy = tx
                .copy_in_raw(&statement)
                .await
                .map_err(|e| IngestError::copy(table.name, e))?;

            let mut bytes_sent = 0u64;
            loop {
                let chunk = match reader.fill_buf().await {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        if let Err(abort) = copy.abort(e.to_string()).await {
                            warn!(table = table.name, error = %abort, "Copy abort failed");
                        }
                        return Err(IngestError::read(path, e));
                    },
                };
                if chunk.is_empty() {
                    break;
                }

                let len = chunk.len();
                let sent = copy.send(chunk).await.map(|_| ());
                if let Err(e) = sent {
                    if let Err(abort) = copy.abort(e.to_string()).await {
                        warn!(table = table.name, error = %abort, "Copy abort failed");
                    }
                    return Err(IngestError::copy(table.name, e));
                }
                reader.consume(len);

                bytes_sent += len as u64;
                self.progress
                    .stage(format!("{}: {} sent", table.name, format_bytes(bytes_sent)));
            }

            let rows = copy
                .finish()
                .await
                .map_err(|e| IngestError::copy(table.name, e))?;
            (bytes_sent, rows)
        };

        tx.commit()
            .await
            .map_err(|e| IngestError::copy(table.name, e))?;

        let rows_in_table = count_rows(&self.db, table.name)
            .await
            .map_err(|e| IngestError::copy(table.name, e))?;

        let stats = CopyStats {
            table: table.name.to_string(),
            columns: columns.len(),
            bytes_sent,
            rows_copied,
            rows_in_table,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            table = table.name,
            rows_copied = stats.rows_copied,
            rows_in_table = stats.rows_in_table,
            bytes = stats.bytes_sent,
            elapsed_ms = stats.elapsed_ms,
            "Bulk copy committed"
        );

        Ok(stats)
    }
}

/// Column names from a header line, in file order.
pub fn parse_header(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Vec::new();
    }
    line.split('\t').map(|c| c.trim().to_string()).collect()
}

/// Every header column must exist in the catalog schema.
fn check_columns(table: &TableSchema, columns: &[String]) -> Result<()> {
    let unknown: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|c| table.column(c).is_none())
        .collect();

    if !unknown.is_empty() {
        return Err(IngestError::copy(
            table.name,
            format!("header names unknown columns: {}", unknown.join(", ")),
        ));
    }
    Ok(())
}

/// Tab-delimited CSV with the empty string as NULL.
pub fn copy_statement(table: &str, columns: &[String]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER E'\\t', NULL '')",
        quote_ident(table),
        quote_list(columns)
    )
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
