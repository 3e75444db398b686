//! Row-batch loader
//!
//! Streams a source file, maps each record through a [`BatchDataset`] and
//! flushes fixed-size batches, each in its own transaction. A failed flush
//! rolls back that batch only and aborts the load; everything committed
//! before it stays.

pub mod idmapping;
pub mod proteins;

pub use idmapping::IdMappingDataset;
pub use proteins::ProteinDataset;

use crate::config::MAX_BIND_PARAMS;
use crate::db::DatabaseHandle;
use crate::error::{IngestError, Result};
use crate::progress::Progress;
use crate::tsv::{Layout, TsvReader, TsvRow};
use async_trait::async_trait;
use csv_async::StringRecord;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of mapping one source record
#[derive(Debug, PartialEq)]
pub enum Mapped<R> {
    Row(R),
    /// The natural key (or another required field) is empty
    EmptyKey,
    /// Well-formed but outside the accepted set
    Filtered,
}

/// A dataset the row-batch loader can drive
#[async_trait]
pub trait BatchDataset: Send + Sync {
    type Row: Send + Sync;

    /// Target table, used in logs and errors
    fn table(&self) -> &str;

    fn layout(&self) -> Layout;

    /// Bind parameters per row in [`BatchDataset::write_batch`]
    fn bound_columns(&self) -> usize;

    /// Receives the header line (if the layout has one) before any row.
    fn prepare(&mut self, _headers: Option<&StringRecord>) -> Result<()> {
        Ok(())
    }

    fn map(&self, record: &StringRecord) -> Mapped<Self::Row>;

    /// Natural key used to collapse duplicates inside one batch.
    fn key<'r>(&self, _row: &'r Self::Row) -> Option<&'r str> {
        None
    }

    /// Write one batch inside the supplied transaction, returning the number
    /// of rows the statement affected.
    async fn write_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[Self::Row],
    ) -> std::result::Result<u64, sqlx::Error>;
}

/// Counters for one row-batch load
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub table: String,
    /// Data lines read, including skipped ones
    pub rows_processed: u64,
    /// Rows handed to the database
    pub rows_accepted: u64,
    /// Rows the inserts reported as affected
    pub rows_written: u64,
    pub batches: u64,
    pub skipped_empty_key: u64,
    pub skipped_malformed: u64,
    pub skipped_filtered: u64,
    /// Repeated natural keys collapsed inside a batch
    pub duplicate_keys: u64,
    /// Accepted rows the database did not write (no owning record)
    pub unmatched: u64,
    pub elapsed_ms: u64,
}

impl LoadStats {
    fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn skipped(&self) -> u64 {
        self.skipped_empty_key + self.skipped_malformed + self.skipped_filtered + self.duplicate_keys
    }
}

/// Ensure one batch statement stays under the Postgres bind-parameter cap.
pub fn check_bind_width(table: &str, batch_size: usize, columns: usize) -> Result<()> {
    if batch_size == 0 || batch_size.saturating_mul(columns) > MAX_BIND_PARAMS {
        return Err(IngestError::Config(format!(
            "batch size {} for '{}' must be between 1 and {}",
            batch_size,
            table,
            MAX_BIND_PARAMS / columns.max(1)
        )));
    }
    Ok(())
}

pub struct RowBatchLoader {
    db: DatabaseHandle,
    batch_size: usize,
    progress: Progress,
}

impl RowBatchLoader {
    pub fn new(db: DatabaseHandle, batch_size: usize) -> Self {
        Self {
            db,
            batch_size,
            progress: Progress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Stream `path` into the dataset's table.
    pub async fn load<D: BatchDataset>(&self, path: &Path, mut dataset: D) -> Result<LoadStats> {
        check_bind_width(dataset.table(), self.batch_size, dataset.bound_columns())?;

        let started = Instant::now();
        let mut reader = TsvReader::open(path, dataset.layout()).await?;
        dataset.prepare(reader.headers())?;

        let mut stats = LoadStats::new(dataset.table());
        let mut batch: Vec<D::Row> = Vec::with_capacity(self.batch_size);
        let mut seen: HashSet<String> = HashSet::new();

        info!(
            table = dataset.table(),
            file = %path.display(),
            batch_size = self.batch_size,
            "Loading rows"
        );

        while let Some(row) = reader.next_row().await? {
            stats.rows_processed += 1;

            let record = match row {
                TsvRow::Record(record) => record,
                TsvRow::Malformed { line, reason } => {
                    warn!(table = dataset.table(), line, %reason, "Skipping malformed row");
                    stats.skipped_malformed += 1;
                    continue;
                },
            };

            match dataset.map(&record) {
                Mapped::Row(row) => {
                    if let Some(key) = dataset.key(&row) {
                        if !seen.insert(key.to_string()) {
                            stats.duplicate_keys += 1;
                            continue;
                        }
                    }
                    batch.push(row);
                    stats.rows_accepted += 1;
                },
                Mapped::EmptyKey => {
                    warn!(
                        table = dataset.table(),
                        row = stats.rows_processed,
                        "Skipping row with empty key"
                    );
                    stats.skipped_empty_key += 1;
                },
                Mapped::Filtered => stats.skipped_filtered += 1,
            }

            if batch.len() >= self.batch_size {
                self.flush(&dataset, &mut batch, &mut stats).await?;
                seen.clear();
            }
        }

        if !batch.is_empty() {
            self.flush(&dataset, &mut batch, &mut stats).await?;
        }

        stats.unmatched = stats.rows_accepted.saturating_sub(stats.rows_written);
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            table = %stats.table,
            rows_processed = stats.rows_processed,
            rows_accepted = stats.rows_accepted,
            rows_written = stats.rows_written,
            skipped = stats.skipped(),
            unmatched = stats.unmatched,
            elapsed_ms = stats.elapsed_ms,
            "Load complete"
        );

        Ok(stats)
    }

    async fn flush<D: BatchDataset>(
        &self,
        dataset: &D,
        batch: &mut Vec<D::Row>,
        stats: &mut LoadStats,
    ) -> Result<()> {
        let number = stats.batches + 1;
        let fail = |source: sqlx::Error| IngestError::BatchWrite {
            table: dataset.table().to_string(),
            batch: number,
            source,
        };

        let mut tx = self.db.begin().await.map_err(fail)?;

        let written = match dataset.write_batch(&mut tx, batch.as_slice()).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(table = dataset.table(), batch = number, error = %rollback, "Rollback failed");
                }
                return Err(fail(e));
            },
        };

        tx.commit().await.map_err(fail)?;

        stats.batches = number;
        stats.rows_written += written;
        batch.clear();

        info!(
            table = dataset.table(),
            batch = number,
            rows_processed = stats.rows_processed,
            rows_accepted = stats.rows_accepted,
            "Batch committed"
        );
        self.progress
            .rows(dataset.table(), stats.rows_processed, stats.rows_accepted);

        Ok(())
    }
}

/// Parse an integer column, treating anything but plain digits as null.
///
/// Signs are rejected: UniProt counts such as length and mass are never
/// negative, so `-5` or `+7` in those columns is corrupt input.
pub fn coerce_integer(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
