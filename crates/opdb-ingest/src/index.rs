//! Deferred index construction
//!
//! Runs after loading. Every index is `CREATE INDEX IF NOT EXISTS`, so a
//! repeated run only creates what is missing.

use crate::catalog::TableSchema;
use crate::db::DatabaseHandle;
use crate::error::{IngestError, Result};
use crate::progress::Progress;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Index names, in creation order
    pub indexes: Vec<String>,
    pub tables: Vec<String>,
    pub elapsed_ms: u64,
}

pub struct IndexBuilder {
    db: DatabaseHandle,
    progress: Progress,
}

impl IndexBuilder {
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

    /// Create every index of the given tables, one transaction per table.
    pub async fn build(&self, tables: &[&TableSchema]) -> Result<IndexReport> {
        let started = Instant::now();
        let mut report = IndexReport::default();

        if tables.iter().any(|t| t.needs_trigram()) {
            sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm")
                .execute(&self.db)
                .await
                .map_err(|e| IngestError::Index {
                    index: "pg_trgm".into(),
                    source: e,
                })?;
        }

        for table in tables {
            let index_error = |index: &str, source: sqlx::Error| IngestError::Index {
                index: index.to_string(),
                source,
            };

            let mut tx = self
                .db
                .begin()
                .await
                .map_err(|e| index_error(table.name, e))?;

            for index in &table.indexes {
                self.progress.stage(format!("creating {}", index.name));
                let index_started = Instant::now();

                sqlx::query(&index.create_sql())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| index_error(&index.name, e))?;

                info!(
                    table = table.name,
                    index = %index.name,
                    elapsed_ms = index_started.elapsed().as_millis() as u64,
                    "Index ready"
                );
                report.indexes.push(index.name.clone());
            }

            tx.commit().await.map_err(|e| index_error(table.name, e))?;
            report.tables.push(table.name.to_string());
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            indexes = report.indexes.len(),
            tables = report.tables.len(),
            elapsed_ms = report.elapsed_ms,
            "Indexes built"
        );

        Ok(report)
    }
}
