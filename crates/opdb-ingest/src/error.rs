//! Error types for the ingestion pipeline
//!
//! Only conditions that touch a transaction boundary or make a dataset
//! unloadable live here. Row-level anomalies (empty keys, wrong column counts,
//! non-numeric values) are absorbed by the loaders and counted in their stats.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Cannot connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Environment(#[from] opdb_common::CommonError),

    #[error("Schema change failed for '{table}': {source}")]
    Schema {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Input file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Failed to read '{}': {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("Batch {batch} write to '{table}' failed: {source}")]
    BatchWrite {
        table: String,
        batch: u64,
        #[source]
        source: sqlx::Error,
    },

    #[error("Bulk copy into '{table}' failed: {message}")]
    Copy { table: String, message: String },

    #[error("Extraction pass '{pass}' failed: {source}")]
    Extraction {
        pass: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Index '{index}' could not be created: {source}")]
    Index {
        index: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),
}

impl IngestError {
    pub fn schema(table: impl Into<String>, source: sqlx::Error) -> Self {
        Self::Schema {
            table: table.into(),
            source,
        }
    }

    pub fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn copy(table: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Copy {
            table: table.into(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_object() {
        let err = IngestError::schema("uniprot_proteins", sqlx::Error::PoolClosed);
        assert!(err.to_string().starts_with("Schema change failed for 'uniprot_proteins'"));

        let err = IngestError::MissingFile(PathBuf::from("data/complexes.tsv"));
        assert_eq!(err.to_string(), "Input file not found: data/complexes.tsv");

        let err = IngestError::BatchWrite {
            table: "uniprot_proteins".into(),
            batch: 7,
            source: sqlx::Error::PoolClosed,
        };
        assert!(err.to_string().starts_with("Batch 7 write to 'uniprot_proteins' failed"));
    }
}
