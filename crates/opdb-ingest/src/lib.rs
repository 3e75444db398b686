//! OmniPath DB Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the UniProt protein export and the OmniPath webservice exports into
//! PostgreSQL, derives the searchable identifier table and builds the lookup
//! indexes.
//!
//! # Components
//!
//! - **Schema** ([`schema`]): drop-and-recreate provisioning of catalog tables
//! - **Row-batch loading** ([`loader`]): streamed, batched upserts of parsed rows
//! - **Bulk copy** ([`copy`]): `COPY FROM STDIN` for already-clean exports
//! - **Extraction** ([`extract`]): set-based derivation of identifier records
//! - **Indexes** ([`index`]): deferred, idempotent index creation
//!
//! # Example
//!
//! ```no_run
//! use opdb_ingest::{db, Catalog, IngestConfig, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let catalog = Catalog::new(&config.data_dir);
//!     let pool = db::connect(&config.database).await?;
//!
//!     let report = Pipeline::new(pool.clone(), &config, &catalog).full(false).await?;
//!     println!("{} proteins, {} identifiers", report.load.rows_accepted, report.extraction.total);
//!
//!     db::close(pool).await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod copy;
pub mod db;
pub mod error;
pub mod extract;
pub mod index;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod schema;
pub mod tsv;

pub use catalog::Catalog;
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{Pipeline, RunReport};
