//! OmniPath DB Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared plumbing for the OmniPath DB loaders.
//!
//! - **Logging**: `tracing` subscriber setup driven by `LogConfig`
//! - **Errors**: the `CommonError` type for configuration and environment failures
//! - **SQL**: identifier quoting for statements assembled from catalog names
//!
//! # Example
//!
//! ```no_run
//! use opdb_common::logging::{init_logging, LogConfig};
//! use opdb_common::sql::quote_ident;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!(table = %quote_ident("references"), "ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod sql;

pub use error::{CommonError, Result};
