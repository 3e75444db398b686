//! Loader configuration
//!
//! Everything a run needs is resolved once, at startup, from `.env`, the
//! environment and CLI overrides. Components receive the resulting value by
//! reference; nothing reads the environment after this point.

use crate::catalog::{IDENTIFIERS_TABLE, PROTEINS_TABLE};
use crate::error::{IngestError, Result};
use crate::loader::check_bind_width;
use opdb_common::error::{parse_env, CommonError};
use sqlx::postgres::PgConnectOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default directory holding the source TSV files.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Rows per flush for the UniProt protein file (34 bound columns per row).
pub const DEFAULT_PROTEIN_BATCH_SIZE: usize = 1_000;

/// Rows per flush for the 3-column id-mapping file.
pub const DEFAULT_IDMAPPING_BATCH_SIZE: usize = 10_000;

/// Default connection timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Postgres rejects statements with more bind parameters than this.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Bound columns per protein row in the batched upsert.
pub const PROTEIN_BOUND_COLUMNS: usize = 34;

/// Bound columns per id-mapping row (accession, value, type).
pub const IDMAPPING_BOUND_COLUMNS: usize = 3;

const SPLIT_DB_VARS: [&str; 5] = ["DB_HOST", "DB_PORT", "DB_USER", "DB_PASSWORD", "DB_NAME"];

/// Where to connect.
#[derive(Clone)]
pub enum DatabaseTarget {
    /// A full `postgresql://` URL (`DATABASE_URL`)
    Url(String),
    /// The split `DB_*` variables
    Parts {
        host: String,
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

impl DatabaseTarget {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseTarget::Url(url) => PgConnectOptions::from_str(url)
                .map_err(|e| IngestError::Config(format!("invalid DATABASE_URL: {}", e))),
            DatabaseTarget::Parts {
                host,
                port,
                user,
                password,
                name,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .username(user)
                .password(password)
                .database(name)),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            DatabaseTarget::Url(url) => url.trim().is_empty(),
            DatabaseTarget::Parts { host, name, .. } => host.is_empty() || name.is_empty(),
        }
    }
}

impl std::fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseTarget::Url(_) => f.write_str("Url(<redacted>)"),
            DatabaseTarget::Parts {
                host, port, user, name, ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    pub connect_timeout_secs: u64,
}

/// Complete configuration for one loader run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub database: DatabaseConfig,
    /// Directory the catalog resolves source file names against
    pub data_dir: PathBuf,
    pub protein_batch_size: usize,
    pub idmapping_batch_size: usize,
    /// Show an interactive spinner next to the log output
    pub show_progress: bool,
}

impl IngestConfig {
    /// Load configuration from `.env` and the environment
    ///
    /// - `DATABASE_URL`, or all of `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`
    /// - `OPDB_DATA_DIR`
    /// - `OPDB_PROTEIN_BATCH_SIZE`, `OPDB_IDMAPPING_BATCH_SIZE`
    /// - `OPDB_CONNECT_TIMEOUT` (seconds)
    ///
    /// Values are not range-checked here so CLI flags can still override
    /// them; call [`IngestConfig::validate`] once overrides are applied.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let target = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => DatabaseTarget::Url(url),
            _ => split_target_from_env()?,
        };

        let config = Self {
            database: DatabaseConfig {
                target,
                connect_timeout_secs: parse_env("OPDB_CONNECT_TIMEOUT")?
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            data_dir: std::env::var("OPDB_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR)),
            protein_batch_size: parse_env("OPDB_PROTEIN_BATCH_SIZE")?
                .unwrap_or(DEFAULT_PROTEIN_BATCH_SIZE),
            idmapping_batch_size: parse_env("OPDB_IDMAPPING_BATCH_SIZE")?
                .unwrap_or(DEFAULT_IDMAPPING_BATCH_SIZE),
            show_progress: true,
        };

        Ok(config)
    }

    /// Configuration pointing at an explicit URL, with every other value defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            database: DatabaseConfig {
                target: DatabaseTarget::Url(url.into()),
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            protein_batch_size: DEFAULT_PROTEIN_BATCH_SIZE,
            idmapping_batch_size: DEFAULT_IDMAPPING_BATCH_SIZE,
            show_progress: false,
        }
    }

    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Override both row-batch sizes.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.protein_batch_size = size;
        self.idmapping_batch_size = size;
        self
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.target.is_empty() {
            return Err(IngestError::Config("database target cannot be empty".into()));
        }

        if self.protein_batch_size == 0 || self.idmapping_batch_size == 0 {
            return Err(IngestError::Config("batch sizes must be greater than 0".into()));
        }

        check_bind_width(PROTEINS_TABLE, self.protein_batch_size, PROTEIN_BOUND_COLUMNS)?;
        check_bind_width(IDENTIFIERS_TABLE, self.idmapping_batch_size, IDMAPPING_BOUND_COLUMNS)?;

        if self.database.connect_timeout_secs == 0 {
            return Err(IngestError::Config("connect timeout must be greater than 0".into()));
        }

        Ok(())
    }
}

fn split_target_from_env() -> Result<DatabaseTarget> {
    let missing: Vec<String> = SPLIT_DB_VARS
        .iter()
        .filter(|key| std::env::var(key).map(|v| v.is_empty()).unwrap_or(true))
        .map(|key| key.to_string())
        .collect();

    if !missing.is_empty() {
        let mut keys = vec!["DATABASE_URL".to_string()];
        keys.extend(missing);
        return Err(CommonError::MissingEnv(keys).into());
    }

    let var = |key: &str| std::env::var(key).unwrap_or_default();

    Ok(DatabaseTarget::Parts {
        host: var("DB_HOST"),
        port: parse_env("DB_PORT")?.unwrap_or(5432),
        user: var("DB_USER"),
        password: var("DB_PASSWORD"),
        name: var("DB_NAME"),
    })
}
