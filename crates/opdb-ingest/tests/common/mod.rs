//! Shared helpers for the database-backed loader tests
//!
//! Each test starts its own PostgreSQL container, so tests never share state.
//! They need a running Docker daemon and are `#[ignore]`d by default:
//!
//! ```bash
//! cargo test -p opdb-ingest -- --ignored --nocapture
//! ```

#![allow(dead_code)]

use anyhow::{Context, Result};
use opdb_ingest::catalog::Catalog;
use opdb_ingest::config::IngestConfig;
use opdb_ingest::db::{self, DatabaseHandle};
use std::path::{Path, PathBuf};
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tracing::info;

/// PostgreSQL image tag used by every test
pub const POSTGRES_TAG: &str = "16-alpine";

/// PostgreSQL container plus a loader handle connected to it
pub struct TestPostgres {
    // Dropping the container stops it
    container: ContainerAsync<Postgres>,
    db: DatabaseHandle,
    connection_string: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .with_tag(POSTGRES_TAG)
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let config = IngestConfig::with_url(&connection_string);
        let db = db::connect(&config.database)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!(%host, port, "PostgreSQL test container ready");

        Ok(Self {
            container,
            db,
            connection_string,
        })
    }

    /// Loader handle (single connection, same as a real run)
    pub fn db(&self) -> DatabaseHandle {
        self.db.clone()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Run configuration pointing at this container and `data_dir`.
    pub fn config(&self, data_dir: &Path) -> IngestConfig {
        IngestConfig::with_url(&self.connection_string).data_dir(data_dir)
    }

    pub async fn count(&self, table: &str) -> i64 {
        db::count_rows(&self.db, table)
            .await
            .unwrap_or_else(|e| panic!("count on {} failed: {}", table, e))
    }

    /// Number of derived rows of one identifier type.
    pub async fn count_type(&self, identifier_type: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM uniprot_identifiers WHERE identifier_type = $1",
        )
        .bind(identifier_type)
        .fetch_one(&self.db)
        .await
        .expect("count by type failed")
    }

    pub async fn table_exists(&self, table: &str) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(&self.db)
            .await
            .expect("to_regclass failed")
    }

    pub async fn index_names(&self, table: &str) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT indexname::text FROM pg_indexes WHERE tablename = $1 ORDER BY indexname",
        )
        .bind(table)
        .fetch_all(&self.db)
        .await
        .expect("pg_indexes query failed")
    }
}

/// Directory holding the sample exports, named the way the catalog expects.
pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn fixture_catalog() -> Catalog {
    Catalog::new(&fixtures_dir())
}

pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,opdb_ingest=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}
