//! Schema provisioning
//!
//! Full-reset DDL: every table is dropped (cascading to dependents) and
//! recreated from its catalog schema. All statements of one provisioning call
//! run in a single transaction.

use crate::catalog::{Catalog, TableSchema};
use crate::db::DatabaseHandle;
use crate::error::{IngestError, Result};
use sqlx::{Postgres, Transaction};
use tracing::info;

const TRIGRAM_EXTENSION_SQL: &str = "CREATE EXTENSION IF NOT EXISTS pg_trgm";

/// Creates destination tables and the extensions their indexes need
pub struct SchemaProvisioner<'a> {
    db: DatabaseHandle,
    catalog: &'a Catalog,
}

impl<'a> SchemaProvisioner<'a> {
    pub fn new(db: DatabaseHandle, catalog: &'a Catalog) -> Self {
        Self { db, catalog }
    }

    /// Drop and recreate the protein table and its derived identifier table.
    pub async fn provision_uniprot(&self) -> Result<()> {
        let proteins = &self.catalog.proteins.table;
        let identifiers = &self.catalog.identifiers;

        // Children are dropped before parents, then created in reverse.
        self.provision(&[identifiers, proteins], &[proteins, identifiers])
            .await
    }

    /// Drop and recreate only the derived identifier table, leaving the
    /// primary records in place.
    pub async fn recreate_identifiers(&self) -> Result<()> {
        let identifiers = &self.catalog.identifiers;
        self.provision(&[identifiers], &[identifiers]).await
    }

    /// Drop and recreate one table from the catalog.
    pub async fn provision_table(&self, table: &TableSchema) -> Result<()> {
        self.provision(&[table], &[table]).await
    }

    async fn provision(&self, drop: &[&TableSchema], create: &[&TableSchema]) -> Result<()> {
        let first = create.first().map(|t| t.name).unwrap_or_default();
        let mut tx = self
            .db
            .begin()
            .await
            .map_err(|e| IngestError::schema(first, e))?;

        if create.iter().any(|t| t.needs_trigram()) {
            execute(&mut tx, first, TRIGRAM_EXTENSION_SQL).await?;
        }

        for table in drop {
            execute(&mut tx, table.name, &table.drop_sql()).await?;
        }

        for table in create {
            execute(&mut tx, table.name, &table.create_sql()).await?;
            info!(table = table.name, "Table created");
        }

        tx.commit().await.map_err(|e| IngestError::schema(first, e))?;

        Ok(())
    }
}

async fn execute(tx: &mut Transaction<'_, Postgres>, table: &str, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(&mut **tx)
        .await
        .map(|_| ())
        .map_err(|e| IngestError::schema(table, e))
}
