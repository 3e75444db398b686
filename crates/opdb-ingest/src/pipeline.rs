//! Named operations
//!
//! Each operation strings the components together in load order:
//! provision, load, extract, index. Every stage commits before the next one
//! starts, and the first error stops the operation.

use crate::catalog::{Catalog, UNIPROT_KEY};
use crate::config::IngestConfig;
use crate::copy::{BulkCopyLoader, CopyStats};
use crate::db::DatabaseHandle;
use crate::error::{IngestError, Result};
use crate::extract::{ExtractionReport, IdentifierExtractor};
use crate::index::{IndexBuilder, IndexReport};
use crate::loader::{IdMappingDataset, LoadStats, ProteinDataset, RowBatchLoader};
use crate::progress::Progress;
use crate::schema::SchemaProvisioner;
use serde::Serialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct FullLoadReport {
    pub load: LoadStats,
    pub extraction: ExtractionReport,
    pub indexes: Option<IndexReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableLoadReport {
    pub copy: CopyStats,
    pub indexes: Option<IndexReport>,
}

/// Result of one operation, as logged by the binary
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "operation", content = "report", rename_all = "snake_case")]
pub enum RunReport {
    Full(FullLoadReport),
    Identifiers(ExtractionReport),
    Indexes(IndexReport),
    LoadTable(TableLoadReport),
    LoadAll(Vec<TableLoadReport>),
    IdMapping(LoadStats),
}

pub struct Pipeline<'a> {
    db: DatabaseHandle,
    config: &'a IngestConfig,
    catalog: &'a Catalog,
    progress: Progress,
}

impl<'a> Pipeline<'a> {
    pub fn new(db: DatabaseHandle, config: &'a IngestConfig, catalog: &'a Catalog) -> Self {
        Self {
            db,
            config,
            catalog,
            progress: Progress::new(config.show_progress),
        }
    }

    fn provisioner(&self) -> SchemaProvisioner<'a> {
        SchemaProvisioner::new(self.db.clone(), self.catalog)
    }

    fn indexer(&self) -> IndexBuilder {
        IndexBuilder::new(self.db.clone()).with_progress(self.progress.clone())
    }

    fn extractor(&self) -> IdentifierExtractor<'a> {
        IdentifierExtractor::new(self.db.clone(), self.catalog).with_progress(self.progress.clone())
    }

    /// Provision, load proteins, extract identifiers, then index.
    pub async fn full(&self, skip_indexes: bool) -> Result<FullLoadReport> {
        let proteins = &self.catalog.proteins;
        require_file(&proteins.file)?;

        info!(file = %proteins.file.display(), "Starting full UniProt load");
        self.provisioner().provision_uniprot().await?;

        let loader = RowBatchLoader::new(self.db.clone(), self.config.protein_batch_size)
            .with_progress(self.progress.clone());
        let load = loader
            .load(&proteins.file, ProteinDataset::new(&proteins.table)?)
            .await?;

        let extraction = self.extractor().run().await?;

        let indexes = if skip_indexes {
            info!("Skipping index creation");
            None
        } else {
            Some(self.indexer().build(&self.catalog.tables_for(UNIPROT_KEY)?).await?)
        };

        self.progress.finish();
        Ok(FullLoadReport {
            load,
            extraction,
            indexes,
        })
    }

    /// Recreate the derived table empty and recompute it from the stored proteins.
    pub async fn identifiers(&self) -> Result<ExtractionReport> {
        info!("Rebuilding identifiers");
        self.provisioner().recreate_identifiers().await?;
        let report = self.extractor().run().await?;
        self.progress.finish();
        Ok(report)
    }

    /// Create indexes for one dataset, or for every table in the catalog.
    pub async fn indexes(&self, dataset: Option<&str>) -> Result<IndexReport> {
        let tables = match dataset {
            Some(key) => self.catalog.tables_for(key)?,
            None => self.catalog.all_tables(),
        };
        let report = self.indexer().build(&tables).await?;
        self.progress.finish();
        Ok(report)
    }

    /// Provision and bulk-copy one webservice dataset.
    pub async fn load_table(&self, key: &str, skip_indexes: bool) -> Result<TableLoadReport> {
        let dataset = self.catalog.webservice(key)?;
        require_file(&dataset.file)?;
        let report = self.copy_dataset(key, skip_indexes).await?;
        self.progress.finish();
        Ok(report)
    }

    /// Every webservice dataset in catalog order. All files are checked
    /// before the first table is touched.
    pub async fn load_all(&self, skip_indexes: bool) -> Result<Vec<TableLoadReport>> {
        for dataset in &self.catalog.webservice {
            require_file(&dataset.file)?;
        }

        let mut reports = Vec::with_capacity(self.catalog.webservice.len());
        for key in self.catalog.webservice_keys() {
            reports.push(self.copy_dataset(key, skip_indexes).await?);
        }

        let total: i64 = reports.iter().map(|r| r.copy.rows_in_table).sum();
        info!(tables = reports.len(), rows = total, "All webservice tables loaded");

        self.progress.finish();
        Ok(reports)
    }

    /// Append the external id-mapping file to the derived table.
    pub async fn idmapping(&self) -> Result<LoadStats> {
        let file = &self.catalog.idmapping_file;
        require_file(file)?;

        let loader = RowBatchLoader::new(self.db.clone(), self.config.idmapping_batch_size)
            .with_progress(self.progress.clone());
        let stats = loader.load(file, IdMappingDataset::new()).await?;

        self.progress.finish();
        Ok(stats)
    }

    async fn copy_dataset(&self, key: &str, skip_indexes: bool) -> Result<TableLoadReport> {
        let dataset = self.catalog.webservice(key)?;
        info!(dataset = key, file = %dataset.file.display(), "Loading webservice table");

        self.provisioner().provision_table(&dataset.table).await?;

        let copy = BulkCopyLoader::new(self.db.clone())
            .with_progress(self.progress.clone())
            .load(dataset)
            .await?;

        let indexes = if skip_indexes {
            None
        } else {
            Some(self.indexer().build(&[&dataset.table]).await?)
        };

        Ok(TableLoadReport { copy, indexes })
    }
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(IngestError::MissingFile(path.to_path_buf()))
    }
}
