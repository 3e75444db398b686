//! Derived-identifier extraction
//!
//! Recomputes `uniprot_identifiers` from the committed protein rows. Each pass
//! is one `INSERT ... SELECT` over the whole protein table; all five run in a
//! single transaction, so either every pass lands or none does. The derived
//! table must be empty beforehand.

pub mod rules;

use crate::catalog::{Catalog, IdentifierType};
use crate::db::DatabaseHandle;
use crate::error::{IngestError, Result};
use crate::progress::Progress;
use opdb_common::sql::quote_ident;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

pub use rules::{gene_synonyms, NameRules, ProteinFields, PAREN_GROUP_PATTERN};

/// One extraction rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionPass {
    Accession,
    GenePrimary,
    GeneSynonym,
    ProteinPrimary,
    ProteinAlternative,
}

impl ExtractionPass {
    pub const ALL: [ExtractionPass; 5] = [
        ExtractionPass::Accession,
        ExtractionPass::GenePrimary,
        ExtractionPass::GeneSynonym,
        ExtractionPass::ProteinPrimary,
        ExtractionPass::ProteinAlternative,
    ];

    pub fn identifier_type(&self) -> IdentifierType {
        match self {
            ExtractionPass::Accession => IdentifierType::UniprotAccession,
            ExtractionPass::GenePrimary => IdentifierType::GenePrimary,
            ExtractionPass::GeneSynonym => IdentifierType::GeneSynonym,
            ExtractionPass::ProteinPrimary => IdentifierType::ProteinPrimary,
            ExtractionPass::ProteinAlternative => IdentifierType::ProteinAlternative,
        }
    }

    pub fn name(&self) -> &'static str {
        self.identifier_type().as_str()
    }

    /// `SELECT` yielding `(protein_id, accession, value, type, taxon)` rows.
    /// The type tag is bound as `$1`.
    fn select_sql(&self, proteins: &str) -> String {
        match self {
            ExtractionPass::Accession => format!(
                "SELECT p.id, p.entry, p.entry, $1, p.organism_id FROM {proteins} p \
                 WHERE p.entry IS NOT NULL AND p.entry <> ''"
            ),
            ExtractionPass::GenePrimary => {
                let value = strip("p.gene_names_primary");
                format!(
                    "SELECT p.id, p.entry, {value}, $1, p.organism_id FROM {proteins} p \
                     WHERE p.gene_names_primary IS NOT NULL AND {value} <> ''"
                )
            },
            ExtractionPass::GeneSynonym => format!(
                "SELECT p.id, p.entry, s.token, $1, p.organism_id FROM {proteins} p \
                 CROSS JOIN LATERAL regexp_split_to_table(p.gene_names_synonym, '\\s+') AS s(token) \
                 WHERE p.gene_names_synonym IS NOT NULL AND s.token <> ''"
            ),
            ExtractionPass::ProteinPrimary => {
                let value = strip("split_part(p.protein_names, '(', 1)");
                format!(
                    "SELECT p.id, p.entry, {value}, $1, p.organism_id FROM {proteins} p \
                     WHERE p.protein_names IS NOT NULL AND {value} <> ''"
                )
            },
            ExtractionPass::ProteinAlternative => {
                let value = strip("m.groups[1]");
                format!(
                    "SELECT p.id, p.entry, {value}, $1, p.organism_id FROM {proteins} p \
                     CROSS JOIN LATERAL regexp_matches(p.protein_names, '{PAREN_GROUP_PATTERN}', 'g') AS m(groups) \
                     WHERE {value} <> ''"
                )
            },
        }
    }

    pub fn insert_sql(&self, identifiers: &str, proteins: &str) -> String {
        format!(
            "INSERT INTO {} (protein_id, uniprot_accession, identifier_value, identifier_type, taxon_id) {}",
            quote_ident(identifiers),
            self.select_sql(&quote_ident(proteins))
        )
    }
}

impl std::fmt::Display for ExtractionPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Leading and trailing whitespace removed
fn strip(expr: &str) -> String {
    format!("regexp_replace({expr}, '^\\s+|\\s+$', '', 'g')")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassCount {
    pub pass: &'static str,
    pub count: u64,
}

/// Per-pass derived record counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionReport {
    pub passes: Vec<PassCount>,
    pub total: u64,
    pub elapsed_ms: u64,
}

impl ExtractionReport {
    pub fn count(&self, pass: ExtractionPass) -> Option<u64> {
        self.passes
            .iter()
            .find(|p| p.pass == pass.name())
            .map(|p| p.count)
    }
}

pub struct IdentifierExtractor<'a> {
    db: DatabaseHandle,
    catalog: &'a Catalog,
    progress: Progress,
}

impl<'a> IdentifierExtractor<'a> {
    pub fn new(db: DatabaseHandle, catalog: &'a Catalog) -> Self {
        Self {
            db,
            catalog,
            progress: Progress::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Run every pass in order inside one transaction.
    pub async fn run(&self) -> Result<ExtractionReport> {
        let identifiers = self.catalog.identifiers.name;
        let proteins = self.catalog.proteins.table.name;
        let started = Instant::now();

        let mut tx = self.db.begin().await.map_err(|e| IngestError::Extraction {
            pass: "begin".into(),
            source: e,
        })?;

        let mut report = ExtractionReport::default();

        for pass in ExtractionPass::ALL {
            self.progress.stage(format!("extracting {}", pass));
            let pass_started = Instant::now();

            let result = sqlx::query(&pass.insert_sql(identifiers, proteins))
                .bind(pass.name())
                .execute(&mut *tx)
                .await
                .map_err(|e| IngestError::Extraction {
                    pass: pass.name().to_string(),
                    source: e,
                })?;

            let count = result.rows_affected();
            info!(
                pass = pass.name(),
                count,
                elapsed_ms = pass_started.elapsed().as_millis() as u64,
                "Extraction pass complete"
            );

            report.passes.push(PassCount {
                pass: pass.name(),
                count,
            });
            report.total += count;
        }

        tx.commit().await.map_err(|e| IngestError::Extraction {
            pass: "commit".into(),
            source: e,
        })?;

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(total = report.total, elapsed_ms = report.elapsed_ms, "Identifiers extracted");

        Ok(report)
    }
}
