//! External id-mapping rows
//!
//! Headerless `accession <TAB> type <TAB> value` lines. Only a small set of
//! identifier types is kept. Each batch is joined against the protein table
//! so every written record has an owning protein; accessions without one are
//! dropped by the join.

use super::{BatchDataset, Mapped};
use crate::catalog::{IdentifierType, IDENTIFIERS_TABLE, PROTEINS_TABLE};
use crate::config::IDMAPPING_BOUND_COLUMNS;
use crate::tsv::Layout;
use async_trait::async_trait;
use csv_async::StringRecord;
use sqlx::{Postgres, QueryBuilder, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMappingRow {
    pub accession: String,
    pub identifier_type: IdentifierType,
    pub value: String,
}

#[derive(Debug, Default)]
pub struct IdMappingDataset;

impl IdMappingDataset {
    pub fn new() -> Self {
        Self
    }
}

fn insert_prefix() -> String {
    format!(
        "INSERT INTO {IDENTIFIERS_TABLE} (protein_id, uniprot_accession, identifier_value, identifier_type, taxon_id) \
         SELECT p.id, v.accession, v.identifier_value, v.identifier_type, p.organism_id FROM ("
    )
}

fn join_suffix() -> String {
    format!(") AS v (accession, identifier_value, identifier_type) JOIN {PROTEINS_TABLE} p ON p.entry = v.accession")
}

#[async_trait]
impl BatchDataset for IdMappingDataset {
    type Row = IdMappingRow;

    fn table(&self) -> &str {
        IDENTIFIERS_TABLE
    }

    fn layout(&self) -> Layout {
        Layout::Fixed(3)
    }

    fn bound_columns(&self) -> usize {
        IDMAPPING_BOUND_COLUMNS
    }

    fn map(&self, record: &StringRecord) -> Mapped<IdMappingRow> {
        let field = |i| record.get(i).map(str::trim).unwrap_or("");
        let (accession, tag, value) = (field(0), field(1), field(2));

        let Some(identifier_type) = IdentifierType::from_external(tag) else {
            return Mapped::Filtered;
        };
        if accession.is_empty() || value.is_empty() {
            return Mapped::EmptyKey;
        }

        Mapped::Row(IdMappingRow {
            accession: accession.to_string(),
            identifier_type,
            value: value.to_string(),
        })
    }

    async fn write_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[IdMappingRow],
    ) -> std::result::Result<u64, sqlx::Error> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix());

        query_builder.push_values(rows, |mut b, row| {
            b.push_bind(row.accession.as_str())
                .push_bind(row.value.as_str())
                .push_bind(row.identifier_type.as_str());
        });

        query_builder.push(join_suffix());

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}
