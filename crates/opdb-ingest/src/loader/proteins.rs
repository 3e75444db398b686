//! UniProt protein rows
//!
//! Header names from the UniProt TSV export are mapped onto the catalog
//! columns. The upsert re-asserts the natural key on conflict and leaves every
//! other column as first written.

use super::{coerce_integer, BatchDataset, Mapped};
use crate::catalog::TableSchema;
use crate::error::{IngestError, Result};
use crate::tsv::{HeaderMap, Layout};
use async_trait::async_trait;
use csv_async::StringRecord;
use opdb_common::sql::{quote_ident, quote_list};
use sqlx::{Postgres, QueryBuilder, Transaction};
use tracing::warn;

const KEY_COLUMN: &str = "entry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Integer(Option<i32>),
}

/// One protein row in catalog column order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinRow {
    pub entry: String,
    pub values: Vec<FieldValue>,
}

pub struct ProteinDataset<'a> {
    table: &'a TableSchema,
    /// Catalog column order, without the serial id
    columns: Vec<&'static str>,
    integer: Vec<bool>,
    key_index: usize,
    headers: Option<HeaderMap>,
}

impl<'a> ProteinDataset<'a> {
    pub fn new(table: &'a TableSchema) -> Result<Self> {
        let columns: Vec<&'static str> = table.loaded_columns().map(|c| c.name).collect();
        let integer = table.loaded_columns().map(|c| c.ty.is_integer()).collect();
        let key_index = columns
            .iter()
            .position(|c| *c == KEY_COLUMN)
            .ok_or_else(|| {
                IngestError::Config(format!("table '{}' has no '{}' column", table.name, KEY_COLUMN))
            })?;

        Ok(Self {
            table,
            columns,
            integer,
            key_index,
            headers: None,
        })
    }

    fn upsert_prefix(&self) -> String {
        format!(
            "INSERT INTO {} ({}) ",
            quote_ident(self.table.name),
            quote_list(&self.columns)
        )
    }

    fn conflict_clause(&self) -> String {
        let key = quote_ident(KEY_COLUMN);
        format!(" ON CONFLICT ({key}) DO UPDATE SET {key} = EXCLUDED.{key}")
    }
}

#[async_trait]
impl<'a> BatchDataset for ProteinDataset<'a> {
    type Row = ProteinRow;

    fn table(&self) -> &str {
        self.table.name
    }

    fn layout(&self) -> Layout {
        Layout::Header
    }

    fn bound_columns(&self) -> usize {
        self.columns.len()
    }

    fn prepare(&mut self, headers: Option<&StringRecord>) -> Result<()> {
        let headers = headers.ok_or_else(|| IngestError::Config("protein file needs a header line".into()))?;
        let map = HeaderMap::new(headers, self.table.loaded_columns());

        if !map.contains(self.key_index) {
            return Err(IngestError::Config(format!(
                "protein file has no header for the '{}' column",
                KEY_COLUMN
            )));
        }
        if map.missing() > 0 {
            warn!(
                table = self.table.name,
                missing = map.missing(),
                "Source file lacks some catalog columns; they will be empty"
            );
        }

        self.headers = Some(map);
        Ok(())
    }

    fn map(&self, record: &StringRecord) -> Mapped<ProteinRow> {
        let Some(headers) = &self.headers else {
            return Mapped::EmptyKey;
        };

        let entry = headers.get(record, self.key_index).trim();
        if entry.is_empty() {
            return Mapped::EmptyKey;
        }

        let values = self
            .integer
            .iter()
            .enumerate()
            .map(|(i, is_integer)| {
                let raw = headers.get(record, i);
                if *is_integer {
                    FieldValue::Integer(coerce_integer(raw))
                } else {
                    FieldValue::Text(raw.trim().to_string())
                }
            })
            .collect();

        Mapped::Row(ProteinRow {
            entry: entry.to_string(),
            values,
        })
    }

    fn key<'r>(&self, row: &'r ProteinRow) -> Option<&'r str> {
        Some(row.entry.as_str())
    }

    async fn write_batch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[ProteinRow],
    ) -> std::result::Result<u64, sqlx::Error> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(self.upsert_prefix());

        query_builder.push_values(rows, |mut b, row| {
            for value in &row.values {
                match value {
                    FieldValue::Text(text) => b.push_bind(text.as_str()),
                    FieldValue::Integer(number) => b.push_bind(*number),
                };
            }
        });

        query_builder.push(self.conflict_clause());

        let result = query_builder.build().execute(&mut **tx).await?;
        Ok(result.rows_affected())
    }
}
