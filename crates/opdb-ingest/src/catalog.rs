//! Dataset catalog
//!
//! Declarative description of every dataset the loaders know about: source
//! file, target table, column schema and secondary indexes. A `Catalog` is
//! built once from the run configuration and handed to each component by
//! reference.

use crate::error::{IngestError, Result};
use opdb_common::sql::{quote_ident, quote_list};
use std::path::{Path, PathBuf};

pub const PROTEINS_TABLE: &str = "uniprot_proteins";
pub const IDENTIFIERS_TABLE: &str = "uniprot_identifiers";

pub const UNIPROT_KEY: &str = "uniprot";
pub const IDMAPPING_KEY: &str = "idmapping";

const UNIPROT_FILE: &str = "uniprotkb_proteins.tsv";
const IDMAPPING_FILE: &str = "HUMAN_9606_idmapping.dat";

// ============================================================================
// Identifier vocabulary
// ============================================================================

/// Type tag carried by every derived identifier record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierType {
    UniprotAccession,
    GenePrimary,
    GeneSynonym,
    ProteinPrimary,
    ProteinAlternative,
    Hgnc,
    GeneName,
    GeneCards,
    GeneWiki,
}

impl IdentifierType {
    /// Types accepted from the external id-mapping file
    pub const EXTERNAL: [IdentifierType; 4] = [
        IdentifierType::Hgnc,
        IdentifierType::GeneName,
        IdentifierType::GeneCards,
        IdentifierType::GeneWiki,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::UniprotAccession => "uniprot_accession",
            IdentifierType::GenePrimary => "gene_primary",
            IdentifierType::GeneSynonym => "gene_synonym",
            IdentifierType::ProteinPrimary => "protein_primary",
            IdentifierType::ProteinAlternative => "protein_alternative",
            IdentifierType::Hgnc => "HGNC",
            IdentifierType::GeneName => "Gene_Name",
            IdentifierType::GeneCards => "GeneCards",
            IdentifierType::GeneWiki => "GeneWiki",
        }
    }

    /// Parse one of the external id-mapping tags; internal tags are not accepted.
    pub fn from_external(tag: &str) -> Option<Self> {
        Self::EXTERNAL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Columns and tables
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Serial,
    Text,
    VarChar(u16),
    Integer,
    BigInt,
    Boolean,
    Jsonb,
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Serial => "SERIAL".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::VarChar(n) => format!("VARCHAR({})", n),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Jsonb => "JSONB".to_string(),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::BigInt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    PrimaryKey,
    /// Natural key: unique and never null
    UniqueNotNull,
    NotNull,
    /// Owning-record reference, deleted together with its parent row
    CascadeReference { table: &'static str, column: &'static str },
}

impl Constraint {
    fn sql(&self) -> String {
        match self {
            Constraint::PrimaryKey => "PRIMARY KEY".to_string(),
            Constraint::UniqueNotNull => "UNIQUE NOT NULL".to_string(),
            Constraint::NotNull => "NOT NULL".to_string(),
            Constraint::CascadeReference { table, column } => format!(
                "REFERENCES {} ({}) ON DELETE CASCADE",
                quote_ident(table),
                quote_ident(column)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub constraint: Option<Constraint>,
    /// Header in the source TSV this column is read from (row-batch datasets)
    pub source_header: Option<&'static str>,
}

impl Column {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            constraint: None,
            source_header: None,
        }
    }

    pub fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn header(mut self, header: &'static str) -> Self {
        self.source_header = Some(header);
        self
    }

    fn definition(&self) -> String {
        match &self.constraint {
            Some(c) => format!("{} {} {}", quote_ident(self.name), self.ty.sql(), c.sql()),
            None => format!("{} {}", quote_ident(self.name), self.ty.sql()),
        }
    }
}

fn id_column() -> Column {
    Column::new("id", ColumnType::Serial).constraint(Constraint::PrimaryKey)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    /// Plain b-tree equality index
    BTree,
    /// GIN over `gin_trgm_ops` for similarity / fuzzy matching
    Trigram,
    /// b-tree over `text_pattern_ops` for `LIKE 'prefix%'`
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub table: &'static str,
    pub columns: Vec<&'static str>,
    pub method: IndexMethod,
}

impl IndexDef {
    pub fn new(table: &'static str, suffix: &str, columns: &[&'static str], method: IndexMethod) -> Self {
        Self {
            name: format!("idx_{}_{}", table, suffix),
            table,
            columns: columns.to_vec(),
            method,
        }
    }

    pub fn btree(table: &'static str, suffix: &str, columns: &[&'static str]) -> Self {
        Self::new(table, suffix, columns, IndexMethod::BTree)
    }

    /// `CREATE INDEX IF NOT EXISTS`, so re-running the index stage is harmless.
    pub fn create_sql(&self) -> String {
        let head = format!(
            "CREATE INDEX IF NOT EXISTS {} ON {}",
            quote_ident(&self.name),
            quote_ident(self.table)
        );
        match self.method {
            IndexMethod::BTree => format!("{} ({})", head, quote_list(&self.columns)),
            IndexMethod::Trigram => format!(
                "{} USING GIN ({} gin_trgm_ops)",
                head,
                quote_list(&self.columns)
            ),
            IndexMethod::Prefix => {
                format!("{} ({} text_pattern_ops)", head, quote_list(&self.columns))
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: Vec<Column>,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    pub fn create_sql(&self) -> String {
        let body = self
            .columns
            .iter()
            .map(Column::definition)
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE TABLE {} (\n    {}\n)", quote_ident(self.name), body)
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(self.name))
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns populated from the source file, in insert order.
    pub fn loaded_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.ty != ColumnType::Serial)
    }

    pub fn needs_trigram(&self) -> bool {
        self.indexes.iter().any(|i| i.method == IndexMethod::Trigram)
    }
}

// ============================================================================
// Datasets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub key: &'static str,
    pub file: PathBuf,
    pub table: TableSchema,
}

/// Immutable set of every dataset known to the loader
#[derive(Debug, Clone)]
pub struct Catalog {
    pub proteins: Dataset,
    pub identifiers: TableSchema,
    pub idmapping_file: PathBuf,
    /// Bulk-copy datasets in load order (smallest first for faster feedback)
    pub webservice: Vec<Dataset>,
}

impl Catalog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            proteins: Dataset {
                key: UNIPROT_KEY,
                file: data_dir.join(UNIPROT_FILE),
                table: proteins_table(),
            },
            identifiers: identifiers_table(),
            idmapping_file: data_dir.join(IDMAPPING_FILE),
            webservice: webservice_datasets(data_dir),
        }
    }

    /// Point a dataset at a different source file. Used while building the
    /// run configuration, before the catalog is shared.
    pub fn with_source(mut self, key: &str, file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        match key {
            UNIPROT_KEY => self.proteins.file = file,
            IDMAPPING_KEY => self.idmapping_file = file,
            _ => {
                let dataset = self
                    .webservice
                    .iter_mut()
                    .find(|d| d.key == key)
                    .ok_or_else(|| IngestError::UnknownDataset(key.to_string()))?;
                dataset.file = file;
            },
        }
        Ok(self)
    }

    pub fn webservice(&self, key: &str) -> Result<&Dataset> {
        self.webservice
            .iter()
            .find(|d| d.key == key)
            .ok_or_else(|| IngestError::UnknownDataset(key.to_string()))
    }

    pub fn webservice_keys(&self) -> Vec<&'static str> {
        self.webservice.iter().map(|d| d.key).collect()
    }

    /// Tables whose indexes belong to a dataset key; `uniprot` covers both
    /// the primary and the derived table.
    pub fn tables_for(&self, key: &str) -> Result<Vec<&TableSchema>> {
        if key == UNIPROT_KEY {
            return Ok(vec![&self.proteins.table, &self.identifiers]);
        }
        Ok(vec![&self.webservice(key)?.table])
    }

    pub fn all_tables(&self) -> Vec<&TableSchema> {
        let mut tables = vec![&self.proteins.table, &self.identifiers];
        tables.extend(self.webservice.iter().map(|d| &d.table));
        tables
    }
}

fn proteins_table() -> TableSchema {
    use ColumnType::*;

    let columns = vec![
        id_column(),
        Column::new("entry", VarChar(30))
            .constraint(Constraint::UniqueNotNull)
            .header("Entry"),
        Column::text("entry_name").header("Entry Name"),
        Column::text("protein_names").header("Protein names"),
        Column::new("length", Integer).header("Length"),
        Column::new("mass", Integer).header("Mass"),
        Column::text("sequence").header("Sequence"),
        Column::text("gene_names_primary").header("Gene Names (primary)"),
        Column::text("gene_names_synonym").header("Gene Names (synonym)"),
        Column::text("organism_id").header("Organism (ID)"),
        Column::text("involvement_in_disease").header("Involvement in disease"),
        Column::text("mutagenesis").header("Mutagenesis"),
        Column::text("subcellular_location").header("Subcellular location [CC]"),
        Column::text("post_translational_modification").header("Post-translational modification"),
        Column::text("pubmed_id").header("PubMed ID"),
        Column::text("function_cc").header("Function [CC]"),
        Column::text("ensembl").header("Ensembl"),
        Column::text("kegg").header("KEGG"),
        Column::text("pathway").header("Pathway"),
        Column::text("activity_regulation").header("Activity regulation"),
        Column::text("keywords").header("Keywords"),
        Column::text("ec_number").header("EC number"),
        Column::text("gene_ontology").header("Gene Ontology (GO)"),
        Column::text("transmembrane").header("Transmembrane"),
        Column::text("protein_families").header("Protein families"),
        Column::text("refseq").header("RefSeq"),
        Column::new("alphafolddb", VarChar(30)).header("AlphaFoldDB"),
        Column::text("pdb").header("PDB"),
        Column::text("chembl").header("ChEMBL"),
        Column::text("phosphositeplus").header("PhosphoSitePlus"),
        Column::text("signor").header("SIGNOR"),
        Column::text("pathwaycommons").header("PathwayCommons"),
        Column::text("intact").header("IntAct"),
        Column::text("biogrid").header("BioGRID"),
        Column::text("complexportal").header("ComplexPortal"),
    ];

    TableSchema {
        name: PROTEINS_TABLE,
        columns,
        indexes: vec![IndexDef::btree(PROTEINS_TABLE, "entry", &["entry"])],
    }
}

fn identifiers_table() -> TableSchema {
    use ColumnType::*;

    let t = IDENTIFIERS_TABLE;
    TableSchema {
        name: t,
        columns: vec![
            id_column(),
            Column::new("protein_id", Integer).constraint(Constraint::CascadeReference {
                table: PROTEINS_TABLE,
                column: "id",
            }),
            Column::new("uniprot_accession", VarChar(30)).constraint(Constraint::NotNull),
            Column::new("identifier_value", Text).constraint(Constraint::NotNull),
            Column::new("identifier_type", VarChar(50)).constraint(Constraint::NotNull),
            Column::text("taxon_id"),
        ],
        indexes: vec![
            IndexDef::btree(t, "protein_id", &["protein_id"]),
            IndexDef::new(t, "value_trgm", &["identifier_value"], IndexMethod::Trigram),
            IndexDef::new(t, "value_prefix", &["identifier_value"], IndexMethod::Prefix),
            IndexDef::btree(t, "type", &["identifier_type"]),
            IndexDef::btree(t, "accession", &["uniprot_accession"]),
        ],
    }
}

fn bulk(data_dir: &Path, key: &'static str, file: &str, columns: Vec<Column>, indexes: Vec<IndexDef>) -> Dataset {
    let mut all = vec![id_column()];
    all.extend(columns);
    Dataset {
        key,
        file: data_dir.join(file),
        table: TableSchema {
            name: key,
            columns: all,
            indexes,
        },
    }
}

fn webservice_datasets(data_dir: &Path) -> Vec<Dataset> {
    use ColumnType::*;

    let text = Column::text;
    let boolean = |name| Column::new(name, Boolean);
    let int = |name| Column::new(name, Integer);
    let varchar = |name, n| Column::new(name, VarChar(n));

    vec![
        bulk(
            data_dir,
            "complexes",
            "omnipath_webservice_complexes.tsv",
            vec![
                text("name"),
                text("components"),
                text("components_genesymbols"),
                text("stoichiometry"),
                text("sources"),
                text("references"),
                text("identifiers"),
            ],
            vec![
                IndexDef::btree("complexes", "name", &["name"]),
                IndexDef::btree("complexes", "sources", &["sources"]),
            ],
        ),
        bulk(
            data_dir,
            "enz_sub",
            "omnipath_webservice_enz_sub.tsv",
            vec![
                text("enzyme"),
                text("enzyme_genesymbol"),
                text("substrate"),
                text("substrate_genesymbol"),
                text("isoforms"),
                varchar("residue_type", 10),
                int("residue_offset"),
                text("modification"),
                text("sources"),
                text("references"),
                int("curation_effort"),
                int("ncbi_tax_id"),
            ],
            vec![
                IndexDef::btree("enz_sub", "enzyme", &["enzyme"]),
                IndexDef::btree("enz_sub", "substrate", &["substrate"]),
                IndexDef::btree("enz_sub", "enzyme_genesymbol", &["enzyme_genesymbol"]),
                IndexDef::btree("enz_sub", "substrate_genesymbol", &["substrate_genesymbol"]),
            ],
        ),
        bulk(
            data_dir,
            "intercell",
            "omnipath_webservice_intercell.tsv",
            vec![
                text("category"),
                text("parent"),
                text("database"),
                text("scope"),
                text("aspect"),
                text("source"),
                text("uniprot"),
                text("genesymbol"),
                varchar("entity_type", 50),
                int("consensus_score"),
                boolean("transmitter"),
                boolean("receiver"),
                boolean("secreted"),
                boolean("plasma_membrane_transmembrane"),
                boolean("plasma_membrane_peripheral"),
            ],
            vec![
                IndexDef::btree("intercell", "uniprot", &["uniprot"]),
                IndexDef::btree("intercell", "genesymbol", &["genesymbol"]),
                IndexDef::btree("intercell", "category", &["category"]),
                IndexDef::btree("intercell", "database", &["database"]),
            ],
        ),
        bulk(
            data_dir,
            "interactions",
            "omnipath_webservice_interactions.tsv",
            vec![
                text("source"),
                text("target"),
                text("source_genesymbol"),
                text("target_genesymbol"),
                boolean("is_directed"),
                boolean("is_stimulation"),
                boolean("is_inhibition"),
                boolean("consensus_direction"),
                boolean("consensus_stimulation"),
                boolean("consensus_inhibition"),
                text("sources"),
                text("references"),
                boolean("omnipath"),
                boolean("kinaseextra"),
                boolean("ligrecextra"),
                boolean("pathwayextra"),
                boolean("mirnatarget"),
                boolean("dorothea"),
                boolean("collectri"),
                boolean("tf_target"),
                boolean("lncrna_mrna"),
                boolean("tf_mirna"),
                boolean("small_molecule"),
                boolean("dorothea_curated"),
                boolean("dorothea_chipseq"),
                boolean("dorothea_tfbs"),
                boolean("dorothea_coexp"),
                varchar("dorothea_level", 10),
                text("type"),
                int("curation_effort"),
                Column::new("extra_attrs", Jsonb),
                Column::new("evidences", Jsonb),
                int("ncbi_tax_id_source"),
                varchar("entity_type_source", 50),
                int("ncbi_tax_id_target"),
                varchar("entity_type_target", 50),
            ],
            vec![
                IndexDef::btree("interactions", "source", &["source"]),
                IndexDef::btree("interactions", "target", &["target"]),
                IndexDef::btree("interactions", "source_genesymbol", &["source_genesymbol"]),
                IndexDef::btree("interactions", "target_genesymbol", &["target_genesymbol"]),
                IndexDef::btree("interactions", "pair", &["source", "target"]),
                IndexDef::btree("interactions", "sources", &["sources"]),
                IndexDef::btree("interactions", "type", &["type"]),
            ],
        ),
        bulk(
            data_dir,
            "annotations",
            "omnipath_webservice_annotations.tsv",
            vec![
                text("uniprot"),
                text("genesymbol"),
                varchar("entity_type", 50),
                text("source"),
                text("label"),
                text("value"),
                Column::new("record_id", BigInt),
            ],
            vec![
                IndexDef::btree("annotations", "uniprot", &["uniprot"]),
                IndexDef::btree("annotations", "genesymbol", &["genesymbol"]),
                IndexDef::btree("annotations", "source", &["source"]),
                IndexDef::btree("annotations", "label", &["label"]),
            ],
        ),
    ]
}
