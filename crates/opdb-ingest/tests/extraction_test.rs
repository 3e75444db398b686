//! Derived identifiers produced from the sample UniProt export
//!
//! Requires Docker:
//!
//! ```bash
//! cargo test -p opdb-ingest --test extraction_test -- --ignored --nocapture
//! ```

mod common;

use common::{fixture_catalog, fixtures_dir, init_test_tracing, TestPostgres};
use opdb_ingest::catalog::{Catalog, IDENTIFIERS_TABLE};
use opdb_ingest::config::IngestConfig;
use opdb_ingest::extract::{ExtractionPass, NameRules, ProteinFields};
use opdb_ingest::Pipeline;
use std::collections::HashMap;

struct Loaded {
    pg: TestPostgres,
    catalog: Catalog,
    config: IngestConfig,
}

/// Container with the sample proteins loaded and identifiers derived.
async fn loaded() -> Loaded {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let catalog = fixture_catalog();
    let config = pg.config(&fixtures_dir());

    Pipeline::new(pg.db(), &config, &catalog)
        .full(true)
        .await
        .expect("full load failed");

    Loaded { pg, catalog, config }
}

async fn values(pg: &TestPostgres, accession: &str, identifier_type: &str) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT identifier_value FROM uniprot_identifiers \
         WHERE uniprot_accession = $1 AND identifier_type = $2 ORDER BY identifier_value",
    )
    .bind(accession)
    .bind(identifier_type)
    .fetch_all(&pg.db())
    .await
    .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_hemoglobin_names() {
    let Loaded { pg, .. } = loaded().await;

    assert_eq!(values(&pg, "P69905", "uniprot_accession").await, vec!["P69905"]);
    assert_eq!(values(&pg, "P69905", "gene_primary").await, vec!["HBA1"]);
    assert_eq!(values(&pg, "P69905", "gene_synonym").await, vec!["HBA2"]);
    assert_eq!(
        values(&pg, "P69905", "protein_primary").await,
        vec!["Hemoglobin subunit alpha"]
    );
    assert_eq!(
        values(&pg, "P69905", "protein_alternative").await,
        vec!["Alpha-globin", "Hemoglobin alpha chain"]
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_synonym_whitespace_runs() {
    let Loaded { pg, .. } = loaded().await;

    assert_eq!(
        values(&pg, "Q00001", "gene_synonym").await,
        vec!["ABC1", "ABC2", "ABC3"]
    );
    // No parentheses: the whole field is the primary name and there are no alternatives
    assert_eq!(
        values(&pg, "Q00002", "protein_primary").await,
        vec!["Plain protein name"]
    );
    assert!(values(&pg, "Q00002", "protein_alternative").await.is_empty());
    assert!(values(&pg, "Q00002", "gene_primary").await.is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_database_matches_record_rules() {
    let Loaded { pg, .. } = loaded().await;
    let rules = NameRules::new().unwrap();

    let proteins: Vec<(String, String, String, String)> = sqlx::query_as(
        "SELECT entry, COALESCE(gene_names_primary, ''), COALESCE(gene_names_synonym, ''), \
         COALESCE(protein_names, '') FROM uniprot_proteins",
    )
    .fetch_all(&pg.db())
    .await
    .unwrap();

    let mut expected: Vec<(String, String, String)> = proteins
        .into_iter()
        .flat_map(|(entry, gene_names_primary, gene_names_synonym, protein_names)| {
            let fields = ProteinFields {
                entry,
                gene_names_primary,
                gene_names_synonym,
                protein_names,
            };
            rules
                .derive(&fields)
                .into_iter()
                .map(move |(ty, value)| (fields.entry.clone(), ty.as_str().to_string(), value))
                .collect::<Vec<_>>()
        })
        .collect();
    expected.sort();

    let mut actual: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT uniprot_accession, identifier_type, identifier_value FROM uniprot_identifiers",
    )
    .fetch_all(&pg.db())
    .await
    .unwrap();
    actual.sort();

    assert_eq!(actual, expected);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_rebuild_reproduces_counts() {
    let Loaded { pg, catalog, config } = loaded().await;
    let pipeline = Pipeline::new(pg.db(), &config, &catalog);

    let first = pipeline.identifiers().await.unwrap();
    let second = pipeline.identifiers().await.unwrap();

    let per_pass: HashMap<&str, u64> = first.passes.iter().map(|p| (p.pass, p.count)).collect();
    assert_eq!(per_pass["uniprot_accession"], 4);
    assert_eq!(per_pass["gene_primary"], 3);
    assert_eq!(per_pass["gene_synonym"], 4);
    assert_eq!(per_pass["protein_primary"], 4);
    assert_eq!(per_pass["protein_alternative"], 5);
    assert_eq!(first.total, 20);
    assert_eq!(first.total, first.passes.iter().map(|p| p.count).sum::<u64>());

    assert_eq!(second.passes, first.passes);
    assert_eq!(pg.count(IDENTIFIERS_TABLE).await, second.total as i64);
    assert_eq!(
        second.count(ExtractionPass::ProteinAlternative),
        Some(5)
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_taxon_and_owner_carried() {
    let Loaded { pg, .. } = loaded().await;

    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM uniprot_identifiers i \
         LEFT JOIN uniprot_proteins p ON p.id = i.protein_id \
         WHERE p.id IS NULL OR p.entry <> i.uniprot_accession OR i.taxon_id IS DISTINCT FROM p.organism_id",
    )
    .fetch_one(&pg.db())
    .await
    .unwrap();
    assert_eq!(orphans, 0);

    let taxa: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT taxon_id FROM uniprot_identifiers WHERE uniprot_accession = 'Q00002'",
    )
    .fetch_all(&pg.db())
    .await
    .unwrap();
    assert_eq!(taxa, vec!["10090"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_protein_delete_cascades() {
    let Loaded { pg, .. } = loaded().await;
    let before = pg.count(IDENTIFIERS_TABLE).await;

    sqlx::query("DELETE FROM uniprot_proteins WHERE entry = 'P69905'")
        .execute(&pg.db())
        .await
        .unwrap();

    let remaining: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM uniprot_identifiers WHERE uniprot_accession = 'P69905'",
    )
    .fetch_one(&pg.db())
    .await
    .unwrap();

    assert_eq!(remaining, 0);
    assert_eq!(pg.count(IDENTIFIERS_TABLE).await, before - 6);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_uniprot_indexes_created() {
    let Loaded { pg, catalog, config } = loaded().await;

    // Loaded with indexes skipped
    assert!(!pg
        .index_names(IDENTIFIERS_TABLE)
        .await
        .contains(&"idx_uniprot_identifiers_value_trgm".to_string()));

    let pipeline = Pipeline::new(pg.db(), &config, &catalog);
    let report = pipeline.indexes(Some("uniprot")).await.unwrap();
    assert_eq!(report.tables, vec!["uniprot_proteins", "uniprot_identifiers"]);

    let names = pg.index_names(IDENTIFIERS_TABLE).await;
    for expected in [
        "idx_uniprot_identifiers_protein_id",
        "idx_uniprot_identifiers_value_trgm",
        "idx_uniprot_identifiers_value_prefix",
        "idx_uniprot_identifiers_type",
        "idx_uniprot_identifiers_accession",
    ] {
        assert!(names.contains(&expected.to_string()), "missing {}", expected);
    }

    // Second run finds everything in place
    let again = pipeline.indexes(Some("uniprot")).await.unwrap();
    assert_eq!(again.indexes, report.indexes);
    assert_eq!(pg.index_names(IDENTIFIERS_TABLE).await, names);
}
