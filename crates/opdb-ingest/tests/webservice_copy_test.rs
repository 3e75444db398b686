//! Bulk copy of the OmniPath webservice exports
//!
//! Requires Docker:
//!
//! ```bash
//! cargo test -p opdb-ingest --test webservice_copy_test -- --ignored --nocapture
//! ```

mod common;

use common::{fixture, fixture_catalog, fixtures_dir, init_test_tracing, TestPostgres};
use opdb_ingest::catalog::Catalog;
use opdb_ingest::{IngestError, Pipeline};
use std::fs;

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_table_copies_every_line() {
    init_test_tracing();
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let catalog = fixture_catalog();
    let config = pg.config(&fixtures_dir());

    let report = Pipeline::new(pg.db(), &config, &catalog)
        .load_table("complexes", false)
        .await
        .expect("load_table failed");

    assert_eq!(report.copy.rows_copied, 3);
    assert_eq!(report.copy.rows_in_table, 3);
    assert_eq!(report.copy.columns, 7);

    // Empty fields arrive as NULL
    let unnamed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM complexes WHERE name IS NULL")
        .fetch_one(&pg.db())
        .await
        .unwrap();
    assert_eq!(unnamed, 1);

    let names = pg.index_names("complexes").await;
    assert!(names.contains(&"idx_complexes_name".to_string()));
    assert!(names.contains(&"idx_complexes_sources".to_string()));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_reload_replaces_table() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let catalog = fixture_catalog();
    let config = pg.config(&fixtures_dir());
    let pipeline = Pipeline::new(pg.db(), &config, &catalog);

    pipeline.load_table("enz_sub", true).await.unwrap();
    let report = pipeline.load_table("enz_sub", true).await.unwrap();

    assert_eq!(report.copy.rows_in_table, 2);
    assert!(report.indexes.is_none());
    assert_eq!(pg.count("enz_sub").await, 2);

    let offset: Option<i32> = sqlx::query_scalar(
        "SELECT residue_offset FROM enz_sub WHERE enzyme_genesymbol = 'CDK1'",
    )
    .fetch_one(&pg.db())
    .await
    .unwrap();
    assert_eq!(offset, Some(315));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_all_in_catalog_order() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let catalog = fixture_catalog();
    let config = pg.config(&fixtures_dir());

    let reports = Pipeline::new(pg.db(), &config, &catalog)
        .load_all(false)
        .await
        .expect("load_all failed");

    let loaded: Vec<(&str, i64)> = reports
        .iter()
        .map(|r| (r.copy.table.as_str(), r.copy.rows_in_table))
        .collect();
    assert_eq!(
        loaded,
        vec![
            ("complexes", 3),
            ("enz_sub", 2),
            ("intercell", 2),
            ("interactions", 3),
            ("annotations", 4),
        ]
    );

    let directed: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE is_directed AND is_stimulation")
            .fetch_one(&pg.db())
            .await
            .unwrap();
    assert_eq!(directed, 2);

    let no_attrs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM interactions WHERE extra_attrs IS NULL")
            .fetch_one(&pg.db())
            .await
            .unwrap();
    assert_eq!(no_attrs, 1);

    assert!(pg
        .index_names("interactions")
        .await
        .contains(&"idx_interactions_pair".to_string()));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_load_all_checks_files_first() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = tempfile::tempdir().unwrap();
    fs::copy(
        fixture("omnipath_webservice_complexes.tsv"),
        dir.path().join("omnipath_webservice_complexes.tsv"),
    )
    .unwrap();

    let catalog = Catalog::new(dir.path());
    let config = pg.config(dir.path());

    let err = Pipeline::new(pg.db(), &config, &catalog)
        .load_all(false)
        .await
        .unwrap_err();

    match err {
        IngestError::MissingFile(path) => {
            assert!(path.ends_with("omnipath_webservice_enz_sub.tsv"));
        },
        other => panic!("expected a missing file error, got {:?}", other),
    }
    assert!(!pg.table_exists("complexes").await);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unknown_header_column_rejected() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("omnipath_webservice_complexes.tsv"),
        "name\tcomponents\tbogus\nA\tB\tC\n",
    )
    .unwrap();

    let catalog = Catalog::new(dir.path());
    let config = pg.config(dir.path());

    let err = Pipeline::new(pg.db(), &config, &catalog)
        .load_table("complexes", true)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Copy { .. }));
    assert_eq!(pg.count("complexes").await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_bad_value_rolls_back_copy() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("omnipath_webservice_enz_sub.tsv"),
        "enzyme\tresidue_offset\nP31749\t9\nP06493\tnot-a-number\n",
    )
    .unwrap();

    let catalog = Catalog::new(dir.path());
    let config = pg.config(dir.path());

    let err = Pipeline::new(pg.db(), &config, &catalog)
        .load_table("enz_sub", true)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Copy { .. }));
    assert_eq!(pg.count("enz_sub").await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unknown_dataset() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
    let catalog = fixture_catalog();
    let config = pg.config(&fixtures_dir());

    let err = Pipeline::new(pg.db(), &config, &catalog)
        .load_table("pathways", false)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::UnknownDataset(name) if name == "pathways"));
}
