//! OmniPath DB Ingest - loader entry point

use anyhow::Context;
use clap::Parser;
use opdb_common::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use opdb_ingest::catalog::{IDMAPPING_KEY, UNIPROT_KEY};
use opdb_ingest::cli::{Cli, Command};
use opdb_ingest::{db, Catalog, IngestConfig, Pipeline, RunReport};
use std::process;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .log_file_prefix("opdb-ingest")
        .build();

    // Environment variables take precedence over the flag defaults
    let log_config = match log_config.merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {:#}", e);
            process::exit(2);
        },
    };

    // Held for the whole run so buffered file output is flushed on exit
    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialise logging: {:#}", e);
            process::exit(2);
        },
    };

    let interactive = !cli.no_progress && log_config.format != LogFormat::Json;

    if let Err(e) = run(&cli, interactive).await {
        error!(error = %format!("{:#}", e), "Run failed");
        process::exit(1);
    }
}

async fn run(cli: &Cli, interactive: bool) -> anyhow::Result<()> {
    let started = Instant::now();
    let command = cli.operation();

    let mut config = IngestConfig::from_env()?.show_progress(interactive);
    if let Some(dir) = &cli.data_dir {
        config = config.data_dir(dir);
    }
    if let Some(size) = cli.batch_size {
        config = config.batch_size(size);
    }
    config.validate()?;

    let mut catalog = Catalog::new(&config.data_dir);
    match &command {
        Command::Full { input: Some(path), .. } => {
            catalog = catalog.with_source(UNIPROT_KEY, path)?;
        },
        Command::Idmapping { input: Some(path) } => {
            catalog = catalog.with_source(IDMAPPING_KEY, path)?;
        },
        _ => {},
    }

    let pool = db::connect(&config.database)
        .await
        .context("database connection failed")?;

    let pipeline = Pipeline::new(pool.clone(), &config, &catalog);
    let result = match command {
        Command::Full { skip_indexes, .. } => pipeline.full(skip_indexes).await.map(RunReport::Full),
        Command::Identifiers => pipeline.identifiers().await.map(RunReport::Identifiers),
        Command::Indexes { dataset } => pipeline
            .indexes(dataset.as_deref())
            .await
            .map(RunReport::Indexes),
        Command::LoadTable { name, skip_indexes } => pipeline
            .load_table(&name, skip_indexes)
            .await
            .map(RunReport::LoadTable),
        Command::LoadAll { skip_indexes } => pipeline.load_all(skip_indexes).await.map(RunReport::LoadAll),
        Command::Idmapping { .. } => pipeline.idmapping().await.map(RunReport::IdMapping),
    };

    db::close(pool).await;
    let report = result?;

    log_summary(&report);
    if cli.json_summary {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Run complete");
    Ok(())
}

fn log_summary(report: &RunReport) {
    match report {
        RunReport::Full(full) => {
            info!(
                proteins = full.load.rows_accepted,
                skipped = full.load.skipped(),
                identifiers = full.extraction.total,
                indexes = full.indexes.as_ref().map(|i| i.indexes.len()).unwrap_or(0),
                "Full load finished"
            );
            for pass in &full.extraction.passes {
                info!(pass = pass.pass, count = pass.count, "Derived identifiers");
            }
        },
        RunReport::Identifiers(extraction) => {
            for pass in &extraction.passes {
                info!(pass = pass.pass, count = pass.count, "Derived identifiers");
            }
            info!(total = extraction.total, "Identifiers rebuilt");
        },
        RunReport::Indexes(indexes) => {
            info!(
                indexes = indexes.indexes.len(),
                tables = indexes.tables.len(),
                "Indexes ensured"
            );
        },
        RunReport::LoadTable(table) => {
            info!(table = %table.copy.table, rows = table.copy.rows_in_table, "Table loaded");
        },
        RunReport::LoadAll(tables) => {
            for table in tables {
                info!(table = %table.copy.table, rows = table.copy.rows_in_table, "Table loaded");
            }
        },
        RunReport::IdMapping(stats) => {
            info!(
                rows_processed = stats.rows_processed,
                rows_written = stats.rows_written,
                filtered = stats.skipped_filtered,
                malformed = stats.skipped_malformed,
                unmatched = stats.unmatched,
                "Id mapping loaded"
            );
        },
    }
}
