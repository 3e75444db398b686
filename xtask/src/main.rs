//! Build automation tasks for the OmniPath DB loader
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for the OmniPath DB loader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the loader CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<opdb_ingest::cli::Cli>();

    let content = format!(
        r#"# opdb-ingest CLI Reference

Generated from the CLI source code on {}.

## Overview

`opdb-ingest` loads the UniProt protein export and the OmniPath webservice
exports into PostgreSQL, derives the searchable identifier table and builds
the lookup indexes. Running it without a subcommand performs a full UniProt
load.

## Quick Start

```bash
# Full UniProt load from ./data
opdb-ingest

# Load every webservice table, indexes later
opdb-ingest load-all --skip-indexes
opdb-ingest indexes

# Rebuild derived identifiers, then append the id-mapping file
opdb-ingest identifiers
opdb-ingest idmapping --input data/HUMAN_9606_idmapping.dat
```

## Commands

{}

## Environment Variables

- `DATABASE_URL` - PostgreSQL connection URL
- `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` - used when `DATABASE_URL` is unset
- `OPDB_DATA_DIR` - directory holding the source files (default: `./data`)
- `OPDB_PROTEIN_BATCH_SIZE` - proteins per batch (default: 1000)
- `OPDB_IDMAPPING_BATCH_SIZE` - id-mapping rows per batch (default: 10000)
- `OPDB_CONNECT_TIMEOUT` - connection timeout in seconds (default: 30)
- `LOG_LEVEL`, `LOG_FORMAT`, `LOG_OUTPUT`, `LOG_DIR` - logging setup
- `RUST_LOG` - extra filter directives

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
