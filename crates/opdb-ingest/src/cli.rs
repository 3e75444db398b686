//! Command-line surface of the `opdb-ingest` binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// OmniPath database loader
#[derive(Parser, Debug)]
#[command(name = "opdb-ingest")]
#[command(author, version, about = "Load UniProt and OmniPath webservice exports into PostgreSQL")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory holding the source files
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Rows per batch for row-batch loads (overrides both batch settings)
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable the interactive spinner
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Print the operation summary as JSON on stdout
    #[arg(long, global = true)]
    pub json_summary: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Recreate the UniProt tables, load proteins, derive identifiers and build indexes (default)
    Full {
        /// UniProt TSV export to load instead of the default file
        #[arg(long)]
        input: Option<PathBuf>,

        /// Leave index creation for a later `indexes` run
        #[arg(long)]
        skip_indexes: bool,
    },

    /// Recreate the identifier table empty and derive it again from the loaded proteins
    Identifiers,

    /// Create indexes (idempotent)
    Indexes {
        /// Only this dataset (`uniprot` or a webservice table)
        #[arg(long)]
        dataset: Option<String>,
    },

    /// Recreate and bulk-copy a single webservice table
    LoadTable {
        /// Dataset name, e.g. `interactions`
        name: String,

        #[arg(long)]
        skip_indexes: bool,
    },

    /// Recreate and bulk-copy every webservice table
    LoadAll {
        #[arg(long)]
        skip_indexes: bool,
    },

    /// Append HGNC / Gene_Name / GeneCards / GeneWiki identifiers from an id-mapping file
    Idmapping {
        /// Id-mapping file to load instead of the default file
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

impl Cli {
    /// Subcommand to run; no subcommand means a full load.
    pub fn operation(&self) -> Command {
        self.command.clone().unwrap_or(Command::Full {
            input: None,
            skip_indexes: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_full() {
        let cli = Cli::try_parse_from(["opdb-ingest"]).unwrap();
        assert_eq!(
            cli.operation(),
            Command::Full {
                input: None,
                skip_indexes: false
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "opdb-ingest",
            "load-table",
            "interactions",
            "--skip-indexes",
            "--batch-size",
            "500",
            "--no-progress",
        ])
        .unwrap();

        assert_eq!(
            cli.operation(),
            Command::LoadTable {
                name: "interactions".into(),
                skip_indexes: true
            }
        );
        assert_eq!(cli.batch_size, Some(500));
        assert!(cli.no_progress);
    }

    #[test]
    fn test_indexes_dataset() {
        let cli = Cli::try_parse_from(["opdb-ingest", "indexes", "--dataset", "uniprot"]).unwrap();
        assert_eq!(
            cli.operation(),
            Command::Indexes {
                dataset: Some("uniprot".into())
            }
        );
    }
}
