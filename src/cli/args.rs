//! CLI argument definitions using clap
//!
//! Commands:
//! - cmis-search query --config <path> "<SELECT ...>"
//! - cmis-search index --config <path> --entries <path>
//! - cmis-search reindex --config <path>
//! - cmis-search schema --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Query engine for a content repository index
#[derive(Parser, Debug)]
#[command(name = "cmis-search")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log lifecycle events (INFO and above) to stdout
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a query and print the rows as JSON
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./search.json")]
        config: PathBuf,

        /// Query text
        statement: String,

        /// Maximum number of rows (overrides LIMIT)
        #[arg(long)]
        limit: Option<usize>,

        /// Rows to skip (overrides OFFSET)
        #[arg(long)]
        offset: Option<usize>,

        /// Bind variable, `name=value`; may be repeated
        #[arg(long = "var", value_name = "NAME=VALUE")]
        variables: Vec<String>,
    },

    /// Add entries from a JSON-lines file to the index and compact it
    Index {
        /// Path to configuration file
        #[arg(long, default_value = "./search.json")]
        config: PathBuf,

        /// JSON-lines file of content entries
        #[arg(long)]
        entries: PathBuf,

        /// Identifiers to remove; may be repeated
        #[arg(long = "remove", value_name = "ID")]
        remove: Vec<String>,
    },

    /// Rebuild the index from the configured entries file
    Reindex {
        /// Path to configuration file
        #[arg(long, default_value = "./search.json")]
        config: PathBuf,
    },

    /// Print the schema tables
    Schema {
        /// Path to configuration file
        #[arg(long, default_value = "./search.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
