//! Command line interface
//!
//! - query: run one query and print the page as JSON
//! - index: add entries to the index and compact the journal
//! - reindex: rebuild the index from the entries file
//! - schema: print the configured schema

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{index, parse_variable, query, reindex, run, run_command, schema};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
