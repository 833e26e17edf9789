//! CLI command implementations
//!
//! Each command loads the config file, starts a search service, performs one
//! operation, prints one JSON response and stops the service.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::content::InMemoryContentReader;
use crate::model::Limit;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::query::parse_query;
use crate::search::{load_entries, SearchConfigFile, SearchService};
use crate::value::Value;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    Logger::set_min_severity(if cli.verbose {
        Severity::Info
    } else {
        Severity::Error
    });

    match run_command(cli.command) {
        Ok(()) => Ok(()),
        Err(e) => {
            write_error(e.code_str(), e.message())?;
            Err(e)
        }
    }
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query {
            config,
            statement,
            limit,
            offset,
            variables,
        } => query(&config, &statement, limit, offset, &variables),
        Command::Index {
            config,
            entries,
            remove,
        } => index(&config, &entries, remove),
        Command::Reindex { config } => reindex(&config),
        Command::Schema { config } => schema(&config),
    }
}

fn load_config(path: &Path) -> CliResult<SearchConfigFile> {
    let config = SearchConfigFile::load(path)?;
    let index_dir = config
        .index_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string());
    log_event_with_fields(Event::ConfigLoaded, &[("index_dir", index_dir.as_str())]);
    Ok(config)
}

/// Starts a service for `config`. The entries file, when configured, is the
/// content source; an in-memory index is filled from it on start.
fn start_service(config: &SearchConfigFile) -> CliResult<SearchService> {
    let mut configuration = config.to_configuration()?;
    if let Some(path) = config.entries_path() {
        let entries = load_entries(&path)?;
        configuration = configuration.with_content_reader(Arc::new(
            InMemoryContentReader::with_entries(config.root_id.clone(), entries),
        ));
    }

    let service = SearchService::new(configuration);
    service.start()?;
    if config.index_path().is_none() && config.entries_path().is_some() {
        service.reindex()?;
    }
    Ok(service)
}

/// Parses `name=value`; values are read as integer, decimal, boolean or text
pub fn parse_variable(raw: &str) -> CliResult<(String, Value)> {
    let (name, value) = raw.split_once('=').ok_or_else(|| {
        CliError::invalid_argument(format!("Invalid variable '{}': expected NAME=VALUE", raw))
    })?;
    let name = name.trim().trim_start_matches('$');
    if name.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "Invalid variable '{}': empty name",
            raw
        )));
    }

    let value = if let Ok(n) = value.parse::<i64>() {
        Value::Long(n)
    } else if let Ok(d) = value.parse::<f64>() {
        Value::Double(d)
    } else if value.eq_ignore_ascii_case("true") {
        Value::Boolean(true)
    } else if value.eq_ignore_ascii_case("false") {
        Value::Boolean(false)
    } else {
        Value::String(value.to_string())
    };
    Ok((name.to_string(), value))
}

/// Execute a single query and print the page
pub fn query(
    config_path: &Path,
    statement: &str,
    limit: Option<usize>,
    offset: Option<usize>,
    variables: &[String],
) -> CliResult<()> {
    let variables = variables
        .iter()
        .map(|raw| parse_variable(raw))
        .collect::<CliResult<BTreeMap<_, _>>>()?;

    let mut query = parse_query(statement)?;
    if limit.is_some() || offset.is_some() {
        query = query.with_limit(Limit {
            row_limit: limit.or(query.limit.row_limit),
            offset: offset.unwrap_or(query.limit.offset),
        });
    }

    let config = load_config(config_path)?;
    let service = start_service(&config)?;
    let result = service.execute_with_variables(&query, &variables);
    service.stop()?;

    write_response(serde_json::to_value(result?)?)
}

/// Index entries from a JSON-lines file, then compact the journal
pub fn index(config_path: &Path, entries_path: &Path, remove: Vec<String>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let entries = load_entries(entries_path)?;
    let service = start_service(&config)?;

    let modification = service.modify_index(entries, remove)?;
    service.compact()?;
    let entry_count = service.entry_count()?;
    service.stop()?;

    write_response(json!({
        "added": modification.added,
        "removed": modification.removed,
        "entry_count": entry_count,
    }))
}

/// Rebuild the index from the configured entries file
pub fn reindex(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    if config.entries_path().is_none() {
        return Err(CliError::config_error(
            "reindex requires 'entries' in the config file",
        ));
    }
    let service = start_service(&config)?;
    let indexed = service.reindex()?;
    service.compact()?;
    service.stop()?;

    write_response(json!({ "indexed": indexed }))
}

/// Print the schema tables
pub fn schema(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let schema = config.load_schema()?;
    let tables: Vec<_> = schema.tables().iter().map(|t| t.as_ref().clone()).collect();
    log_event_with_fields(
        Event::SchemaLoaded,
        &[("tables", tables.len().to_string().as_str())],
    );
    write_response(json!({ "tables": tables }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variable() {
        assert_eq!(parse_variable("n=5").unwrap(), ("n".into(), Value::Long(5)));
        assert_eq!(parse_variable("$x=2.5").unwrap(), ("x".into(), Value::Double(2.5)));
        assert_eq!(parse_variable("b=TRUE").unwrap(), ("b".into(), Value::Boolean(true)));
        assert_eq!(
            parse_variable("s=a=b").unwrap(),
            ("s".into(), Value::String("a=b".into()))
        );
        assert!(parse_variable("novalue").is_err());
        assert!(parse_variable("=1").is_err());
    }
}
