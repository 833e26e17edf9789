//! CLI command tests against config files in a temporary directory

use std::fs;
use std::path::{Path, PathBuf};

use cmis_search::cli::{run_command, Command};
use cmis_search::search::{SearchConfigFile, SearchService};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const SCHEMA: &str = r#"{
  "tables": [
    {"name": "folder", "columns": []},
    {
      "name": "doc",
      "default_ordering": [{"column": "title", "order": "ascending"}],
      "columns": [
        {"name": "title", "type": "string", "operators": ["=", "LIKE"]},
        {"name": "size", "type": "integer", "operators": ["=", "<", ">"]}
      ]
    }
  ]
}"#;

const ENTRIES: &str = r#"{"identifier": "root", "table_name": "folder"}
{"identifier": "d1", "table_name": "doc", "parent_identifiers": ["root"], "properties": {"title": [{"type": "string", "value": "alpha"}], "size": [{"type": "long", "value": 10}]}}

{"identifier": "d2", "table_name": "doc", "parent_identifiers": ["root"], "properties": {"title": [{"type": "string", "value": "beta"}], "size": [{"type": "long", "value": 20}]}}
"#;

fn write_config(dir: &TempDir, with_entries: bool) -> PathBuf {
    fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
    fs::write(dir.path().join("entries.jsonl"), ENTRIES).unwrap();

    let entries = if with_entries {
        r#", "entries": "entries.jsonl""#
    } else {
        ""
    };
    let config = format!(
        r#"{{"index_dir": "index", "root_id": "root", "schema": "schema.json"{}}}"#,
        entries
    );
    let path = dir.path().join("search.json");
    fs::write(&path, config).unwrap();
    path
}

fn open(config: &Path) -> SearchService {
    let file = SearchConfigFile::load(config).unwrap();
    let service = SearchService::new(file.to_configuration().unwrap());
    service.start().unwrap();
    service
}

// =============================================================================
// Command Tests
// =============================================================================

#[test]
fn test_index_then_query() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, false);

    run_command(Command::Index {
        config: config.clone(),
        entries: dir.path().join("entries.jsonl"),
        remove: vec![],
    })
    .unwrap();

    run_command(Command::Query {
        config: config.clone(),
        statement: "SELECT title FROM doc WHERE size > $min".to_string(),
        limit: Some(1),
        offset: None,
        variables: vec!["min=5".to_string()],
    })
    .unwrap();

    let service = open(&config);
    assert_eq!(service.entry_count().unwrap(), 3);
    let result = service.execute_sql("SELECT title FROM doc WHERE size > 15").unwrap();
    assert_eq!(result.items[0].identifier(), Some("d2"));
}

#[test]
fn test_index_with_removal() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, false);
    let entries = dir.path().join("entries.jsonl");

    run_command(Command::Index {
        config: config.clone(),
        entries: entries.clone(),
        remove: vec![],
    })
    .unwrap();
    fs::write(&entries, "").unwrap();
    run_command(Command::Index {
        config: config.clone(),
        entries,
        remove: vec!["d1".to_string()],
    })
    .unwrap();

    let service = open(&config);
    assert_eq!(service.entry_count().unwrap(), 2);
    assert_eq!(service.get_content_entry("d1").unwrap(), None);
}

#[test]
fn test_reindex_from_entries_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, true);

    run_command(Command::Reindex {
        config: config.clone(),
    })
    .unwrap();

    let service = open(&config);
    assert_eq!(service.entry_count().unwrap(), 3);
}

#[test]
fn test_reindex_requires_entries() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, false);

    let err = run_command(Command::Reindex { config }).unwrap_err();
    assert_eq!(err.code_str(), "CMIS_CLI_CONFIG_ERROR");
}

#[test]
fn test_invalid_query_reports_search_code() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, false);

    let err = run_command(Command::Query {
        config,
        statement: "SELECT * FROM doc WHERE size <> 3".to_string(),
        limit: None,
        offset: None,
        variables: vec![],
    })
    .unwrap_err();
    assert_eq!(err.code_str(), "SEARCH_INVALID_QUERY");
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    let err = run_command(Command::Schema {
        config: dir.path().join("absent.json"),
    })
    .unwrap_err();
    assert_eq!(err.code_str(), "CMIS_CLI_CONFIG_ERROR");
}
