//! Schema loader for reading a schema definition from disk
//!
//! File format (JSON):
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "cmis:document",
//!       "parent": "cmis:base",
//!       "default_ordering": [{"column": "cmis:creationDate", "order": "descending"}],
//!       "columns": [
//!         {"name": "cmis:name", "type": "string", "orderable": true, "operators": ["=", "<>", "LIKE"]}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::registry::InMemorySchema;
use super::types::Table;
use crate::value::NameConverter;

/// On-disk schema document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub tables: Vec<Table>,
}

/// Loads schema definitions into an `InMemorySchema`
pub struct SchemaLoader {
    name_converter: Arc<dyn NameConverter>,
}

impl SchemaLoader {
    pub fn new(name_converter: Arc<dyn NameConverter>) -> Self {
        Self { name_converter }
    }

    /// Loads and builds a schema from a JSON file.
    ///
    /// Missing or malformed files are reported as `SchemaError::Malformed`.
    pub fn load_file(&self, path: &Path) -> SchemaResult<InMemorySchema> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        self.load_str(&content).map_err(|e| match e {
            SchemaError::Malformed { reason, .. } => {
                SchemaError::malformed(path.display().to_string(), reason)
            }
            other => other,
        })
    }

    /// Builds a schema from JSON text
    pub fn load_str(&self, content: &str) -> SchemaResult<InMemorySchema> {
        let definition: SchemaDefinition = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed("<in-memory>", format!("Invalid JSON: {}", e)))?;
        self.build(definition)
    }

    /// Builds a schema from an already parsed definition
    pub fn build(&self, definition: SchemaDefinition) -> SchemaResult<InMemorySchema> {
        definition
            .tables
            .into_iter()
            .fold(
                InMemorySchema::builder_with_converter(self.name_converter.clone()),
                |builder, table| builder.add_table_definition(table),
            )
            .build()
    }
}
