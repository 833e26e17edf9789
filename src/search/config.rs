//! Search service configuration
//!
//! `SearchServiceConfiguration` is assembled programmatically with `with_*`
//! calls. `SearchConfigFile` is the JSON form read by the command line tool:
//!
//! ```json
//! {
//!   "index_dir": "/var/lib/cmis/index",
//!   "root_id": "root",
//!   "root_parent_id": "",
//!   "schema": "schema.json",
//!   "entries": "entries.jsonl",
//!   "name_converter": "identity"
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the config file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::content::{
    ContentEntry, ContentReader, Interceptor, InvocationContext, SchemaTableResolver,
    TableResolver,
};
use crate::content::interceptors::DEFAULT_CACHE_CAPACITY;
use crate::index::{InMemoryIndexStorage, IndexSettings, QueryableIndexStorage};
use crate::schema::{Schema, SchemaLoader};
use crate::search::{SearchError, SearchResult};
use crate::value::{
    LowerCaseNameConverter, NameConverter, PathSplitter, SlashSplitter, ToStringNameConverter,
};

/// Where and how the index lives
#[derive(Clone)]
pub struct IndexConfiguration {
    /// Journal directory; `None` keeps the index in memory
    pub index_dir: Option<PathBuf>,
    /// Identifier of the root folder
    pub root_id: String,
    /// Parent identifier recorded on the root entry
    pub root_parent_id: String,
    /// Replaces the built-in storage when set
    pub storage: Option<Arc<dyn QueryableIndexStorage>>,
}

impl IndexConfiguration {
    pub fn in_memory(root_id: impl Into<String>) -> Self {
        Self {
            index_dir: None,
            root_id: root_id.into(),
            root_parent_id: String::new(),
            storage: None,
        }
    }

    pub fn journaled(index_dir: impl Into<PathBuf>, root_id: impl Into<String>) -> Self {
        Self {
            index_dir: Some(index_dir.into()),
            ..Self::in_memory(root_id)
        }
    }

    pub fn with_root_parent_id(mut self, root_parent_id: impl Into<String>) -> Self {
        self.root_parent_id = root_parent_id.into();
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn QueryableIndexStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    fn validate(&self) -> SearchResult<()> {
        if self.root_id.trim().is_empty() {
            return Err(SearchError::configuration("root_id must not be empty"));
        }
        if self.root_id == self.root_parent_id {
            return Err(SearchError::configuration(format!(
                "root_parent_id must differ from root_id '{}'",
                self.root_id
            )));
        }
        Ok(())
    }

    /// Storage described by this configuration (not yet opened)
    pub fn storage(&self, name_converter: Arc<dyn NameConverter>) -> Arc<dyn QueryableIndexStorage> {
        match &self.storage {
            Some(storage) => storage.clone(),
            None => Arc::new(InMemoryIndexStorage::new(IndexSettings {
                index_dir: self.index_dir.clone(),
                root_id: self.root_id.clone(),
                root_parent_id: self.root_parent_id.clone(),
                name_converter,
            })),
        }
    }
}

/// Everything the search service needs, supplied once at construction
#[derive(Clone)]
pub struct SearchServiceConfiguration {
    pub index: IndexConfiguration,
    pub schema: Arc<dyn Schema>,
    pub content_reader: Option<Arc<dyn ContentReader>>,
    pub table_resolver: Arc<dyn TableResolver>,
    pub name_converter: Arc<dyn NameConverter>,
    pub path_splitter: Arc<dyn PathSplitter>,
    /// Used for calls that bring no context of their own
    pub default_context: Option<InvocationContext>,
    /// Inserted after the observe interceptor, ahead of the core interceptors
    pub interceptors: Vec<Arc<dyn Interceptor>>,
    /// Content entry cache size; 0 disables the cache
    pub cache_capacity: usize,
}

impl SearchServiceConfiguration {
    pub fn new(schema: Arc<dyn Schema>, index: IndexConfiguration) -> Self {
        Self {
            index,
            schema,
            content_reader: None,
            table_resolver: Arc::new(SchemaTableResolver),
            name_converter: Arc::new(ToStringNameConverter),
            path_splitter: Arc::new(SlashSplitter),
            default_context: None,
            interceptors: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_content_reader(mut self, reader: Arc<dyn ContentReader>) -> Self {
        self.content_reader = Some(reader);
        self
    }

    pub fn with_table_resolver(mut self, resolver: Arc<dyn TableResolver>) -> Self {
        self.table_resolver = resolver;
        self
    }

    pub fn with_name_converter(mut self, converter: Arc<dyn NameConverter>) -> Self {
        self.name_converter = converter;
        self
    }

    pub fn with_path_splitter(mut self, splitter: Arc<dyn PathSplitter>) -> Self {
        self.path_splitter = splitter;
        self
    }

    pub fn with_default_context(mut self, ctx: InvocationContext) -> Self {
        self.default_context = Some(ctx);
        self
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn validate(&self) -> SearchResult<()> {
        self.index.validate()
    }

    /// Context used when the caller supplies none
    pub fn invocation_context(&self) -> InvocationContext {
        match &self.default_context {
            Some(ctx) => ctx.clone(),
            None => InvocationContext::new(self.schema.clone())
                .with_name_converter(self.name_converter.clone())
                .with_table_resolver(self.table_resolver.clone())
                .with_path_splitter(self.path_splitter.clone()),
        }
    }
}

fn default_name_converter() -> String {
    "identity".to_string()
}

/// JSON configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfigFile {
    /// Journal directory; omitted keeps the index in memory
    #[serde(default)]
    pub index_dir: Option<PathBuf>,

    pub root_id: String,

    #[serde(default)]
    pub root_parent_id: String,

    /// Schema JSON file
    pub schema: PathBuf,

    /// JSON-lines file of content entries, used as the content source
    #[serde(default)]
    pub entries: Option<PathBuf>,

    /// "identity" or "lowercase"
    #[serde(default = "default_name_converter")]
    pub name_converter: String,

    #[serde(skip)]
    base_dir: PathBuf,
}

impl SearchConfigFile {
    /// Loads and validates a config file
    pub fn load(path: &Path) -> SearchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SearchError::configuration(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let mut config: SearchConfigFile = serde_json::from_str(&content)
            .map_err(|e| SearchError::configuration(format!("Invalid config JSON: {}", e)))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.root_id.trim().is_empty() {
            return Err(SearchError::configuration("root_id must not be empty"));
        }
        self.converter()?;
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn index_path(&self) -> Option<PathBuf> {
        self.index_dir.as_deref().map(|p| self.resolve(p))
    }

    pub fn schema_path(&self) -> PathBuf {
        self.resolve(&self.schema)
    }

    pub fn entries_path(&self) -> Option<PathBuf> {
        self.entries.as_deref().map(|p| self.resolve(p))
    }

    pub fn converter(&self) -> SearchResult<Arc<dyn NameConverter>> {
        match self.name_converter.as_str() {
            "identity" => Ok(Arc::new(ToStringNameConverter)),
            "lowercase" => Ok(Arc::new(LowerCaseNameConverter)),
            other => Err(SearchError::configuration(format!(
                "Invalid name_converter: '{}'. Must be 'identity' or 'lowercase'.",
                other
            ))),
        }
    }

    pub fn load_schema(&self) -> SearchResult<Arc<dyn Schema>> {
        let schema = SchemaLoader::new(self.converter()?).load_file(&self.schema_path())?;
        Ok(Arc::new(schema))
    }

    /// Service configuration described by this file
    pub fn to_configuration(&self) -> SearchResult<SearchServiceConfiguration> {
        let index = IndexConfiguration {
            index_dir: self.index_path(),
            root_id: self.root_id.clone(),
            root_parent_id: self.root_parent_id.clone(),
            storage: None,
        };
        Ok(SearchServiceConfiguration::new(self.load_schema()?, index)
            .with_name_converter(self.converter()?))
    }
}

/// Reads content entries from a JSON-lines file; blank lines are skipped
pub fn load_entries(path: &Path) -> SearchResult<Vec<ContentEntry>> {
    let content = fs::read_to_string(path).map_err(|e| {
        SearchError::configuration(format!("Failed to read entries {}: {}", path.display(), e))
    })?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                SearchError::configuration(format!(
                    "Invalid entry at {}:{}: {}",
                    path.display(),
                    n + 1,
                    e
                ))
            })
        })
        .collect()
}
