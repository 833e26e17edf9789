//! Search service
//!
//! Top-level façade of the query subsystem. Holds the configuration, wires
//! the interceptor chain at start-up, validates queries against the schema
//! and drives commands through the chain.

mod boundary;
mod config;
mod errors;
mod service;
mod validator;

pub use boundary::execute_with_timeout;
pub use config::{load_entries, IndexConfiguration, SearchConfigFile, SearchServiceConfiguration};
pub use errors::{SearchError, SearchResult};
pub use service::{SearchService, ServiceStatus};
pub use validator::QueryValidator;
