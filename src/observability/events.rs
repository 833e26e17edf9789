//! Observable events of the search subsystem
//!
//! Events are explicit and typed; the logger only ever sees their names.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    ServiceStart,
    ServiceStarted,
    ServiceStop,
    ServiceStopped,

    // Configuration
    ConfigLoaded,
    SchemaLoaded,

    // Index storage
    IndexOpened,
    IndexModified,
    IndexCompacted,
    ReindexComplete,

    // Queries
    QueryExecuted,
    QueryRejected,

    /// A pipeline command returned an error
    CommandFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ServiceStart => "SEARCH_SERVICE_START",
            Event::ServiceStarted => "SEARCH_SERVICE_STARTED",
            Event::ServiceStop => "SEARCH_SERVICE_STOP",
            Event::ServiceStopped => "SEARCH_SERVICE_STOPPED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaLoaded => "SCHEMA_LOADED",
            Event::IndexOpened => "INDEX_OPENED",
            Event::IndexModified => "INDEX_MODIFIED",
            Event::IndexCompacted => "INDEX_COMPACTED",
            Event::ReindexComplete => "REINDEX_COMPLETE",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::CommandFailed => "COMMAND_FAILED",
        }
    }

    /// Returns true for events that report a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::QueryRejected | Event::CommandFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::ServiceStarted.as_str(), "SEARCH_SERVICE_STARTED");
        assert_eq!(Event::QueryRejected.to_string(), "QUERY_REJECTED");
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::CommandFailed.is_failure());
        assert!(!Event::IndexModified.is_failure());
    }
}
