//! Observability for the search subsystem
//!
//! - Structured logging (JSON lines)
//! - Counters
//! - Typed lifecycle events
//!
//! Observability is read-only: it never changes the outcome of an operation.

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Logs a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Logs a lifecycle event with fields; failure events go out at WARN
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ServiceStart);
        log_event_with_fields(Event::ConfigLoaded, &[("index_dir", "/tmp/index")]);
    }
}
