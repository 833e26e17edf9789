//! Scope-based operation logging
//!
//! - `{name}_BEGIN` on creation (TRACE)
//! - `{name}_COMPLETE` with elapsed time on `complete()`
//! - `{name}_FAILED` on `fail()`
//! - `{name}_ERROR` when dropped unfinished

use std::time::Instant;

use super::logger::{Logger, Severity};

pub struct ObservationScope {
    name: String,
    fields: Vec<(String, String)>,
    started: Instant,
    finished: bool,
}

impl ObservationScope {
    pub fn new(name: &str) -> Self {
        Self::with_fields(name, &[])
    }

    pub fn with_fields(name: &str, fields: &[(&str, &str)]) -> Self {
        Logger::log(Severity::Trace, &format!("{}_BEGIN", name), fields);
        Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn elapsed_micros(&self) -> u128 {
        self.started.elapsed().as_micros()
    }

    fn emit(&self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        let elapsed = self.elapsed_micros().to_string();
        let mut all: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        all.extend(extra.iter().copied());
        all.push(("elapsed_us", elapsed.as_str()));
        Logger::log(severity, &format!("{}_{}", self.name, suffix), &all);
    }

    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    pub fn complete_with_fields(mut self, extra: &[(&str, &str)]) {
        self.finished = true;
        self.emit(Severity::Info, "COMPLETE", extra);
    }

    pub fn fail(mut self, reason: &str) {
        self.finished = true;
        self.emit(Severity::Error, "FAILED", &[("reason", reason)]);
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.finished {
            self.emit(Severity::Error, "ERROR", &[("reason", "scope dropped without completion")]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_complete() {
        let scope = ObservationScope::with_fields("TEST", &[("key", "value")]);
        assert!(!scope.is_finished());
        scope.complete_with_fields(&[("rows", "1")]);
    }

    #[test]
    fn test_scope_fail() {
        ObservationScope::new("TEST").fail("boom");
    }

    #[test]
    fn test_scope_drop_without_completion() {
        let _scope = ObservationScope::new("TEST");
    }
}
