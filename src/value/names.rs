//! Name conversion between logical (query) names and storage names

/// Maps a logical selector or column name to the name used by the
/// schema registry and the index storage.
pub trait NameConverter: Send + Sync {
    /// Convert a logical name
    fn convert(&self, name: &str) -> String;
}

/// Identity conversion
#[derive(Debug, Clone, Copy, Default)]
pub struct ToStringNameConverter;

impl NameConverter for ToStringNameConverter {
    fn convert(&self, name: &str) -> String {
        name.to_string()
    }
}

/// Case-insensitive naming: every name is lower-cased
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCaseNameConverter;

impl NameConverter for LowerCaseNameConverter {
    fn convert(&self, name: &str) -> String {
        name.to_lowercase()
    }
}
