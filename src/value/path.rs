//! Path segmentation for folder predicates

/// Splits a hierarchical path into its segments
pub trait PathSplitter: Send + Sync {
    fn split(&self, path: &str) -> Vec<String>;
}

/// `/a/b/c` → `["a", "b", "c"]`; empty segments are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashSplitter;

impl PathSplitter for SlashSplitter {
    fn split(&self, path: &str) -> Vec<String> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_splitter() {
        assert_eq!(SlashSplitter.split("/a/b//c/"), vec!["a", "b", "c"]);
        assert!(SlashSplitter.split("/").is_empty());
    }
}
