//! Ordered list of directories the application wants watched.

use std::path::{Path, PathBuf};

/// Registry of watched paths.
///
/// Insertion order is kept and duplicates are allowed: registering the same
/// path twice yields two workers for it.
#[derive(Debug, Default, Clone)]
pub struct WatchRegistry {
    paths: Vec<PathBuf>,
}

impl WatchRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path.
    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Remove every entry equal to `path`, returning how many were removed.
    pub fn unregister(&mut self, path: &Path) -> usize {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        before - self.paths.len()
    }

    /// Registered paths in insertion order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keeps_order_and_duplicates() {
        let mut registry = WatchRegistry::new();
        registry.register("b");
        registry.register("a");
        registry.register("b");

        assert_eq!(
            registry.paths(),
            &[PathBuf::from("b"), PathBuf::from("a"), PathBuf::from("b")]
        );
    }

    #[test]
    fn test_unregister_removes_all_copies() {
        let mut registry = WatchRegistry::new();
        registry.register("b");
        registry.register("a");
        registry.register("b");

        assert_eq!(registry.unregister(Path::new("b")), 2);
        assert_eq!(registry.paths(), &[PathBuf::from("a")]);
        assert_eq!(registry.unregister(Path::new("missing")), 0);
    }
}
