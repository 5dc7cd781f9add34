//! Resolver configuration.

use std::path::{Path, PathBuf};

/// Environment variable naming a local directory that stands in for the
/// object store. When set, targets read and write under this root instead
/// of calling the remote client.
pub const LOCAL_S3_PATH: &str = "LOCAL_S3_PATH";

/// Where target operations resolve to. Read once and injected at target
/// construction; nothing consults the process environment afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    local_root: Option<PathBuf>,
}

impl StoreConfig {
    /// Configuration that always addresses the remote store.
    pub fn remote() -> Self {
        Self { local_root: None }
    }

    /// Configuration that mirrors every target under the given local root.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: Some(root.into()),
        }
    }

    /// Build from `LOCAL_S3_PATH`. Unset or empty means remote.
    pub fn from_env() -> Self {
        match std::env::var(LOCAL_S3_PATH) {
            Ok(root) if !root.is_empty() => Self::local(root),
            _ => Self::remote(),
        }
    }

    pub fn local_root(&self) -> Option<&Path> {
        self.local_root.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_remote() {
        assert_eq!(StoreConfig::default(), StoreConfig::remote());
        assert!(StoreConfig::remote().local_root().is_none());
    }

    #[test]
    fn test_local_root() {
        let config = StoreConfig::local("/tmp/mirror");
        assert_eq!(config.local_root(), Some(Path::new("/tmp/mirror")));
    }

    // Set and unset inside one test; no other test reads the variable.
    #[test]
    fn test_from_env() {
        std::env::set_var(LOCAL_S3_PATH, "/tmp/mirror-env");
        assert_eq!(StoreConfig::from_env(), StoreConfig::local("/tmp/mirror-env"));

        std::env::remove_var(LOCAL_S3_PATH);
        assert_eq!(StoreConfig::from_env(), StoreConfig::remote());
    }
}
