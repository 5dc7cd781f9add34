//! Canonical `scheme://bucket/key` object-store URIs.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// Parsed object-store URI.
///
/// Consumed opaquely by everything except the path resolver, which strips
/// the scheme to mirror the object under a local root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreUri {
    scheme: String,
    bucket: String,
    key: String,
    original: String,
}

impl StoreUri {
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| StoreError::invalid_uri(uri, "missing scheme delimiter"))?;
        if scheme.is_empty() {
            return Err(StoreError::invalid_uri(uri, "missing scheme"));
        }

        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| StoreError::invalid_uri(uri, "missing key"))?;
        if bucket.is_empty() {
            return Err(StoreError::invalid_uri(uri, "missing bucket"));
        }
        if key.is_empty() {
            return Err(StoreError::invalid_uri(uri, "missing key"));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            original: uri.to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    /// The URI with its scheme stripped, for joining under a local root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.bucket).join(&self.key)
    }
}

impl fmt::Display for StoreUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

impl FromStr for StoreUri {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
