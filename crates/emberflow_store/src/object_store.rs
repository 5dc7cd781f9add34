//! The remote object-store seam.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;

use crate::error::{Result, StoreError};
use crate::uri::StoreUri;

/// Blocking client for a remote object store.
///
/// The workflow engine supplies the real implementation (and owns
/// authentication, retries and transport concerns). [`MemoryStore`] stands
/// in for tests and local experiments.
pub trait ObjectStore: Send + Sync {
    fn exists(&self, uri: &StoreUri) -> Result<bool>;
    fn get(&self, uri: &StoreUri) -> Result<Vec<u8>>;
    fn put(&self, uri: &StoreUri, data: &[u8]) -> Result<()>;
}

/// In-memory object store keyed by the full URI.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.objects
            .lock()
            .map_err(|_| StoreError::remote("memory store lock poisoned", anyhow!("poisoned mutex")))
    }
}

impl ObjectStore for MemoryStore {
    fn exists(&self, uri: &StoreUri) -> Result<bool> {
        Ok(self.lock()?.contains_key(uri.as_str()))
    }

    fn get(&self, uri: &StoreUri) -> Result<Vec<u8>> {
        self.lock()?
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| StoreError::not_found(uri.as_str().to_string()))
    }

    fn put(&self, uri: &StoreUri, data: &[u8]) -> Result<()> {
        self.lock()?.insert(uri.as_str().to_string(), data.to_vec());
        Ok(())
    }
}
