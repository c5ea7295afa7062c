//! In-memory cache store.
//!
//! A `HashMap` behind a `RwLock`. Each trait call takes the lock once, so every
//! operation is atomic with respect to the others.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use curator_core::{CuratorResult, StorageError};

use super::entry::CacheEntry;
use super::traits::{CacheStore, EntryFilter};

/// Process-local cache store.
#[derive(Debug, Default)]
pub struct InMemoryCacheStore {
    rows: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, expired or not.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> CuratorResult<Option<CacheEntry>> {
        let rows = self.rows.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(rows.get(key).cloned())
    }

    async fn upsert(&self, entry: CacheEntry) -> CuratorResult<()> {
        let mut rows = self.rows.write().map_err(|_| StorageError::LockPoisoned)?;
        rows.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete_where(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        let mut rows = self.rows.write().map_err(|_| StorageError::LockPoisoned)?;
        let before = rows.len();
        rows.retain(|_, entry| !filter.matches(entry));
        Ok((before - rows.len()) as u64)
    }

    async fn count(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        let rows = self.rows.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(rows.values().filter(|entry| filter.matches(entry)).count() as u64)
    }
}
