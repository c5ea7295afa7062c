//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped key-value store for cached remote reads.
//!
//! # Row Format
//!
//! - Key: the rendered cache key bytes
//! - Value: the JSON-encoded [`CacheEntry`], including its denormalized
//!   address and operation columns
//!
//! # Atomicity
//!
//! Every trait call runs inside a single LMDB transaction: `get` and `count`
//! use a read transaction, `upsert` and the delete family use one write
//! transaction each. Pattern deletes scan and delete inside the same write
//! transaction, so a concurrent upsert lands either before or after the whole
//! delete, never in the middle.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_core::{CuratorError, CuratorResult, StorageError};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions, RoTxn};

use super::entry::CacheEntry;
use super::traits::{CacheStore, EntryFilter};

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Serialization error.
    #[error("Serialization error for {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// Deserialization error.
    #[error("Deserialization error for {key}: {reason}")]
    Deserialization { key: String, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CuratorError {
    fn from(e: LmdbCacheError) -> Self {
        match e {
            LmdbCacheError::Serialization { key, reason }
            | LmdbCacheError::Deserialization { key, reason } => {
                CuratorError::Storage(StorageError::Codec { key, reason })
            }
            other => CuratorError::Storage(StorageError::Backend {
                reason: other.to_string(),
            }),
        }
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

fn decode(key: &[u8], bytes: &[u8]) -> Result<CacheEntry, LmdbCacheError> {
    serde_json::from_slice(bytes).map_err(|e| LmdbCacheError::Deserialization {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}

/// LMDB-backed cache store.
///
/// # Example
///
/// ```ignore
/// use curator_storage::cache::{LmdbCacheStore, ReadThroughCache};
/// use std::sync::Arc;
///
/// let store = Arc::new(LmdbCacheStore::new("/var/lib/curator/cache", 256)?);
/// let cache = ReadThroughCache::with_defaults(store);
/// ```
pub struct LmdbCacheStore {
    /// The LMDB environment.
    env: Env,
    /// The main database (single unnamed database).
    db: Database<Bytes, Bytes>,
}

impl LmdbCacheStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the LMDB
    /// environment or database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process and
        // the memory map is never mutated outside heed transactions.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self { env, db })
    }

    /// Keys of rows matching `filter`, read through `txn`.
    ///
    /// Rows that fail to decode only match an unconstrained filter.
    fn matching_keys(
        &self,
        txn: &RoTxn,
        filter: &EntryFilter,
    ) -> Result<Vec<Vec<u8>>, LmdbCacheError> {
        let unconstrained = filter.is_unconstrained();
        let mut keys = Vec::new();
        for result in self.db.iter(txn).map_err(txn_err)? {
            let (key, bytes) = result.map_err(txn_err)?;
            let matched = unconstrained
                || decode(key, bytes)
                    .map(|entry| filter.matches(&entry))
                    .unwrap_or(false);
            if matched {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &str) -> CuratorResult<Option<CacheEntry>> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        match self.db.get(&rtxn, key.as_bytes()).map_err(txn_err)? {
            Some(bytes) => Ok(Some(decode(key.as_bytes(), bytes)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, entry: CacheEntry) -> CuratorResult<()> {
        let bytes = serde_json::to_vec(&entry).map_err(|e| LmdbCacheError::Serialization {
            key: entry.key.clone(),
            reason: e.to_string(),
        })?;

        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db
            .put(&mut wtxn, entry.key.as_bytes(), bytes.as_slice())
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(())
    }

    async fn delete_where(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let keys = self.matching_keys(&wtxn, filter)?;

        let mut deleted = 0u64;
        for key in &keys {
            if self.db.delete(&mut wtxn, key.as_slice()).map_err(txn_err)? {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> CuratorResult<u64> {
        self.delete_where(&EntryFilter::expired_at(now)).await
    }

    async fn count(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        if filter.is_unconstrained() {
            return Ok(self.db.len(&rtxn).map_err(txn_err)?);
        }
        Ok(self.matching_keys(&rtxn, filter)?.len() as u64)
    }

    async fn clear(&self) -> CuratorResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let removed = self.db.len(&wtxn).map_err(txn_err)?;
        self.db.clear(&mut wtxn).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CacheKey;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbCacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbCacheStore::new(temp_dir.path(), 10).expect("store creation should succeed");
        (store, temp_dir)
    }

    fn make_entry(source: &str, subject: Option<&str>, op: &str, ttl: Duration) -> CacheEntry {
        let key = CacheKey::builder("nft", source, op)
            .params(&json!({"token": 1}))
            .expect("params should serialize")
            .maybe_subject(subject)
            .build()
            .expect("key should build");
        CacheEntry::new(&key, json!({"owner": source}), Utc::now(), ttl)
    }

    #[tokio::test]
    async fn test_new_store() {
        let (store, _temp_dir) = create_test_store();
        assert_eq!(store.count(&EntryFilter::all()).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let (store, _temp_dir) = create_test_store();
        let entry = make_entry("0xaaa", None, "ownerOf", Duration::from_secs(60))
            .with_chain_height(Some(19_500_000));

        store.upsert(entry.clone()).await.expect("upsert should succeed");

        let fetched = store
            .get(&entry.key)
            .await
            .expect("get should succeed")
            .expect("row should exist");
        assert_eq!(fetched, entry);
    }

    #[tokio::test]
    async fn test_get_nonexistent() {
        let (store, _temp_dir) = create_test_store();
        let fetched = store.get("nft:0xaaa:ownerOf:null").await.expect("get should succeed");
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let (store, _temp_dir) = create_test_store();
        let first = make_entry("0xaaa", None, "ownerOf", Duration::from_secs(60));
        let mut second = first.clone();
        second.payload = json!({"owner": "0xnew"});

        store.upsert(first).await.expect("upsert should succeed");
        store.upsert(second.clone()).await.expect("upsert should succeed");

        assert_eq!(store.count(&EntryFilter::all()).await.expect("count"), 1);
        let fetched = store.get(&second.key).await.expect("get").expect("row");
        assert_eq!(fetched.payload, json!({"owner": "0xnew"}));
    }

    #[tokio::test]
    async fn test_longest_buildable_key_is_storable() {
        let (store, _temp_dir) = create_test_store();
        let op = "o".repeat(crate::cache::key::MAX_KEY_LEN - "nft:0xaaa::{\"token\":1}".len());
        let entry = make_entry("0xaaa", None, &op, Duration::from_secs(60));
        assert_eq!(entry.key.len(), crate::cache::key::MAX_KEY_LEN);

        store.upsert(entry.clone()).await.expect("upsert at the key limit");
        assert!(store.get(&entry.key).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_delete_where_matches_all_criteria() {
        let (store, _temp_dir) = create_test_store();
        store
            .upsert(make_entry("0xaaa", Some("0xuser"), "ownerOf", Duration::from_secs(60)))
            .await
            .expect("upsert");
        store
            .upsert(make_entry("0xaaa", None, "ownerOf", Duration::from_secs(60)))
            .await
            .expect("upsert");
        store
            .upsert(make_entry("0xbbb", Some("0xuser"), "ownerOf", Duration::from_secs(60)))
            .await
            .expect("upsert");

        let filter = EntryFilter {
            source_address: Some("0xaaa".into()),
            subject_address: Some("0xuser".into()),
            ..Default::default()
        };
        assert_eq!(store.delete_where(&filter).await.expect("delete"), 1);
        assert_eq!(store.count(&EntryFilter::all()).await.expect("count"), 2);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (store, _temp_dir) = create_test_store();
        store
            .upsert(make_entry("0xaaa", None, "ownerOf", Duration::ZERO))
            .await
            .expect("upsert");
        store
            .upsert(make_entry("0xbbb", None, "ownerOf", Duration::from_secs(600)))
            .await
            .expect("upsert");

        let now = Utc::now();
        assert_eq!(store.count(&EntryFilter::expired_at(now)).await.expect("count"), 1);
        assert_eq!(store.delete_expired(now).await.expect("sweep"), 1);
        assert_eq!(store.count(&EntryFilter::all()).await.expect("count"), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _temp_dir) = create_test_store();
        for source in ["0x1", "0x2", "0x3"] {
            store
                .upsert(make_entry(source, None, "ownerOf", Duration::from_secs(60)))
                .await
                .expect("upsert");
        }
        assert_eq!(store.clear().await.expect("clear"), 3);
        assert_eq!(store.count(&EntryFilter::all()).await.expect("count"), 0);
    }

    #[test]
    fn test_error_conversion() {
        let err: CuratorError = LmdbCacheError::Transaction("MDB_MAP_FULL".into()).into();
        assert!(err.is_store_unavailable());

        let err: CuratorError = LmdbCacheError::Deserialization {
            key: "k".into(),
            reason: "eof".into(),
        }
        .into();
        assert!(matches!(err, CuratorError::Storage(StorageError::Codec { .. })));
    }
}
