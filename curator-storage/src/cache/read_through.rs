//! Read-through cache for remote reads.
//!
//! The cache is strictly an optimization: a store that is down or slow turns
//! reads into misses and writes into no-ops, and the failure goes to the
//! injected [`CacheObserver`]. Callers always keep a path to the remote source.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use curator_core::{CacheConfig, CacheError, CuratorError, CuratorResult, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::entry::CacheEntry;
use super::freshness::{CacheRead, MissReason, ReadOptions, WriteOptions};
use super::key::{CacheKey, InvalidationPattern};
use super::observer::{CacheObserver, CacheOp, TracingObserver};
use super::traits::{CacheStats, CacheStore, EntryFilter};

/// The authoritative source a cache miss falls back to.
///
/// The cache never calls it on its own; [`ReadThroughCache::fetch_through`]
/// calls it on the caller's behalf.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(
        &self,
        source_address: &str,
        operation_name: &str,
        params: &Value,
    ) -> CuratorResult<Value>;
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Read-through cache over a [`CacheStore`].
///
/// # Example
///
/// ```ignore
/// let cache = ReadThroughCache::new(store, CacheConfig::from_env())?;
/// let key = CacheKey::new("nft", contract, "ownerOf", &json!({ "tokenId": 7 }))?;
///
/// let owner = cache
///     .get_or_fetch(&key, &ReadOptions::block_sensitive(), &WriteOptions::new(), || {
///         chain.owner_of(contract, 7)
///     })
///     .await?;
/// ```
pub struct ReadThroughCache<S>
where
    S: CacheStore + ?Sized,
{
    store: Arc<S>,
    config: CacheConfig,
    observer: Arc<dyn CacheObserver>,
    counters: Arc<Counters>,
}

impl<S> ReadThroughCache<S>
where
    S: CacheStore + ?Sized,
{
    /// Create a cache that reports through `tracing`.
    pub fn new(store: Arc<S>, config: CacheConfig) -> CuratorResult<Self> {
        Self::with_observer(store, config, Arc::new(TracingObserver))
    }

    /// Create a cache with default configuration.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::assemble(store, CacheConfig::default(), Arc::new(TracingObserver))
    }

    /// Create a cache with an explicit observability sink.
    ///
    /// Fails with a config error if `config` does not validate.
    pub fn with_observer(
        store: Arc<S>,
        config: CacheConfig,
        observer: Arc<dyn CacheObserver>,
    ) -> CuratorResult<Self> {
        config.validate()?;
        Ok(Self::assemble(store, config, observer))
    }

    fn assemble(store: Arc<S>, config: CacheConfig, observer: Arc<dyn CacheObserver>) -> Self {
        Self {
            store,
            config,
            observer,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build a key using this cache's hash threshold.
    pub fn key<P: Serialize + ?Sized>(
        &self,
        scope: &str,
        source_address: &str,
        operation_name: &str,
        params: &P,
        subject_address: Option<&str>,
    ) -> CuratorResult<CacheKey> {
        CacheKey::builder(scope, source_address, operation_name)
            .params(params)?
            .maybe_subject(subject_address)
            .hash_threshold(self.config.key_params_hash_threshold)
            .build()
    }

    /// Run one store call under the configured timeout.
    async fn bounded<T, F>(&self, op: CacheOp, call: F) -> CuratorResult<T>
    where
        F: Future<Output = CuratorResult<T>>,
    {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StorageError::Timeout {
                operation: op.to_string(),
                elapsed: self.config.store_timeout,
            }
            .into()),
        }
    }

    fn miss<T>(&self, key: &CacheKey, reason: MissReason) -> Option<T> {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        self.observer.on_miss(key.as_str(), reason);
        None
    }

    /// Look up `key`. Returns `None` on any kind of miss, including a store
    /// that is unavailable or too slow.
    pub async fn get<T>(&self, key: &CacheKey, options: &ReadOptions) -> Option<CacheRead<T>>
    where
        T: DeserializeOwned,
    {
        if options.force_refresh {
            return self.miss(key, MissReason::ForcedRefresh);
        }

        let entry = match self.bounded(CacheOp::Get, self.store.get(key.as_str())).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return self.miss(key, MissReason::Absent),
            Err(err) => {
                self.observer
                    .on_store_error(CacheOp::Get, Some(key.as_str()), &err);
                return self.miss(key, MissReason::StoreUnavailable);
            }
        };

        if let Err(reason) =
            options.check(&entry, self.config.block_freshness_window, Utc::now())
        {
            return self.miss(key, reason);
        }

        match serde_json::from_value::<T>(entry.payload) {
            Ok(value) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                self.observer.on_hit(key.as_str());
                Some(CacheRead::from_cache(
                    value,
                    entry.created_at,
                    entry.chain_height,
                ))
            }
            Err(e) => {
                let err = CuratorError::Storage(StorageError::Codec {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
                self.observer
                    .on_store_error(CacheOp::Get, Some(key.as_str()), &err);
                self.miss(key, MissReason::Undecodable)
            }
        }
    }

    /// Write `payload` under `key`. Returns whether the write landed; a failed
    /// write is reported to the observer and otherwise ignored.
    pub async fn set<T>(&self, key: &CacheKey, payload: &T, options: &WriteOptions) -> bool
    where
        T: Serialize + ?Sized,
    {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                let err = CuratorError::Cache(CacheError::PayloadSerialization {
                    key: key.to_string(),
                    reason: e.to_string(),
                });
                self.observer
                    .on_store_error(CacheOp::Set, Some(key.as_str()), &err);
                return false;
            }
        };

        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let entry =
            CacheEntry::new(key, payload, Utc::now(), ttl).with_chain_height(options.chain_height);

        match self.bounded(CacheOp::Set, self.store.upsert(entry)).await {
            Ok(()) => {
                self.observer.on_write(key.as_str());
                true
            }
            Err(err) => {
                self.observer
                    .on_store_error(CacheOp::Set, Some(key.as_str()), &err);
                false
            }
        }
    }

    /// Serve `key` from the cache, or await `fetch` and write its result back.
    ///
    /// Errors from `fetch` are returned unchanged and nothing is cached.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &CacheKey,
        read: &ReadOptions,
        write: &WriteOptions,
        fetch: F,
    ) -> Result<CacheRead<T>, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key, read).await {
            return Ok(hit);
        }
        let value = fetch().await?;
        self.set(key, &value, write).await;
        Ok(CacheRead::from_source(value, write.chain_height))
    }

    /// [`get_or_fetch`](Self::get_or_fetch) against a [`RemoteSource`], using
    /// the key's own source address, operation, and parameters.
    pub async fn fetch_through<R>(
        &self,
        source: &R,
        key: &CacheKey,
        read: &ReadOptions,
        write: &WriteOptions,
    ) -> CuratorResult<CacheRead<Value>>
    where
        R: RemoteSource + ?Sized,
    {
        self.get_or_fetch(key, read, write, || {
            source.fetch(key.source_address(), key.operation_name(), key.params())
        })
        .await
    }

    /// Delete every entry matching `pattern`. An empty pattern deletes
    /// nothing; use [`clear`](Self::clear) to flush.
    pub async fn invalidate(&self, pattern: &InvalidationPattern) -> u64 {
        if pattern.is_empty() {
            tracing::warn!("ignoring cache invalidation with an empty pattern");
            return 0;
        }

        let filter = pattern.to_filter();
        match self
            .bounded(CacheOp::Invalidate, self.store.delete_where(&filter))
            .await
        {
            Ok(removed) => {
                self.observer.on_invalidate(pattern, removed);
                removed
            }
            Err(err) => {
                self.observer.on_store_error(CacheOp::Invalidate, None, &err);
                0
            }
        }
    }

    /// Evict everything that could be stale after a state-changing call
    /// described by `key`.
    pub async fn invalidate_key(&self, key: &CacheKey) -> u64 {
        self.invalidate(&InvalidationPattern::for_key(key)).await
    }

    /// Physically delete expired entries.
    pub async fn sweep_expired(&self) -> u64 {
        match self
            .bounded(CacheOp::Sweep, self.store.delete_expired(Utc::now()))
            .await
        {
            Ok(removed) => {
                self.observer.on_sweep(removed);
                removed
            }
            Err(err) => {
                self.observer.on_store_error(CacheOp::Sweep, None, &err);
                0
            }
        }
    }

    /// Delete every entry.
    pub async fn clear(&self) -> u64 {
        match self.bounded(CacheOp::Clear, self.store.clear()).await {
            Ok(removed) => removed,
            Err(err) => {
                self.observer.on_store_error(CacheOp::Clear, None, &err);
                0
            }
        }
    }

    /// Entry counts from the store plus this cache's hit/miss counters.
    ///
    /// Store failures leave the counts at zero.
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            ..CacheStats::default()
        };

        let counts = async {
            let total = self.store.count(&EntryFilter::all()).await?;
            let expired = self
                .store
                .count(&EntryFilter::expired_at(Utc::now()))
                .await?;
            Ok::<_, CuratorError>((total, expired))
        };
        match self.bounded(CacheOp::Stats, counts).await {
            Ok((total, expired)) => {
                stats.total_entries = total;
                stats.expired_entries = expired;
            }
            Err(err) => self.observer.on_store_error(CacheOp::Stats, None, &err),
        }
        stats
    }
}

impl<S> std::fmt::Debug for ReadThroughCache<S>
where
    S: CacheStore + ?Sized,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThroughCache")
            .field("config", &self.config)
            .field("hits", &self.counters.hits.load(Ordering::Relaxed))
            .field("misses", &self.counters.misses.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<S> Clone for ReadThroughCache<S>
where
    S: CacheStore + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            observer: Arc::clone(&self.observer),
            counters: Arc::clone(&self.counters),
        }
    }
}
