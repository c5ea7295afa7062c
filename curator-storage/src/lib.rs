//! Curator Storage - read-through caching for remote reads
//!
//! Provides the cache key scheme, the pluggable [`CacheStore`] backends
//! (in-memory and LMDB), and the [`ReadThroughCache`] front-end.

pub mod cache;

// Re-export cache types for callers
pub use cache::{
    CacheEntry, CacheKey, CacheKeyBuilder, CacheObserver, CacheOp, CacheRead, CacheStats,
    CacheStore, EntryFilter, InMemoryCacheStore, InvalidationPattern, LmdbCacheError,
    LmdbCacheStore, MissReason, ReadOptions, ReadThroughCache, RemoteSource, TracingObserver,
    WriteOptions, MAX_KEY_LEN,
};
