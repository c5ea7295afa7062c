//! Read-through cache for remote and chain reads.
//!
//! Entries are addressed by a deterministic [`CacheKey`] built from the
//! operation's coordinates (scope, source address, operation name, canonical
//! parameters, and an optional subject address). Reads return
//! [`CacheRead<T>`], which carries when the value was cached and whether it was
//! a hit.
//!
//! # Degradation
//!
//! The cache never fails its caller. Store errors and timeouts become misses
//! on read and no-ops on write, and are reported to the [`CacheObserver`].
//!
//! # Example
//!
//! ```ignore
//! let cache = ReadThroughCache::new(Arc::new(InMemoryCacheStore::new()), CacheConfig::default())?;
//! let key = CacheKey::builder("nft", contract, "balanceOf")
//!     .params(&json!({}))?
//!     .subject(wallet)
//!     .build()?;
//!
//! let read = cache.get::<u64>(&key, &ReadOptions::block_sensitive()).await;
//!
//! // After a transfer, drop everything that could be stale for this wallet.
//! cache
//!     .invalidate(&InvalidationPattern::new().source(contract).subject(wallet))
//!     .await;
//! ```

pub mod entry;
pub mod freshness;
pub mod key;
pub mod lmdb_backend;
pub mod memory;
pub mod observer;
pub mod read_through;
pub mod traits;

pub use entry::CacheEntry;
pub use freshness::{CacheRead, MissReason, ReadOptions, WriteOptions};
pub use key::{CacheKey, CacheKeyBuilder, InvalidationPattern, MAX_KEY_LEN};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::InMemoryCacheStore;
pub use observer::{CacheObserver, CacheOp, TracingObserver};
pub use read_through::{ReadThroughCache, RemoteSource};
pub use traits::{CacheStats, CacheStore, EntryFilter};
