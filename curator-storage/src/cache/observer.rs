//! Observability port for the cache.
//!
//! Store failures never reach cache callers; they are reported here instead.
//! [`TracingObserver`] is the default sink.

use std::fmt;

use curator_core::CuratorError;

use super::freshness::MissReason;
use super::key::InvalidationPattern;

/// Cache operation that touched the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOp {
    Get,
    Set,
    Invalidate,
    Sweep,
    Stats,
    Clear,
}

impl CacheOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOp::Get => "get",
            CacheOp::Set => "set",
            CacheOp::Invalidate => "invalidate",
            CacheOp::Sweep => "sweep",
            CacheOp::Stats => "stats",
            CacheOp::Clear => "clear",
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for cache events.
pub trait CacheObserver: Send + Sync {
    fn on_hit(&self, _key: &str) {}

    fn on_miss(&self, _key: &str, _reason: MissReason) {}

    fn on_write(&self, _key: &str) {}

    fn on_invalidate(&self, _pattern: &InvalidationPattern, _removed: u64) {}

    fn on_sweep(&self, _removed: u64) {}

    /// A store call failed or timed out. The cache has already degraded.
    fn on_store_error(&self, op: CacheOp, key: Option<&str>, error: &CuratorError);
}

/// Emits cache events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_hit(&self, key: &str) {
        tracing::debug!(cache.key = %key, "cache hit");
    }

    fn on_miss(&self, key: &str, reason: MissReason) {
        tracing::debug!(cache.key = %key, reason = %reason, "cache miss");
    }

    fn on_write(&self, key: &str) {
        tracing::debug!(cache.key = %key, "cache write");
    }

    fn on_invalidate(&self, pattern: &InvalidationPattern, removed: u64) {
        tracing::info!(pattern = %pattern, removed, "cache entries invalidated");
    }

    fn on_sweep(&self, removed: u64) {
        if removed > 0 {
            tracing::info!(removed, "expired cache entries swept");
        }
    }

    fn on_store_error(&self, op: CacheOp, key: Option<&str>, error: &CuratorError) {
        let key = key.unwrap_or("-");
        if error.is_store_unavailable() {
            tracing::warn!(op = %op, cache.key = key, error = %error, "cache store unavailable; degrading");
        } else {
            tracing::error!(op = %op, cache.key = key, error = %error, "cache store operation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_core::StorageError;

    #[test]
    fn test_cache_op_names() {
        assert_eq!(CacheOp::Get.to_string(), "get");
        assert_eq!(CacheOp::Invalidate.as_str(), "invalidate");
    }

    #[test]
    fn test_tracing_observer_emits_without_subscriber() {
        let observer = TracingObserver;
        observer.on_hit("k");
        observer.on_miss("k", MissReason::Expired);
        observer.on_sweep(0);
        observer.on_store_error(
            CacheOp::Set,
            Some("k"),
            &StorageError::LockPoisoned.into(),
        );
    }

    #[test]
    fn test_tracing_observer_with_subscriber() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            let observer = TracingObserver;
            observer.on_write("nft:0xabc:ownerOf:null");
            observer.on_invalidate(&InvalidationPattern::new().source("0xabc"), 3);
        });
    }
}
