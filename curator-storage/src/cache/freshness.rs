//! Freshness rules for cache reads.
//!
//! Beyond the nominal TTL, a read may be block-sensitive: chain state moves
//! within a TTL window, so block-sensitive rows go stale after a short fixed
//! window regardless of when they formally expire.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::entry::CacheEntry;

/// Options for a cache read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Always report a miss without touching the store.
    pub force_refresh: bool,
    /// Apply the block freshness window on top of the TTL.
    pub block_sensitive: bool,
    /// Reject rows computed below this chain height (or with no height).
    pub min_chain_height: Option<u64>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_refresh() -> Self {
        Self {
            force_refresh: true,
            ..Self::default()
        }
    }

    pub fn block_sensitive() -> Self {
        Self {
            block_sensitive: true,
            ..Self::default()
        }
    }

    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_block_sensitive(mut self, sensitive: bool) -> Self {
        self.block_sensitive = sensitive;
        self
    }

    pub fn at_least_height(mut self, height: u64) -> Self {
        self.min_chain_height = Some(height);
        self
    }

    /// Decide whether `entry` may be served at `now`.
    pub fn check(
        &self,
        entry: &CacheEntry,
        block_window: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), MissReason> {
        if entry.is_expired_at(now) {
            return Err(MissReason::Expired);
        }
        if self.block_sensitive && entry.age_at(now) >= block_window {
            return Err(MissReason::BlockWindowElapsed);
        }
        if let Some(min) = self.min_chain_height {
            if entry.chain_height.map_or(true, |h| h < min) {
                return Err(MissReason::BelowChainHeight);
            }
        }
        Ok(())
    }
}

/// Options for a cache write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Entry lifetime; the cache's default TTL when `None`.
    pub ttl: Option<Duration>,
    /// Block number the payload was computed at.
    pub chain_height: Option<u64>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn at_height(mut self, height: u64) -> Self {
        self.chain_height = Some(height);
        self
    }
}

/// Why a read fell through to the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissReason {
    ForcedRefresh,
    Absent,
    Expired,
    BlockWindowElapsed,
    BelowChainHeight,
    /// The stored payload does not decode into the requested type.
    Undecodable,
    StoreUnavailable,
}

impl MissReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissReason::ForcedRefresh => "forced_refresh",
            MissReason::Absent => "absent",
            MissReason::Expired => "expired",
            MissReason::BlockWindowElapsed => "block_window_elapsed",
            MissReason::BelowChainHeight => "below_chain_height",
            MissReason::Undecodable => "undecodable",
            MissReason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
    chain_height: Option<u64>,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// A value served from the cache.
    pub fn from_cache(value: T, cached_at: DateTime<Utc>, chain_height: Option<u64>) -> Self {
        Self {
            value,
            cached_at,
            chain_height,
            was_cache_hit: true,
        }
    }

    /// A value just fetched from the remote source.
    pub fn from_source(value: T, chain_height: Option<u64>) -> Self {
        Self {
            value,
            cached_at: Utc::now(),
            chain_height,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }

    pub fn chain_height(&self) -> Option<u64> {
        self.chain_height
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Time since the value was cached or fetched.
    pub fn staleness(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            chain_height: self.chain_height,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
