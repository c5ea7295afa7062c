//! Cache store adapter contract.
//!
//! The read-through cache depends only on [`CacheStore`], never on a specific
//! storage technology.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use curator_core::CuratorResult;

use super::entry::CacheEntry;

/// Predicate over the denormalized columns of a [`CacheEntry`].
///
/// Every criterion that is `Some` must match (AND semantics). A filter with no
/// criteria matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub source_address: Option<String>,
    pub subject_address: Option<String>,
    pub operation_name: Option<String>,
    /// Only rows with `expires_at <= expired_as_of`.
    pub expired_as_of: Option<DateTime<Utc>>,
}

impl EntryFilter {
    /// Matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches rows already expired at `now`.
    pub fn expired_at(now: DateTime<Utc>) -> Self {
        Self {
            expired_as_of: Some(now),
            ..Self::default()
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.source_address.is_none()
            && self.subject_address.is_none()
            && self.operation_name.is_none()
            && self.expired_as_of.is_none()
    }

    pub fn matches(&self, entry: &CacheEntry) -> bool {
        fn column_matches(want: &Option<String>, have: &Option<String>) -> bool {
            match want {
                Some(want) => have.as_deref() == Some(want.as_str()),
                None => true,
            }
        }

        column_matches(&self.source_address, &entry.source_address)
            && column_matches(&self.subject_address, &entry.subject_address)
            && column_matches(&self.operation_name, &entry.operation_name)
            && self
                .expired_as_of
                .map_or(true, |now| entry.is_expired_at(now))
    }
}

/// Persistence-agnostic key/value store with TTL and metadata columns.
///
/// Each method must be atomic on its own: one upsert, or one batch delete.
/// Implementations must be safe to call concurrently.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the row for `key`, expired or not.
    async fn get(&self, key: &str) -> CuratorResult<Option<CacheEntry>>;

    /// Insert or replace the row for `entry.key`.
    async fn upsert(&self, entry: CacheEntry) -> CuratorResult<()>;

    /// Delete every row matching `filter`; returns the number removed.
    async fn delete_where(&self, filter: &EntryFilter) -> CuratorResult<u64>;

    /// Delete every row with `expires_at <= now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> CuratorResult<u64> {
        self.delete_where(&EntryFilter::expired_at(now)).await
    }

    /// Count rows matching `filter`.
    async fn count(&self, filter: &EntryFilter) -> CuratorResult<u64>;

    /// Delete every row.
    async fn clear(&self) -> CuratorResult<u64> {
        self.delete_where(&EntryFilter::all()).await
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Rows currently stored, expired or not.
    pub total_entries: u64,
    /// Rows already past `expires_at`.
    pub expired_entries: u64,
    /// Reads served from the store.
    pub hits: u64,
    /// Reads that fell through.
    pub misses: u64,
}

impl CacheStats {
    /// Rows a reader could still be served.
    pub fn live_entries(&self) -> u64 {
        self.total_entries.saturating_sub(self.expired_entries)
    }

    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
