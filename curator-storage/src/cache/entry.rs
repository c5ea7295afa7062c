//! Cache rows.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::key::CacheKey;

/// One cached remote read.
///
/// The denormalized address and operation columns are copied from the
/// [`CacheKey`] at write time so pattern queries never parse `key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub source_address: Option<String>,
    pub operation_name: Option<String>,
    pub subject_address: Option<String>,
    /// Block number the payload was computed at.
    pub chain_height: Option<u64>,
}

impl CacheEntry {
    /// Build a row for `key` written at `now` that lives for `ttl`.
    pub fn new(key: &CacheKey, payload: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: key.as_str().to_string(),
            payload,
            expires_at: expiry_after(now, ttl),
            created_at: now,
            source_address: Some(key.source_address().to_string()),
            operation_name: Some(key.operation_name().to_string()),
            subject_address: key.subject_address().map(str::to_string),
            chain_height: None,
        }
    }

    pub fn with_chain_height(mut self, height: Option<u64>) -> Self {
        self.chain_height = height;
        self
    }

    /// Expired rows are invisible to readers.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Time since the row was written; zero if `created_at` is in the future.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// `now + ttl`, saturating at the maximum representable instant.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
