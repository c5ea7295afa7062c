//! Curator Core - Shared Types
//!
//! Errors, standardized content records, and configuration shared by the
//! cache and audit crates. No I/O lives here.

use chrono::{DateTime, Utc};

pub mod config;
pub mod error;
pub mod record;

pub use config::{AuditConfig, CacheConfig, DEFAULT_MAX_CREATION_TIME, DEFAULT_MIN_CREATION_TIME};
pub use error::{CacheError, ConfigError, CuratorError, CuratorResult, StorageError, ValidationError};
pub use record::{ContentType, ImageStatus, StandardizedRecord};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
