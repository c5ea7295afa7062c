//! Error types for Curator operations

use std::time::Duration;
use thiserror::Error;

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Store operation {operation} timed out after {elapsed:?}")]
    Timeout {
        operation: String,
        elapsed: Duration,
    },

    #[error("Store backend failure: {reason}")]
    Backend { reason: String },

    #[error("Failed to encode or decode cache row {key}: {reason}")]
    Codec { key: String, reason: String },
}

/// Cache front-end errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Invalid cache key: {reason}")]
    InvalidKey { reason: String },

    #[error("Failed to serialize payload for {key}: {reason}")]
    PayloadSerialization { key: String, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Curator errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CuratorError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl CuratorError {
    /// True when the error means the backing store could not be reached or
    /// did not answer in time.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            CuratorError::Storage(StorageError::Timeout { .. })
                | CuratorError::Storage(StorageError::Backend { .. })
                | CuratorError::Storage(StorageError::LockPoisoned)
        )
    }
}

/// Result type alias for Curator operations.
pub type CuratorResult<T> = Result<T, CuratorError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_timeout() {
        let err = StorageError::Timeout {
            operation: "get".to_string(),
            elapsed: Duration::from_millis(250),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("get"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_cache_error_display_invalid_key() {
        let err = CacheError::InvalidKey {
            reason: "scope must not be empty".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Invalid cache key: scope must not be empty"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "store_timeout".to_string(),
            value: "0ns".to_string(),
            reason: "must be positive".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("store_timeout"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_curator_error_from_variants() {
        let err: CuratorError = StorageError::LockPoisoned.into();
        assert!(matches!(err, CuratorError::Storage(_)));
        assert!(err.is_store_unavailable());

        let err: CuratorError = CacheError::InvalidKey {
            reason: "x".to_string(),
        }
        .into();
        assert!(matches!(err, CuratorError::Cache(_)));
        assert!(!err.is_store_unavailable());

        let err: CuratorError = ConfigError::InvalidValue {
            field: "store_timeout".to_string(),
            value: "0ns".to_string(),
            reason: "must be positive".to_string(),
        }
        .into();
        assert!(format!("{}", err).starts_with("Config error:"));
    }

    #[test]
    fn test_codec_error_is_not_unavailability() {
        let err: CuratorError = StorageError::Codec {
            key: "k".to_string(),
            reason: "bad json".to_string(),
        }
        .into();
        assert!(!err.is_store_unavailable());
    }
}
