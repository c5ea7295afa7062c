//! Configuration types
//!
//! Both configs load from `CURATOR_*` environment variables with defaults.
//! Values that fail to parse fall back to the default; call `validate()` to
//! reject values that parse but make no sense.

use crate::{ConfigError, CuratorError, CuratorResult};
use std::time::Duration;

/// 2020-01-01T00:00:00Z
pub const DEFAULT_MIN_CREATION_TIME: i64 = 1_577_836_800;
/// 2030-01-01T00:00:00Z
pub const DEFAULT_MAX_CREATION_TIME: i64 = 1_893_456_000;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> CuratorError {
    CuratorError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

// ============================================================================
// CACHE CONFIGURATION
// ============================================================================

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied to writes that do not specify one.
    pub default_ttl: Duration,
    /// Maximum age of a block-sensitive entry, independent of its TTL.
    pub block_freshness_window: Duration,
    /// Upper bound on a single store round-trip.
    pub store_timeout: Duration,
    /// Serialized parameters longer than this are hashed into the key.
    pub key_params_hash_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            block_freshness_window: Duration::from_secs(120),
            store_timeout: Duration::from_secs(2),
            key_params_hash_threshold: 128,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables.
    ///
    /// - `CURATOR_CACHE_DEFAULT_TTL_SECS` (default: 300)
    /// - `CURATOR_CACHE_BLOCK_WINDOW_SECS` (default: 120)
    /// - `CURATOR_CACHE_STORE_TIMEOUT_MS` (default: 2000)
    /// - `CURATOR_CACHE_KEY_HASH_THRESHOLD` (default: 128)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_parse("CURATOR_CACHE_DEFAULT_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_ttl),
            block_freshness_window: env_parse("CURATOR_CACHE_BLOCK_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.block_freshness_window),
            store_timeout: env_parse("CURATOR_CACHE_STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            key_params_hash_threshold: env_parse("CURATOR_CACHE_KEY_HASH_THRESHOLD")
                .unwrap_or(defaults.key_params_hash_threshold),
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_block_window(mut self, window: Duration) -> Self {
        self.block_freshness_window = window;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_key_hash_threshold(mut self, threshold: usize) -> Self {
        self.key_params_hash_threshold = threshold;
        self
    }

    /// Validate the cache configuration.
    pub fn validate(&self) -> CuratorResult<()> {
        if self.block_freshness_window.is_zero() {
            return Err(invalid(
                "block_freshness_window",
                format!("{:?}", self.block_freshness_window),
                "must be positive",
            ));
        }
        if self.store_timeout.is_zero() {
            return Err(invalid(
                "store_timeout",
                format!("{:?}", self.store_timeout),
                "must be positive",
            ));
        }
        if self.key_params_hash_threshold == 0 {
            return Err(invalid(
                "key_params_hash_threshold",
                self.key_params_hash_threshold,
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// AUDIT CONFIGURATION
// ============================================================================

/// Configuration for the metadata auditor.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    /// Creation times before this Unix second are treated as a default/epoch bug.
    pub min_creation_time: i64,
    /// Creation times after this Unix second are treated as a unit confusion.
    pub max_creation_time: i64,
    /// Allowed drift between `creation_time_unix` and `created_at_iso`.
    pub timestamp_tolerance: Duration,
    /// Image values that stand in for "no image".
    pub placeholder_images: Vec<String>,
    /// Share of records with timestamp issues that triggers a recommendation.
    pub timestamp_issue_ratio: f64,
    /// Share of records with image issues that triggers a recommendation.
    pub image_issue_ratio: f64,
    /// Share of records with attribution issues that triggers a recommendation.
    pub attribution_issue_ratio: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            min_creation_time: DEFAULT_MIN_CREATION_TIME,
            max_creation_time: DEFAULT_MAX_CREATION_TIME,
            timestamp_tolerance: Duration::from_secs(60),
            placeholder_images: vec![
                "/placeholder.svg".to_string(),
                "/placeholder.png".to_string(),
                "/images/placeholder.png".to_string(),
            ],
            timestamp_issue_ratio: 0.10,
            image_issue_ratio: 0.20,
            attribution_issue_ratio: 0.20,
        }
    }
}

impl AuditConfig {
    /// Create a new audit config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables.
    ///
    /// - `CURATOR_AUDIT_MIN_CREATION_TIME` / `CURATOR_AUDIT_MAX_CREATION_TIME`: Unix seconds
    /// - `CURATOR_AUDIT_TIMESTAMP_TOLERANCE_SECS` (default: 60)
    /// - `CURATOR_AUDIT_PLACEHOLDER_IMAGES`: comma-separated
    /// - `CURATOR_AUDIT_TIMESTAMP_ISSUE_RATIO` (default: 0.10)
    /// - `CURATOR_AUDIT_IMAGE_ISSUE_RATIO` (default: 0.20)
    /// - `CURATOR_AUDIT_ATTRIBUTION_ISSUE_RATIO` (default: 0.20)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let placeholder_images = std::env::var("CURATOR_AUDIT_PLACEHOLDER_IMAGES")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.placeholder_images);

        Self {
            min_creation_time: env_parse("CURATOR_AUDIT_MIN_CREATION_TIME")
                .unwrap_or(defaults.min_creation_time),
            max_creation_time: env_parse("CURATOR_AUDIT_MAX_CREATION_TIME")
                .unwrap_or(defaults.max_creation_time),
            timestamp_tolerance: env_parse("CURATOR_AUDIT_TIMESTAMP_TOLERANCE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timestamp_tolerance),
            placeholder_images,
            timestamp_issue_ratio: env_parse("CURATOR_AUDIT_TIMESTAMP_ISSUE_RATIO")
                .unwrap_or(defaults.timestamp_issue_ratio),
            image_issue_ratio: env_parse("CURATOR_AUDIT_IMAGE_ISSUE_RATIO")
                .unwrap_or(defaults.image_issue_ratio),
            attribution_issue_ratio: env_parse("CURATOR_AUDIT_ATTRIBUTION_ISSUE_RATIO")
                .unwrap_or(defaults.attribution_issue_ratio),
        }
    }

    pub fn with_creation_bounds(mut self, min: i64, max: i64) -> Self {
        self.min_creation_time = min;
        self.max_creation_time = max;
        self
    }

    pub fn with_timestamp_tolerance(mut self, tolerance: Duration) -> Self {
        self.timestamp_tolerance = tolerance;
        self
    }

    pub fn with_placeholder_images(mut self, images: Vec<String>) -> Self {
        self.placeholder_images = images;
        self
    }

    /// Whether `image` is one of the configured placeholder values.
    pub fn is_placeholder_image(&self, image: &str) -> bool {
        self.placeholder_images.iter().any(|p| p == image)
    }

    /// Validate the audit configuration.
    pub fn validate(&self) -> CuratorResult<()> {
        if self.min_creation_time >= self.max_creation_time {
            return Err(invalid(
                "min_creation_time",
                self.min_creation_time,
                "must be earlier than max_creation_time",
            ));
        }

        let ratios = [
            ("timestamp_issue_ratio", self.timestamp_issue_ratio),
            ("image_issue_ratio", self.image_issue_ratio),
            ("attribution_issue_ratio", self.attribution_issue_ratio),
        ];
        for (field, ratio) in ratios {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(invalid(field, ratio, "must be between 0.0 and 1.0"));
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.block_freshness_window, Duration::from_secs(120));
        assert_eq!(config.store_timeout, Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_builder() {
        let config = CacheConfig::new()
            .with_default_ttl(Duration::from_secs(60))
            .with_block_window(Duration::from_secs(30))
            .with_store_timeout(Duration::from_millis(500))
            .with_key_hash_threshold(64);

        assert_eq!(config.default_ttl, Duration::from_secs(60));
        assert_eq!(config.block_freshness_window, Duration::from_secs(30));
        assert_eq!(config.store_timeout, Duration::from_millis(500));
        assert_eq!(config.key_params_hash_threshold, 64);
    }

    #[test]
    fn test_cache_config_rejects_zero_durations() {
        let config = CacheConfig::new().with_store_timeout(Duration::ZERO);
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("store_timeout"));

        let config = CacheConfig::new().with_block_window(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audit_config_defaults() {
        let config = AuditConfig::default();
        assert_eq!(config.min_creation_time, DEFAULT_MIN_CREATION_TIME);
        assert_eq!(config.max_creation_time, DEFAULT_MAX_CREATION_TIME);
        assert!(config.is_placeholder_image("/placeholder.svg"));
        assert!(!config.is_placeholder_image("/cover.png"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_audit_config_rejects_inverted_bounds() {
        let config = AuditConfig::new().with_creation_bounds(100, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audit_config_rejects_ratio_out_of_range() {
        let mut config = AuditConfig::new();
        config.image_issue_ratio = 1.5;
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("image_issue_ratio"));
    }

    #[test]
    fn test_from_env_falls_back_on_garbage() {
        std::env::set_var("CURATOR_CACHE_BLOCK_WINDOW_SECS", "not-a-number");
        std::env::set_var("CURATOR_AUDIT_PLACEHOLDER_IMAGES", "/blank.png, /none.png");
        let cache = CacheConfig::from_env();
        let audit = AuditConfig::from_env();
        std::env::remove_var("CURATOR_CACHE_BLOCK_WINDOW_SECS");
        std::env::remove_var("CURATOR_AUDIT_PLACEHOLDER_IMAGES");

        assert_eq!(cache.block_freshness_window, Duration::from_secs(120));
        assert_eq!(
            audit.placeholder_images,
            vec!["/blank.png".to_string(), "/none.png".to_string()]
        );
    }
}
