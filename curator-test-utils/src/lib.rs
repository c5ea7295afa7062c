//! Curator Test Utilities
//!
//! Shared test infrastructure for the Curator workspace:
//! - Mock cache stores (failing, slow) and a recording observer
//! - Proptest generators for keys and records
//! - Fixtures for common audit scenarios
//! - Assertions over results and reports

pub use curator_audit::{AuditReport, Issue, IssueCategory, Severity};
pub use curator_core::{
    AuditConfig, CacheConfig, ContentType, CuratorError, CuratorResult, ImageStatus,
    StandardizedRecord, StorageError, Timestamp,
};
pub use curator_storage::{
    CacheEntry, CacheObserver, CacheOp, CacheStore, EntryFilter, InMemoryCacheStore,
    InvalidationPattern, MissReason,
};

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// MOCK STORES
// ============================================================================

/// Cache store whose every call fails with a backend error.
#[derive(Debug, Clone)]
pub struct FailingCacheStore {
    reason: String,
}

impl FailingCacheStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn err<T>(&self) -> CuratorResult<T> {
        Err(StorageError::Backend {
            reason: self.reason.clone(),
        }
        .into())
    }
}

impl Default for FailingCacheStore {
    fn default() -> Self {
        Self::new("store unavailable")
    }
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> CuratorResult<Option<CacheEntry>> {
        self.err()
    }

    async fn upsert(&self, _entry: CacheEntry) -> CuratorResult<()> {
        self.err()
    }

    async fn delete_where(&self, _filter: &EntryFilter) -> CuratorResult<u64> {
        self.err()
    }

    async fn count(&self, _filter: &EntryFilter) -> CuratorResult<u64> {
        self.err()
    }
}

/// In-memory store that sleeps before every call.
#[derive(Debug, Default)]
pub struct SlowCacheStore {
    inner: InMemoryCacheStore,
    delay: Duration,
}

impl SlowCacheStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryCacheStore::new(),
            delay,
        }
    }

    pub fn inner(&self) -> &InMemoryCacheStore {
        &self.inner
    }
}

#[async_trait]
impl CacheStore for SlowCacheStore {
    async fn get(&self, key: &str) -> CuratorResult<Option<CacheEntry>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn upsert(&self, entry: CacheEntry) -> CuratorResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(entry).await
    }

    async fn delete_where(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_where(filter).await
    }

    async fn count(&self, filter: &EntryFilter) -> CuratorResult<u64> {
        tokio::time::sleep(self.delay).await;
        self.inner.count(filter).await
    }
}

// ============================================================================
// RECORDING OBSERVER
// ============================================================================

/// One event seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Hit(String),
    Miss(String, MissReason),
    Write(String),
    Invalidate(String, u64),
    Sweep(u64),
    StoreError(CacheOp),
}

/// Observer that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ObservedEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn miss_reasons(&self) -> Vec<MissReason> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Miss(_, reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    pub fn store_errors(&self) -> Vec<CacheOp> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::StoreError(op) => Some(op),
                _ => None,
            })
            .collect()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_hit(&self, key: &str) {
        self.push(ObservedEvent::Hit(key.to_string()));
    }

    fn on_miss(&self, key: &str, reason: MissReason) {
        self.push(ObservedEvent::Miss(key.to_string(), reason));
    }

    fn on_write(&self, key: &str) {
        self.push(ObservedEvent::Write(key.to_string()));
    }

    fn on_invalidate(&self, pattern: &InvalidationPattern, removed: u64) {
        self.push(ObservedEvent::Invalidate(pattern.to_string(), removed));
    }

    fn on_sweep(&self, removed: u64) {
        self.push(ObservedEvent::Sweep(removed));
    }

    fn on_store_error(&self, op: CacheOp, _key: Option<&str>, _error: &CuratorError) {
        self.push(ObservedEvent::StoreError(op));
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for cache keys and records.

    use super::*;
    use chrono::{SecondsFormat, Utc};
    use curator_core::{DEFAULT_MAX_CREATION_TIME, DEFAULT_MIN_CREATION_TIME};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    /// Generate a 20-byte hex address with mixed case.
    pub fn arb_address() -> impl Strategy<Value = String> {
        "0x[0-9a-fA-F]{40}"
    }

    /// Generate an operation name such as `ownerOf`.
    pub fn arb_operation_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("ownerOf".to_string()),
            Just("balanceOf".to_string()),
            Just("tokenURI".to_string()),
            Just("totalSupply".to_string()),
            "[a-z][a-zA-Z]{2,15}",
        ]
    }

    /// Generate a flat JSON parameter object.
    pub fn arb_params() -> impl Strategy<Value = Value> {
        prop::collection::btree_map(
            "[a-z][a-zA-Z]{0,8}",
            prop_oneof![
                any::<u32>().prop_map(|n| json!(n)),
                any::<bool>().prop_map(|b| json!(b)),
                "[a-zA-Z0-9 ]{0,20}".prop_map(|s| json!(s)),
            ],
            0..5,
        )
        .prop_map(|map| Value::Object(map.into_iter().collect()))
    }

    /// Generate a Unix timestamp inside the default plausible range.
    pub fn arb_unix_in_bounds() -> impl Strategy<Value = i64> {
        DEFAULT_MIN_CREATION_TIME..=DEFAULT_MAX_CREATION_TIME
    }

    /// Generate a Timestamp inside the default plausible range.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        arb_unix_in_bounds().prop_map(|secs| {
            chrono::DateTime::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
        })
    }

    /// Generate an image reference the auditor accepts.
    pub fn arb_valid_image() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z]{3,10}\\.(png|jpg|svg)".prop_map(|f| format!("https://cdn.example.com/{}", f)),
            "[a-z]{3,10}\\.(png|jpg)".prop_map(|f| format!("/media/{}", f)),
            "[a-z0-9]{46}".prop_map(|cid| format!("ipfs://{}", cid)),
        ]
    }

    pub fn arb_content_type() -> impl Strategy<Value = ContentType> {
        prop_oneof![
            Just(ContentType::Url),
            Just(ContentType::Doi),
            Just(ContentType::Isbn),
            Just(ContentType::Cast),
            Just(ContentType::Custom),
        ]
    }

    pub fn arb_image_status() -> impl Strategy<Value = ImageStatus> {
        prop_oneof![
            Just(ImageStatus::Pending),
            Just(ImageStatus::Ready),
            Just(ImageStatus::Failed),
        ]
    }

    /// Generate a record that passes every check.
    pub fn arb_clean_record() -> impl Strategy<Value = StandardizedRecord> {
        (
            "[a-z0-9]{8}",
            "[A-Z][a-z]{2,10}",
            "[A-Z][a-z]{2,10}",
            arb_timestamp(),
            arb_valid_image(),
        )
            .prop_filter("author and creator differ", |(_, author, creator, _, _)| {
                author != creator
            })
            .prop_map(|(id, author, creator, at, image)| {
                StandardizedRecord::new(id, author, creator, at)
                    .with_image(image, ImageStatus::Ready)
            })
    }

    /// Generate a record with arbitrary, possibly broken, metadata.
    pub fn arb_record() -> impl Strategy<Value = StandardizedRecord> {
        (
            "[a-z0-9]{8}",
            prop_oneof![Just(String::new()), Just("Unknown Author".to_string()), "[A-Z][a-z]{2,10}"],
            prop_oneof![Just(String::new()), Just("Unknown Creator".to_string()), "[A-Z][a-z]{2,10}"],
            prop_oneof![Just(0i64), Just(1_709_294_400_000i64), arb_unix_in_bounds()],
            prop::option::of(prop_oneof![
                Just("not a url".to_string()),
                Just("/placeholder.svg".to_string()),
                arb_valid_image(),
            ]),
            arb_image_status(),
            arb_content_type(),
            prop::option::of(Just("https://example.com/item".to_string())),
            any::<bool>(),
        )
            .prop_map(
                |(id, author, creator, unix, image, status, content_type, source_url, iso_ok)| {
                    let iso = if iso_ok {
                        chrono::DateTime::from_timestamp(unix, 0)
                            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                            .unwrap_or_default()
                    } else {
                        "not a date".to_string()
                    };
                    StandardizedRecord {
                        id,
                        author,
                        creator,
                        creation_time_unix: unix,
                        created_at_iso: iso,
                        image,
                        image_status: status,
                        content_type,
                        source_url,
                        extended_metadata: Default::default(),
                    }
                },
            )
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common audit scenarios.

    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;

    /// 2024-03-01T12:00:00Z
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// A record that passes every check.
    pub fn clean_record(id: &str) -> StandardizedRecord {
        StandardizedRecord::new(id, "alice", "bob", reference_time())
            .with_image("https://cdn.example.com/cover.png", ImageStatus::Ready)
    }

    /// Creation time defaulted to the Unix epoch.
    pub fn epoch_record(id: &str) -> StandardizedRecord {
        StandardizedRecord::new(id, "alice", "bob", DateTime::<Utc>::UNIX_EPOCH)
            .with_image("https://cdn.example.com/cover.png", ImageStatus::Ready)
    }

    /// Creation time written in milliseconds; the ISO form is correct.
    pub fn millis_record(id: &str) -> StandardizedRecord {
        let record = clean_record(id);
        let millis = record.creation_time_unix * 1000;
        record.with_creation_time_unix(millis)
    }

    /// ISO timestamp that does not parse.
    pub fn unparsable_iso_record(id: &str) -> StandardizedRecord {
        clean_record(id).with_created_at_iso("last tuesday")
    }

    /// DOI record with a blank `doi` field.
    pub fn doi_record_without_metadata(id: &str) -> StandardizedRecord {
        clean_record(id)
            .with_content_type(ContentType::Doi)
            .with_source_url("https://doi.org/10.1000/182")
            .with_metadata("doi", json!(""))
    }

    /// Ten records: eight clean, one epoch timestamp, one unparsable ISO.
    pub fn batch_with_two_criticals() -> Vec<StandardizedRecord> {
        let mut records: Vec<_> = (0..8).map(|i| clean_record(&format!("clean-{}", i))).collect();
        records.push(epoch_record("epoch"));
        records.push(unparsable_iso_record("bad-iso"));
        records
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over results and audit reports.

    use super::*;

    /// Assert that a CuratorResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &CuratorResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a CuratorResult is a Config error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &CuratorResult<T>) {
        match result {
            Err(CuratorError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a CuratorResult is a Cache error.
    #[track_caller]
    pub fn assert_cache_error<T: std::fmt::Debug>(result: &CuratorResult<T>) {
        match result {
            Err(CuratorError::Cache(_)) => {}
            other => panic!("Expected Cache error, got: {:?}", other),
        }
    }

    /// Assert that `record_id` has exactly one issue with `code`, at `severity`.
    #[track_caller]
    pub fn assert_single_issue(report: &AuditReport, record_id: &str, code: &str, severity: Severity) {
        let matching: Vec<_> = report
            .issues_for(record_id)
            .into_iter()
            .filter(|i| i.code == code)
            .collect();
        assert_eq!(
            matching.len(),
            1,
            "Expected one {} issue on {}, got: {:?}",
            code,
            record_id,
            report.issues_for(record_id)
        );
        assert_eq!(matching[0].severity, severity, "Wrong severity for {}", code);
    }

    /// Assert that `record_id` has no issues at all.
    #[track_caller]
    pub fn assert_no_issues(report: &AuditReport, record_id: &str) {
        let issues = report.issues_for(record_id);
        assert!(issues.is_empty(), "Expected no issues on {}, got: {:?}", record_id, issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn test_generators_produce_values() {
        let mut runner = TestRunner::default();
        let record = generators::arb_clean_record()
            .new_tree(&mut runner)
            .unwrap()
            .current();
        assert!(!record.id.is_empty());
        let address = generators::arb_address().new_tree(&mut runner).unwrap().current();
        assert_eq!(address.len(), 42);
    }

    #[test]
    fn test_fixtures() {
        assert_eq!(fixtures::epoch_record("e").creation_time_unix, 0);
        assert_eq!(fixtures::millis_record("m").creation_time_unix, 1_709_294_400_000);
        assert_eq!(fixtures::batch_with_two_criticals().len(), 10);
    }

    #[tokio::test]
    async fn test_failing_store_fails() {
        let store = FailingCacheStore::default();
        assert!(store.get("k").await.is_err());
        assert!(store.clear().await.is_err());
    }

    #[test]
    fn test_recording_observer() {
        let observer = RecordingObserver::new();
        observer.on_miss("k", MissReason::Absent);
        observer.on_store_error(CacheOp::Set, None, &StorageError::LockPoisoned.into());
        assert_eq!(observer.miss_reasons(), vec![MissReason::Absent]);
        assert_eq!(observer.store_errors(), vec![CacheOp::Set]);
        assert_eq!(observer.events().len(), 2);
    }

    proptest! {
        #[test]
        fn prop_params_are_objects(params in generators::arb_params()) {
            prop_assert!(params.is_object());
        }
    }
}
