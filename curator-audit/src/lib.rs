//! Curator Audit - Metadata quality audit for standardized records
//!
//! Runs a fixed set of per-category checks (timestamp, image, attribution,
//! content type) over a batch of [`StandardizedRecord`]s and aggregates the
//! findings into an [`AuditReport`] with a 0-100 health score and
//! recommendations.

pub mod checks;
pub mod issue;
pub mod report;

pub use checks::{
    default_checks, is_valid_image_url, parse_iso_timestamp, AttributionCheck, ContentTypeCheck,
    ImageCheck, RecordCheck, TimestampCheck,
};
pub use issue::{Issue, IssueCategory, Severity};
pub use report::{health_score, AuditReport, AuditSummary};

use chrono::Utc;
use curator_core::{AuditConfig, ConfigError, CuratorResult, StandardizedRecord, ValidationError};

// ============================================================================
// AUDITOR
// ============================================================================

/// Runs record checks and builds reports.
pub struct MetadataAuditor {
    config: AuditConfig,
    checks: Vec<Box<dyn RecordCheck>>,
}

impl std::fmt::Debug for MetadataAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let categories: Vec<_> = self.checks.iter().map(|c| c.category()).collect();
        f.debug_struct("MetadataAuditor")
            .field("config", &self.config)
            .field("checks", &categories)
            .finish()
    }
}

impl MetadataAuditor {
    /// Create an auditor with the built-in checks.
    pub fn new(config: AuditConfig) -> CuratorResult<Self> {
        config.validate()?;
        if let Err(e) = checks::IPFS_CID.as_ref() {
            return Err(ConfigError::InvalidValue {
                field: "ipfs_cid_pattern".to_string(),
                value: String::new(),
                reason: e.to_string(),
            }
            .into());
        }
        Ok(Self {
            config,
            checks: default_checks(),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Append an extra check; it runs after the built-in ones.
    pub fn with_check(mut self, check: Box<dyn RecordCheck>) -> Self {
        self.checks.push(check);
        self
    }

    /// Audit `records`.
    ///
    /// Each check runs over the whole list before the next one starts, so
    /// issues come out grouped by category in check order.
    pub fn audit(&self, records: &[StandardizedRecord]) -> AuditReport {
        let mut issues = Vec::new();
        for check in &self.checks {
            let before = issues.len();
            for record in records {
                check.check(record, &self.config, &mut issues);
            }
            tracing::debug!(
                category = %check.category(),
                found = issues.len() - before,
                "record check finished"
            );
        }

        let report = AuditReport::build(records.len(), issues, &self.config, Utc::now());
        tracing::debug!(
            records = report.summary.total_records,
            issues = report.summary.issue_count,
            critical = report.summary.critical_count,
            health_score = report.summary.health_score,
            "metadata audit complete"
        );
        report
    }

    /// Parse a JSON array of records and audit it.
    ///
    /// Only the JSON shape can fail; record contents are reported, not rejected.
    pub fn audit_json(&self, json: &str) -> CuratorResult<AuditReport> {
        let records: Vec<StandardizedRecord> =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidValue {
                field: "records".to_string(),
                reason: e.to_string(),
            })?;
        Ok(self.audit(&records))
    }
}

/// Audit `records` with the default configuration.
pub fn audit_records(records: &[StandardizedRecord]) -> AuditReport {
    let auditor = MetadataAuditor {
        config: AuditConfig::default(),
        checks: default_checks(),
    };
    auditor.audit(records)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use curator_core::{ContentType, CuratorError, ImageStatus};
    use serde_json::json;

    fn clean(id: &str) -> StandardizedRecord {
        StandardizedRecord::new(
            id,
            "alice",
            "bob",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
        .with_image("https://cdn.example.com/a.png", ImageStatus::Ready)
    }

    struct EveryRecord;

    impl RecordCheck for EveryRecord {
        fn category(&self) -> IssueCategory {
            IssueCategory::ContentType
        }

        fn check(&self, record: &StandardizedRecord, _config: &AuditConfig, issues: &mut Vec<Issue>) {
            issues.push(Issue::new(
                &record.id,
                IssueCategory::ContentType,
                Severity::Info,
                "custom",
                "custom check",
            ));
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = AuditConfig::default().with_creation_bounds(10, 10);
        assert!(matches!(
            MetadataAuditor::new(config),
            Err(CuratorError::Config(_))
        ));
    }

    #[test]
    fn test_clean_batch_is_perfect() {
        let records: Vec<_> = (0..5).map(|i| clean(&format!("r{}", i))).collect();
        let report = audit_records(&records);
        assert_eq!(report.summary.total_records, 5);
        assert_eq!(report.summary.issue_count, 0);
        assert_eq!(report.summary.health_score, 100.0);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_issues_grouped_by_check_order() {
        let mut a = clean("a").with_content_type(ContentType::Doi);
        a.author = String::new();
        let b = clean("b").with_creation_time_unix(0);
        let report = audit_records(&[a, b]);

        let categories: Vec<_> = report.issues.iter().map(|i| i.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
        assert_eq!(report.issues_for("b")[0].code, "too_old");
    }

    #[test]
    fn test_extra_check_runs_last() {
        let auditor = MetadataAuditor::new(AuditConfig::default())
            .unwrap()
            .with_check(Box::new(EveryRecord));
        let report = auditor.audit(&[clean("a").with_creation_time_unix(0)]);
        assert_eq!(report.issues.first().unwrap().code, "too_old");
        assert_eq!(report.issues.last().unwrap().code, "custom");
    }

    #[test]
    fn test_custom_bounds() {
        let auditor = MetadataAuditor::new(
            AuditConfig::default().with_creation_bounds(0, DateTime::<Utc>::MAX_UTC.timestamp()),
        )
        .unwrap();
        let report = auditor.audit(&[StandardizedRecord::new(
            "epoch",
            "alice",
            "bob",
            DateTime::<Utc>::UNIX_EPOCH,
        )
        .with_image("/a.png", ImageStatus::Ready)]);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_audit_json() {
        let auditor = MetadataAuditor::new(AuditConfig::default()).unwrap();
        let json = json!([{
            "id": "r1",
            "author": "alice",
            "creator": "bob",
            "creationTimeUnix": 1_709_294_400,
            "createdAtIso": "2024-03-01T12:00:00Z",
            "image": "ipfs://bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi",
            "imageStatus": "ready",
            "contentType": "DOI",
            "sourceUrl": "https://doi.org/10.1000/182",
            "extendedMetadata": { "doi": "10.1000/182" }
        }])
        .to_string();
        let report = auditor.audit_json(&json).unwrap();
        assert_eq!(report.summary.issue_count, 0);

        assert!(matches!(
            auditor.audit_json("{\"not\": \"a list\"}"),
            Err(CuratorError::Validation(_))
        ));
    }
}
