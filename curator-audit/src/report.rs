//! Aggregated audit report.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use curator_core::AuditConfig;
use serde::{Deserialize, Serialize};

use crate::issue::{Issue, IssueCategory, Severity};

/// Score reported for a record set with no issues.
pub const PERFECT_SCORE: f64 = 100.0;

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total_records: usize,
    pub issue_count: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// 0 to 100; 100 means no issues
    pub health_score: f64,
}

/// Result of auditing a batch of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub summary: AuditSummary,
    pub issues: Vec<Issue>,
    pub per_category_counts: BTreeMap<IssueCategory, usize>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Health score for `issues` spread over `total_records` records.
///
/// Each record can lose at most four weighted points before the score bottoms
/// out at zero. An empty record set scores 100.
pub fn health_score(total_records: usize, issues: &[Issue]) -> f64 {
    if total_records == 0 {
        return PERFECT_SCORE;
    }
    let weighted: u64 = issues.iter().map(|i| i.severity.weight()).sum();
    let max_weight = (total_records as f64) * 4.0;
    (PERFECT_SCORE - PERFECT_SCORE * weighted as f64 / max_weight).max(0.0)
}

fn records_with_issues_in(issues: &[Issue], category: IssueCategory) -> usize {
    issues
        .iter()
        .filter(|i| i.category == category)
        .map(|i| i.record_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

fn percent(ratio: f64) -> f64 {
    (ratio * 1000.0).round() / 10.0
}

fn recommendations(
    total_records: usize,
    issues: &[Issue],
    critical_count: usize,
    config: &AuditConfig,
) -> Vec<String> {
    let mut out = Vec::new();
    if critical_count > 0 {
        out.push(format!(
            "Address {} critical issue(s) immediately: they break record display or ordering",
            critical_count
        ));
    }
    if total_records == 0 {
        return out;
    }

    let ratio = |category| records_with_issues_in(issues, category) as f64 / total_records as f64;

    let timestamp = ratio(IssueCategory::Timestamp);
    if timestamp > config.timestamp_issue_ratio {
        out.push(format!(
            "Standardize timestamp derivation: {}% of records have timestamp issues",
            percent(timestamp)
        ));
    }

    let image = ratio(IssueCategory::Image);
    if image > config.image_issue_ratio {
        out.push(format!(
            "Review image resolution: {}% of records have image issues",
            percent(image)
        ));
    }

    let attribution = ratio(IssueCategory::Attribution);
    if attribution > config.attribution_issue_ratio {
        out.push(format!(
            "Improve author/creator extraction: {}% of records have attribution issues",
            percent(attribution)
        ));
    }

    if issues
        .iter()
        .any(|i| i.category == IssueCategory::ContentType && i.severity == Severity::Warning)
    {
        out.push(
            "Populate type-specific metadata (doi, isbn, castData, sourceUrl) for typed records"
                .to_string(),
        );
    }

    out
}

impl AuditReport {
    /// Assemble a report from the issues found over `total_records` records.
    pub fn build(
        total_records: usize,
        issues: Vec<Issue>,
        config: &AuditConfig,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let count = |severity| issues.iter().filter(|i| i.severity == severity).count();
        let critical_count = count(Severity::Critical);
        let warning_count = count(Severity::Warning);
        let info_count = count(Severity::Info);

        let mut per_category_counts: BTreeMap<IssueCategory, usize> =
            IssueCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for issue in &issues {
            *per_category_counts.entry(issue.category).or_default() += 1;
        }

        let summary = AuditSummary {
            total_records,
            issue_count: issues.len(),
            critical_count,
            warning_count,
            info_count,
            health_score: health_score(total_records, &issues),
        };
        let recommendations = recommendations(total_records, &issues, critical_count, config);

        Self {
            summary,
            issues,
            per_category_counts,
            recommendations,
            generated_at,
        }
    }

    /// Issues raised against one record.
    pub fn issues_for(&self, record_id: &str) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.record_id == record_id)
            .collect()
    }

    /// Issues in one category.
    pub fn issues_in(&self, category: IssueCategory) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.category == category)
            .collect()
    }

    /// True when nothing critical was found.
    pub fn is_healthy(&self) -> bool {
        self.summary.critical_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(record: &str, category: IssueCategory, severity: Severity) -> Issue {
        Issue::new(record, category, severity, "test", "test issue")
    }

    #[test]
    fn test_empty_set_scores_perfect() {
        assert_eq!(health_score(0, &[]), 100.0);
        let report = AuditReport::build(0, Vec::new(), &AuditConfig::default(), Utc::now());
        assert_eq!(report.summary.health_score, 100.0);
        assert!(report.recommendations.is_empty());
        assert!(report.is_healthy());
    }

    #[test]
    fn test_score_weights() {
        // 2 records, max weight 8; one critical (3) and one info (1) => 50.
        let issues = vec![
            issue("a", IssueCategory::Timestamp, Severity::Critical),
            issue("b", IssueCategory::Image, Severity::Info),
        ];
        assert_eq!(health_score(2, &issues), 50.0);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let issues: Vec<_> = (0..5)
            .map(|_| issue("a", IssueCategory::Timestamp, Severity::Critical))
            .collect();
        assert_eq!(health_score(1, &issues), 0.0);
    }

    #[test]
    fn test_counts_and_accessors() {
        let issues = vec![
            issue("a", IssueCategory::Timestamp, Severity::Critical),
            issue("a", IssueCategory::Image, Severity::Info),
            issue("b", IssueCategory::Attribution, Severity::Warning),
        ];
        let report = AuditReport::build(10, issues, &AuditConfig::default(), Utc::now());

        assert_eq!(report.summary.issue_count, 3);
        assert_eq!(report.summary.critical_count, 1);
        assert_eq!(report.summary.warning_count, 1);
        assert_eq!(report.summary.info_count, 1);
        assert_eq!(report.per_category_counts[&IssueCategory::Timestamp], 1);
        assert_eq!(report.per_category_counts[&IssueCategory::ContentType], 0);
        assert_eq!(report.issues_for("a").len(), 2);
        assert_eq!(report.issues_in(IssueCategory::Attribution).len(), 1);
        assert!(!report.is_healthy());
    }

    #[test]
    fn test_recommendation_thresholds() {
        // 1 of 10 records with a timestamp issue sits exactly at the 10% ratio.
        let at_threshold = vec![issue("a", IssueCategory::Timestamp, Severity::Warning)];
        let report = AuditReport::build(10, at_threshold, &AuditConfig::default(), Utc::now());
        assert!(report.recommendations.is_empty());

        let over = vec![
            issue("a", IssueCategory::Timestamp, Severity::Warning),
            issue("b", IssueCategory::Timestamp, Severity::Warning),
        ];
        let report = AuditReport::build(10, over, &AuditConfig::default(), Utc::now());
        assert_eq!(report.recommendations.len(), 1);
        assert!(report.recommendations[0].contains("timestamp"));
        assert!(report.recommendations[0].contains("20%"));
    }

    #[test]
    fn test_critical_and_content_type_recommendations() {
        let issues = vec![
            issue("a", IssueCategory::Image, Severity::Critical),
            issue("b", IssueCategory::ContentType, Severity::Warning),
        ];
        let report = AuditReport::build(100, issues, &AuditConfig::default(), Utc::now());
        assert!(report.recommendations[0].contains("1 critical issue(s) immediately"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("type-specific metadata")));
    }

    #[test]
    fn test_report_serializes() {
        let report = AuditReport::build(
            1,
            vec![issue("a", IssueCategory::ContentType, Severity::Info)],
            &AuditConfig::default(),
            Utc::now(),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["totalRecords"], serde_json::json!(1));
        assert_eq!(value["perCategoryCounts"]["contentType"], serde_json::json!(1));
    }
}
