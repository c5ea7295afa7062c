//! Issue types reported by the auditor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Severity of an audit issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Breaks display or ordering; fix now
    Critical,
    /// Degrades the record but it still renders
    Warning,
    /// Worth knowing, no action required
    Info,
}

impl Severity {
    /// Weight used by the health score.
    pub fn weight(&self) -> u64 {
        match self {
            Severity::Critical => 3,
            Severity::Warning => 2,
            Severity::Info => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which check produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueCategory {
    Timestamp,
    Image,
    Attribution,
    ContentType,
}

impl IssueCategory {
    /// All categories, in the order checks run.
    pub const ALL: [IssueCategory; 4] = [
        IssueCategory::Timestamp,
        IssueCategory::Image,
        IssueCategory::Attribution,
        IssueCategory::ContentType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Timestamp => "timestamp",
            IssueCategory::Image => "image",
            IssueCategory::Attribution => "attribution",
            IssueCategory::ContentType => "contentType",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found on one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub record_id: String,
    pub category: IssueCategory,
    pub severity: Severity,
    /// Stable machine-readable code, e.g. `too_old`
    pub code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Issue {
    pub fn new(
        record_id: impl Into<String>,
        category: IssueCategory,
        severity: Severity,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            category,
            severity,
            code: code.into(),
            description: description.into(),
            details: Map::new(),
            suggested_fix: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_weights() {
        assert_eq!(Severity::Critical.weight(), 3);
        assert_eq!(Severity::Warning.weight(), 2);
        assert_eq!(Severity::Info.weight(), 1);
    }

    #[test]
    fn test_issue_serializes_camel_case() {
        let issue = Issue::new(
            "r1",
            IssueCategory::ContentType,
            Severity::Warning,
            "missing_type_metadata",
            "DOI record has no doi",
        )
        .with_detail("field", "doi")
        .with_fix("Populate extendedMetadata.doi");

        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["recordId"], json!("r1"));
        assert_eq!(value["category"], json!("contentType"));
        assert_eq!(value["severity"], json!("warning"));
        assert_eq!(value["details"]["field"], json!("doi"));
        assert_eq!(value["suggestedFix"], json!("Populate extendedMetadata.doi"));
    }

    #[test]
    fn test_empty_details_are_omitted() {
        let issue = Issue::new("r1", IssueCategory::Image, Severity::Info, "image_missing", "x");
        let value = serde_json::to_value(&issue).unwrap();
        assert!(value.get("details").is_none());
        assert!(value.get("suggestedFix").is_none());
    }
}
