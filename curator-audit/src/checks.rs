//! Per-category record checks.
//!
//! Each check looks at one record at a time and appends whatever it finds.
//! Checks never fail: a malformed record is something to report, not an error.

use chrono::{DateTime, NaiveDateTime, Utc};
use curator_core::{AuditConfig, ContentType, ImageStatus, StandardizedRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::issue::{Issue, IssueCategory, Severity};

/// Placeholder author emitted by upstream transformers.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
/// Placeholder creator emitted by upstream transformers.
pub const UNKNOWN_CREATOR: &str = "Unknown Creator";

/// Content identifier in the host position of an `ipfs://` URI.
pub(crate) static IPFS_CID: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$"));

/// A validator for one issue category.
pub trait RecordCheck: Send + Sync {
    fn category(&self) -> IssueCategory;

    fn check(&self, record: &StandardizedRecord, config: &AuditConfig, issues: &mut Vec<Issue>);
}

/// The built-in checks, in reporting order.
pub fn default_checks() -> Vec<Box<dyn RecordCheck>> {
    vec![
        Box::new(TimestampCheck),
        Box::new(ImageCheck),
        Box::new(AttributionCheck),
        Box::new(ContentTypeCheck),
    ]
}

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339, and a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` which is read
/// as UTC.
pub fn parse_iso_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whether `image` is a reference the site can load.
///
/// Accepts absolute http(s) URLs with a host, site-relative paths (`/a.png`
/// but not protocol-relative `//host/a.png`), and `ipfs://<cid>[/path]`.
pub fn is_valid_image_url(image: &str) -> bool {
    if image.starts_with('/') {
        return !image.starts_with("//") && !image.chars().any(char::is_whitespace);
    }
    let Ok(url) = Url::parse(image) else {
        return false;
    };
    match url.scheme() {
        "http" | "https" => url.host_str().is_some_and(|host| !host.is_empty()),
        "ipfs" => match (url.host_str(), IPFS_CID.as_ref()) {
            (Some(cid), Ok(re)) => re.is_match(cid),
            _ => false,
        },
        _ => false,
    }
}

fn digit_count(value: i64) -> usize {
    value.unsigned_abs().to_string().len()
}

// ============================================================================
// TIMESTAMP
// ============================================================================

/// Unix bounds and agreement between the Unix and ISO forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampCheck;

impl RecordCheck for TimestampCheck {
    fn category(&self) -> IssueCategory {
        IssueCategory::Timestamp
    }

    fn check(&self, record: &StandardizedRecord, config: &AuditConfig, issues: &mut Vec<Issue>) {
        let unix = record.creation_time_unix;

        if unix < config.min_creation_time {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Timestamp,
                    Severity::Critical,
                    "too_old",
                    format!(
                        "Creation time {} is before the earliest plausible time {}",
                        unix, config.min_creation_time
                    ),
                )
                .with_detail("creationTimeUnix", unix)
                .with_detail("minCreationTime", config.min_creation_time)
                .with_fix("Derive the creation time from the source timestamp instead of a default"),
            );
        } else if unix > config.max_creation_time {
            let mut issue = Issue::new(
                &record.id,
                IssueCategory::Timestamp,
                Severity::Critical,
                "too_new",
                format!(
                    "Creation time {} is after the latest plausible time {}",
                    unix, config.max_creation_time
                ),
            )
            .with_detail("creationTimeUnix", unix)
            .with_detail("maxCreationTime", config.max_creation_time);
            if digit_count(unix) == 13 {
                issue = issue
                    .with_detail("likelyMilliseconds", true)
                    .with_fix("Divide by 1000: the value looks like milliseconds");
            }
            issues.push(issue);
        }

        match parse_iso_timestamp(&record.created_at_iso) {
            None => issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Timestamp,
                    Severity::Critical,
                    "unparsable_iso",
                    format!("ISO timestamp {:?} does not parse", record.created_at_iso),
                )
                .with_detail("createdAtIso", record.created_at_iso.as_str())
                .with_fix("Emit createdAtIso as RFC 3339"),
            ),
            Some(parsed) => {
                let drift = parsed.timestamp().abs_diff(unix);
                let tolerance = config.timestamp_tolerance.as_secs();
                if drift > tolerance {
                    issues.push(
                        Issue::new(
                            &record.id,
                            IssueCategory::Timestamp,
                            Severity::Warning,
                            "iso_mismatch",
                            format!(
                                "ISO timestamp is {}s away from the Unix timestamp (tolerance {}s)",
                                drift, tolerance
                            ),
                        )
                        .with_detail("creationTimeUnix", unix)
                        .with_detail("isoUnix", parsed.timestamp())
                        .with_detail("driftSeconds", drift)
                        .with_fix("Derive both timestamps from the same instant"),
                    );
                }
            }
        }
    }
}

// ============================================================================
// IMAGE
// ============================================================================

/// Image resolution state and reference shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCheck;

impl RecordCheck for ImageCheck {
    fn category(&self) -> IssueCategory {
        IssueCategory::Image
    }

    fn check(&self, record: &StandardizedRecord, config: &AuditConfig, issues: &mut Vec<Issue>) {
        if record.image_status == ImageStatus::Failed {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Image,
                    Severity::Warning,
                    "image_failed",
                    "Image resolution failed",
                )
                .with_fix("Retry image resolution or pick a fallback image"),
            );
        }

        match record.image() {
            None => issues.push(Issue::new(
                &record.id,
                IssueCategory::Image,
                Severity::Info,
                "image_missing",
                "Record has no image",
            )),
            Some(image) if config.is_placeholder_image(image) => issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Image,
                    Severity::Info,
                    "image_placeholder",
                    "Record uses a placeholder image",
                )
                .with_detail("image", image),
            ),
            Some(image) if !is_valid_image_url(image) => issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Image,
                    Severity::Critical,
                    "invalid_image_url",
                    format!("Image reference {:?} is not a loadable URL", image),
                )
                .with_detail("image", image)
                .with_fix("Use an absolute http(s) URL, a site-relative path, or an ipfs:// URI"),
            ),
            Some(_) => {}
        }
    }
}

// ============================================================================
// ATTRIBUTION
// ============================================================================

/// Author and creator presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionCheck;

impl AttributionCheck {
    fn is_unknown(value: &str, placeholder: &str) -> bool {
        let value = value.trim();
        value.is_empty() || value == placeholder
    }
}

impl RecordCheck for AttributionCheck {
    fn category(&self) -> IssueCategory {
        IssueCategory::Attribution
    }

    fn check(&self, record: &StandardizedRecord, _config: &AuditConfig, issues: &mut Vec<Issue>) {
        let author_unknown = Self::is_unknown(&record.author, UNKNOWN_AUTHOR);

        if author_unknown {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Attribution,
                    Severity::Warning,
                    "unknown_author",
                    "Record has no known author",
                )
                .with_detail("author", record.author.as_str())
                .with_fix("Extract the author from the source record"),
            );
        }

        if Self::is_unknown(&record.creator, UNKNOWN_CREATOR) {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Attribution,
                    Severity::Info,
                    "unknown_creator",
                    "Record has no known creator",
                )
                .with_detail("creator", record.creator.as_str()),
            );
        }

        if !author_unknown && record.author.trim() == record.creator.trim() {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::Attribution,
                    Severity::Info,
                    "author_is_creator",
                    "Author and creator are the same",
                )
                .with_detail("author", record.author.as_str()),
            );
        }
    }
}

// ============================================================================
// CONTENT TYPE
// ============================================================================

/// Type-specific metadata and source URL presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeCheck;

impl RecordCheck for ContentTypeCheck {
    fn category(&self) -> IssueCategory {
        IssueCategory::ContentType
    }

    fn check(&self, record: &StandardizedRecord, _config: &AuditConfig, issues: &mut Vec<Issue>) {
        let content_type = record.content_type;
        let has_source_url = record.source_url().is_some();

        let missing = match content_type {
            ContentType::Url if !has_source_url => Some("sourceUrl"),
            _ => content_type
                .required_metadata_field()
                .filter(|field| !record.has_metadata(field)),
        };

        if let Some(field) = missing {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::ContentType,
                    Severity::Warning,
                    "missing_type_metadata",
                    format!("{} record is missing {}", content_type, field),
                )
                .with_detail("contentType", content_type.as_str())
                .with_detail("field", field)
                .with_fix(format!("Populate {} for {} records", field, content_type)),
            );
        }

        if content_type != ContentType::Custom && !has_source_url {
            issues.push(
                Issue::new(
                    &record.id,
                    IssueCategory::ContentType,
                    Severity::Info,
                    "missing_source_url",
                    format!("{} record has no source URL", content_type),
                )
                .with_detail("contentType", content_type.as_str()),
            );
        }
    }
}
