//! Standardized content records
//!
//! The canonical, source-agnostic shape every raw content record is normalized
//! into before auditing. Records are produced by an external transformer; this
//! crate only defines the shape and a few read helpers.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Resolution state of a record's image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Image resolution has not finished
    #[default]
    Pending,
    /// Image resolved and usable
    Ready,
    /// Image resolution failed
    Failed,
}

/// Kind of content a record preserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "DOI")]
    Doi,
    #[serde(rename = "ISBN")]
    Isbn,
    #[serde(rename = "Cast")]
    Cast,
    #[serde(rename = "Custom")]
    Custom,
}

impl ContentType {
    /// The `extended_metadata` field this type must carry, if any.
    pub fn required_metadata_field(&self) -> Option<&'static str> {
        match self {
            ContentType::Doi => Some("doi"),
            ContentType::Isbn => Some("isbn"),
            ContentType::Cast => Some("castData"),
            ContentType::Url | ContentType::Custom => None,
        }
    }

    /// Wire name, as it appears in exported records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Url => "URL",
            ContentType::Doi => "DOI",
            ContentType::Isbn => "ISBN",
            ContentType::Cast => "Cast",
            ContentType::Custom => "Custom",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized content record.
///
/// `creation_time_unix` and `created_at_iso` describe the same instant and are
/// expected to agree; the auditor reports when they do not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizedRecord {
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub creator: String,
    pub creation_time_unix: i64,
    #[serde(default)]
    pub created_at_iso: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_status: ImageStatus,
    pub content_type: ContentType,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub extended_metadata: Map<String, Value>,
}

impl StandardizedRecord {
    /// Create a `Custom` record whose two timestamps agree on `created_at`.
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        creator: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            creator: creator.into(),
            creation_time_unix: created_at.timestamp(),
            created_at_iso: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            image: None,
            image_status: ImageStatus::Pending,
            content_type: ContentType::Custom,
            source_url: None,
            extended_metadata: Map::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>, status: ImageStatus) -> Self {
        self.image = Some(image.into());
        self.image_status = status;
        self
    }

    pub fn with_image_status(mut self, status: ImageStatus) -> Self {
        self.image_status = status;
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, field: impl Into<String>, value: Value) -> Self {
        self.extended_metadata.insert(field.into(), value);
        self
    }

    /// Override the Unix timestamp without touching the ISO form.
    pub fn with_creation_time_unix(mut self, secs: i64) -> Self {
        self.creation_time_unix = secs;
        self
    }

    /// Override the ISO timestamp without touching the Unix form.
    pub fn with_created_at_iso(mut self, iso: impl Into<String>) -> Self {
        self.created_at_iso = iso.into();
        self
    }

    /// Whether `field` carries a usable value in `extended_metadata`.
    ///
    /// Null, blank strings, and empty objects or arrays count as absent.
    pub fn has_metadata(&self, field: &str) -> bool {
        match self.extended_metadata.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(_) => true,
        }
    }

    /// `source_url` if present and not blank.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `image` if present and not blank.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

// ============================================================================
// TESTS
// ============================================================================
