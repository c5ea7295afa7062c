//! Deterministic cache keys for remote reads.
//!
//! A key is composed from the read's scope, source address, operation name,
//! and canonically serialized parameters, optionally prefixed by the identity
//! the read is specific to. The components are kept on the key as fields, so
//! the cache never has to re-parse the rendered string to recover them.
//!
//! # Layout
//!
//! ```text
//! [subject ':'] scope ':' source ':' operation ':' params
//! ```
//!
//! `params` is canonical JSON (object keys sorted at every level). When it is
//! longer than the hash threshold it is replaced with `sha256:<hex>` of the
//! canonical JSON so keys stay bounded for stores with key-size limits.

use std::fmt;
use std::hash::{Hash, Hasher};

use curator_core::{CacheError, CuratorResult};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::traits::EntryFilter;

/// Separator between key segments. Not allowed inside scope, address, or
/// operation components.
const SEPARATOR: char = ':';

/// Default length above which serialized parameters are hashed.
pub const DEFAULT_HASH_THRESHOLD: usize = 128;

/// Longest rendered key, in bytes. LMDB rejects keys above 511 bytes.
pub const MAX_KEY_LEN: usize = 511;

/// Normalize a chain address (or any identity string) for keys and filters.
///
/// Hex addresses are case-insensitive, so `0xAbC` and `0xabc` must map to the
/// same key.
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

/// Write `value` as canonical JSON: object keys sorted, no whitespace.
fn write_canonical(value: &Value, out: &mut String) -> CuratorResult<()> {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&encode_scalar(&Value::String(k.clone()))?);
                out.push(':');
                write_canonical(v, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(v, out)?;
            }
            out.push(']');
        }
        scalar => out.push_str(&encode_scalar(scalar)?),
    }
    Ok(())
}

fn encode_scalar(value: &Value) -> CuratorResult<String> {
    serde_json::to_string(value).map_err(|e| {
        CacheError::InvalidKey {
            reason: format!("failed to encode parameter value: {}", e),
        }
        .into()
    })
}

/// Serialize `params` into canonical JSON.
pub fn canonical_params<P: Serialize + ?Sized>(params: &P) -> CuratorResult<(Value, String)> {
    let value = serde_json::to_value(params).map_err(|e| CacheError::InvalidKey {
        reason: format!("parameters are not serializable: {}", e),
    })?;
    let mut out = String::new();
    write_canonical(&value, &mut out)?;
    Ok((value, out))
}

fn check_component(field: &str, value: &str) -> CuratorResult<()> {
    if value.is_empty() {
        return Err(CacheError::InvalidKey {
            reason: format!("{} must not be empty", field),
        }
        .into());
    }
    if value.contains(SEPARATOR) {
        return Err(CacheError::InvalidKey {
            reason: format!("{} must not contain '{}': {}", field, SEPARATOR, value),
        }
        .into());
    }
    Ok(())
}

/// A fully composed cache key.
///
/// Equality and hashing use the rendered key only.
#[derive(Debug, Clone)]
pub struct CacheKey {
    rendered: String,
    scope: String,
    source_address: String,
    operation_name: String,
    subject_address: Option<String>,
    params: Value,
}

impl CacheKey {
    /// Compose a key with no subject identity.
    pub fn new<P: Serialize + ?Sized>(
        scope: &str,
        source_address: &str,
        operation_name: &str,
        params: &P,
    ) -> CuratorResult<Self> {
        Self::builder(scope, source_address, operation_name)
            .params(params)?
            .build()
    }

    /// Start building a key.
    pub fn builder(scope: &str, source_address: &str, operation_name: &str) -> CacheKeyBuilder {
        CacheKeyBuilder {
            scope: scope.trim().to_string(),
            source_address: normalize_address(source_address),
            operation_name: operation_name.trim().to_string(),
            subject_address: None,
            params: Value::Null,
            canonical: "null".to_string(),
            hash_threshold: DEFAULT_HASH_THRESHOLD,
        }
    }

    /// The rendered key string, as stored.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn source_address(&self) -> &str {
        &self.source_address
    }

    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub fn subject_address(&self) -> Option<&str> {
        self.subject_address.as_deref()
    }

    /// The parameters the key was built from.
    pub fn params(&self) -> &Value {
        &self.params
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.rendered
    }
}

/// Builder for [`CacheKey`].
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    scope: String,
    source_address: String,
    operation_name: String,
    subject_address: Option<String>,
    params: Value,
    canonical: String,
    hash_threshold: usize,
}

impl CacheKeyBuilder {
    /// Set the read parameters. Fails if they cannot be serialized.
    pub fn params<P: Serialize + ?Sized>(mut self, params: &P) -> CuratorResult<Self> {
        let (value, canonical) = canonical_params(params)?;
        self.params = value;
        self.canonical = canonical;
        Ok(self)
    }

    /// Scope the key to a requesting identity.
    pub fn subject(mut self, subject_address: &str) -> Self {
        self.subject_address = Some(normalize_address(subject_address));
        self
    }

    /// Scope the key to a requesting identity if one is given.
    pub fn maybe_subject(self, subject_address: Option<&str>) -> Self {
        match subject_address {
            Some(subject) => self.subject(subject),
            None => self,
        }
    }

    /// Override the length above which parameters are hashed.
    pub fn hash_threshold(mut self, threshold: usize) -> Self {
        self.hash_threshold = threshold;
        self
    }

    /// Validate the components and render the key.
    pub fn build(self) -> CuratorResult<CacheKey> {
        check_component("scope", &self.scope)?;
        check_component("source address", &self.source_address)?;
        check_component("operation name", &self.operation_name)?;
        if let Some(subject) = &self.subject_address {
            check_component("subject address", subject)?;
        }

        let params_segment = if self.canonical.len() > self.hash_threshold {
            format!("sha256:{}", hex::encode(Sha256::digest(self.canonical.as_bytes())))
        } else {
            self.canonical
        };

        let mut rendered = String::with_capacity(
            self.scope.len() + self.source_address.len() + self.operation_name.len()
                + params_segment.len()
                + 48,
        );
        if let Some(subject) = &self.subject_address {
            rendered.push_str(subject);
            rendered.push(SEPARATOR);
        }
        rendered.push_str(&self.scope);
        rendered.push(SEPARATOR);
        rendered.push_str(&self.source_address);
        rendered.push(SEPARATOR);
        rendered.push_str(&self.operation_name);
        rendered.push(SEPARATOR);
        rendered.push_str(&params_segment);

        if rendered.len() > MAX_KEY_LEN {
            return Err(CacheError::InvalidKey {
                reason: format!(
                    "rendered key is {} bytes, limit is {}",
                    rendered.len(),
                    MAX_KEY_LEN
                ),
            }
            .into());
        }

        Ok(CacheKey {
            rendered,
            scope: self.scope,
            source_address: self.source_address,
            operation_name: self.operation_name,
            subject_address: self.subject_address,
            params: self.params,
        })
    }
}

/// Partial key descriptor for pattern invalidation.
///
/// Criteria combine with AND semantics. Addresses are normalized the same
/// way keys are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPattern {
    pub source_address: Option<String>,
    pub subject_address: Option<String>,
    pub operation_name: Option<String>,
}

impl InvalidationPattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source_address: &str) -> Self {
        self.source_address = Some(normalize_address(source_address));
        self
    }

    pub fn subject(mut self, subject_address: &str) -> Self {
        self.subject_address = Some(normalize_address(subject_address));
        self
    }

    pub fn operation(mut self, operation_name: &str) -> Self {
        self.operation_name = Some(operation_name.trim().to_string());
        self
    }

    /// Every entry that could be stale after a write to the key's
    /// source/subject/operation combination.
    pub fn for_key(key: &CacheKey) -> Self {
        Self {
            source_address: Some(key.source_address().to_string()),
            subject_address: key.subject_address().map(str::to_string),
            operation_name: Some(key.operation_name().to_string()),
        }
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.source_address.is_none()
            && self.subject_address.is_none()
            && self.operation_name.is_none()
    }

    /// Convert into a store filter.
    pub fn to_filter(&self) -> EntryFilter {
        EntryFilter {
            source_address: self.source_address.clone(),
            subject_address: self.subject_address.clone(),
            operation_name: self.operation_name.clone(),
            expired_as_of: None,
        }
    }
}

impl fmt::Display for InvalidationPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source={} subject={} operation={}",
            self.source_address.as_deref().unwrap_or("*"),
            self.subject_address.as_deref().unwrap_or("*"),
            self.operation_name.as_deref().unwrap_or("*"),
        )
    }
}
