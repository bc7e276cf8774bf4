// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Canonical cache keys derived from a resource name and its query parameters.

use std::{borrow::Borrow, fmt};

use serde::Serialize;
use serde_json::Value;

/// A cache key built from a resource name and a canonical form of its query parameters.
///
/// Parameters are serialized to JSON with every object's fields sorted by name, at every
/// nesting level. Two queries for the same resource with the same parameter values therefore
/// produce the same key, whatever order the parameters were inserted in.
///
/// The textual form is `<resource>` when there are no parameters (`null` or an empty object)
/// and `<resource>:<canonical-json>` otherwise.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use vitrine_cache::CacheKey;
///
/// let a = CacheKey::for_query("products", &json!({ "page": 2, "category": "robes" }))?;
/// let b = CacheKey::for_query("products", &json!({ "category": "robes", "page": 2 }))?;
///
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), r#"products:{"category":"robes","page":2}"#);
/// # Ok::<(), vitrine_cache::KeyError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

/// Failure to serialize query parameters into a [`CacheKey`].
#[ohno::error]
#[display("failed to build a cache key for resource {resource}")]
pub struct KeyError {
    resource: String,
}

impl KeyError {
    /// Returns the resource name whose parameters could not be serialized.
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl CacheKey {
    /// Creates a key for a resource without parameters.
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self(resource.into())
    }

    /// Creates a key for `resource` queried with `params`.
    ///
    /// # Errors
    ///
    /// Returns a [`KeyError`] if `params` cannot be represented as JSON, for example a map
    /// whose keys are not strings.
    pub fn for_query<P>(resource: &str, params: &P) -> Result<Self, KeyError>
    where
        P: Serialize + ?Sized,
    {
        let params = serde_json::to_value(params).map_err(|e| KeyError::caused_by(resource, e))?;

        Ok(match canonicalize(params) {
            Value::Null => Self::new(resource),
            Value::Object(map) if map.is_empty() => Self::new(resource),
            params => Self(format!("{resource}:{params}")),
        })
    }

    /// Returns the textual form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns its textual form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

// Rebuilding objects from sorted entries keeps the order stable even when serde_json
// is compiled with `preserve_order`.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut fields: Vec<_> = map.into_iter().collect();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(fields.into_iter().map(|(name, value)| (name, canonicalize(value))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}
