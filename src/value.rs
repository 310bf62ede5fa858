//! Data context for template rendering
//!
//! A [`Context`] maps variable names to JSON values. It keeps insertion order,
//! which makes its serialized form (and therefore the cache fingerprint)
//! deterministic for a given sequence of inserts.
//!
//! ```rust,ignore
//! use modx_engine::Context;
//! use serde_json::json;
//!
//! let mut context = Context::new();
//! context.insert("title", "Home");
//! context.insert("items", json!(["a", "b"]));
//! ```
//!
//! Any `Serialize` type that serializes to an object can be merged in with
//! [`Context::extend_from_serialize`].

use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Ordered mapping from variable name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: IndexMap<String, JsonValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value, returning the previous one
    pub fn insert<K: Into<String>, V: Into<JsonValue>>(&mut self, key: K, value: V) -> Option<JsonValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
        self.values.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.values.iter()
    }

    /// Merge the fields of a serializable value into this context
    ///
    /// The value must serialize to a JSON object; its fields become top-level
    /// variables, overwriting existing names.
    pub fn extend_from_serialize<T: Serialize>(&mut self, value: &T) -> Result<()> {
        match serde_json::to_value(value)? {
            JsonValue::Object(map) => {
                self.values.extend(map);
                Ok(())
            }
            other => Err(Error::render_owned(format!(
                "Only object-shaped data can be merged into a context, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Compact JSON serialization used for fingerprinting
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.values)?)
    }
}

impl<K: Into<String>, V: Into<JsonValue>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        context.extend(iter);
        context
    }
}

impl<K: Into<String>, V: Into<JsonValue>> Extend<(K, V)> for Context {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Text form of a value as it appears in rendered output (before escaping)
///
/// Strings render verbatim, numbers and booleans through `to_string`, null as
/// nothing, and arrays/objects as compact JSON.
pub fn display_value(value: &JsonValue) -> Cow<'_, str> {
    match value {
        JsonValue::String(s) => Cow::Borrowed(s.as_str()),
        JsonValue::Number(n) => Cow::Owned(n.to_string()),
        JsonValue::Bool(b) => Cow::Owned(b.to_string()),
        JsonValue::Null => Cow::Borrowed(""),
        JsonValue::Array(_) | JsonValue::Object(_) => Cow::Owned(value.to_string()),
    }
}

pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
