//! Bound argument bag handed to tool handlers.
//!
//! Handlers extract their own fields with explicit defaults. JSON `null` is
//! treated the same as an absent field by every accessor.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::registry::{ToolError, ToolResult};

/// Named arguments left after schema filtering.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Creates an empty argument bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of a field, ignoring JSON `null`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|value| !value.is_null())
    }

    /// Returns `true` when a non-null value is present for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns a string field that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingArgument`] when the field is absent and
    /// [`ToolError::InvalidArgument`] when it is not a string.
    pub fn require_str(&self, name: &str) -> ToolResult<&str> {
        self.optional_str(name)?
            .ok_or_else(|| ToolError::missing(name))
    }

    /// Returns a string field if present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] when the field is not a string.
    pub fn optional_str(&self, name: &str) -> ToolResult<Option<&str>> {
        match self.get(name) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(ToolError::invalid(
                name,
                format!("expected a string, got {}", crate::json_kind(other)),
            )),
        }
    }

    /// Returns a string field, falling back to `default` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] when the field is not a string.
    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> ToolResult<&'a str> {
        Ok(self.optional_str(name)?.unwrap_or(default))
    }

    /// Deserializes a field that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingArgument`] when the field is absent and
    /// [`ToolError::InvalidArgument`] when it does not deserialize into `T`.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> ToolResult<T> {
        self.optional(name)?.ok_or_else(|| ToolError::missing(name))
    }

    /// Deserializes a field if present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] when the field does not
    /// deserialize into `T`.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> ToolResult<Option<T>> {
        self.get(name)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|err| ToolError::invalid(name, err.to_string()))
            })
            .transpose()
    }

    /// Deserializes the whole bag into a typed parameter struct.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArgument`] naming the bag when
    /// deserialization fails, including for missing non-optional fields.
    pub fn deserialize<T: DeserializeOwned>(&self) -> ToolResult<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|err| ToolError::invalid("arguments", err.to_string()))
    }

    /// Iterates over field names in caller order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns the number of bound fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no fields were bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the bag and returns the underlying map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
