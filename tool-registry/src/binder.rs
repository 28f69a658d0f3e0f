//! Schema-filtered argument binding.
//!
//! Binding is a filter, not a validator. Keys the schema does not declare are
//! dropped without error, so callers may pass extra context fields. Fields the
//! schema marks as required are *not* checked here; the handler is responsible
//! for rejecting absent required arguments (and for defaulting optional ones).
//! The only failure is a raw argument value that is not a JSON object.

use serde_json::{Map, Value};
use thiserror::Error;
use tool_primitives::InputSchema;

use crate::Arguments;

/// Errors produced while binding raw arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// Raw arguments were not a JSON object.
    #[error("arguments for tool `{tool}` must be a JSON object, got {found}")]
    InvalidArgumentsKind {
        /// Name of the tool being invoked.
        tool: String,
        /// JSON kind that was supplied instead.
        found: &'static str,
    },
}

/// Returns the JSON kind of a value for use in error messages.
#[must_use]
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks that raw arguments form a mapping.
///
/// # Errors
///
/// Returns [`BindError::InvalidArgumentsKind`] when `raw` is not a JSON object.
pub fn ensure_mapping<'a>(tool: &str, raw: &'a Value) -> Result<&'a Map<String, Value>, BindError> {
    raw.as_object().ok_or_else(|| BindError::InvalidArgumentsKind {
        tool: tool.to_owned(),
        found: json_kind(raw),
    })
}

/// Keeps only the entries of `raw` whose keys the schema declares.
#[must_use]
pub fn bind_map(raw: &Map<String, Value>, schema: &InputSchema) -> Arguments {
    raw.iter()
        .filter(|(key, _)| schema.declares(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Binds raw caller arguments against a tool's schema.
///
/// # Errors
///
/// Returns [`BindError::InvalidArgumentsKind`] when `raw` is not a JSON object.
/// This check runs before any filtering.
pub fn bind(tool: &str, raw: &Value, schema: &InputSchema) -> Result<Arguments, BindError> {
    let map = ensure_mapping(tool, raw)?;
    Ok(bind_map(map, schema))
}
