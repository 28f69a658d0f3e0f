//! Uniform success/error wrapper returned for every invocation.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

const UNSPECIFIED_FAILURE: &str = "unspecified failure";

/// Result of one tool invocation before it is wrapped.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Handler returned a value.
    Success(Value),
    /// Invocation failed with a human-readable message.
    Failure(String),
}

/// Response returned to the caller regardless of which tool ran.
///
/// Exactly one of `data` and `error` is present, and `status` is `true` iff
/// `data` is present. The fields are private so the invariant can only be
/// established through [`ResponseEnvelope::success`],
/// [`ResponseEnvelope::failure`], or the `From<Outcome>` conversion, and
/// deserialization rejects envelopes that violate it.
///
/// Wire shape: `{"data": <value>|null, "error": <string>|null, "status": <bool>}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEnvelope")]
pub struct ResponseEnvelope {
    data: Option<Value>,
    error: Option<String>,
    status: bool,
}

impl ResponseEnvelope {
    /// Wraps a successful handler result.
    ///
    /// JSON `null` is replaced by an empty object so that `data` is never
    /// `null` on the wire for a successful call.
    #[must_use]
    pub fn success(value: Value) -> Self {
        let data = if value.is_null() {
            Value::Object(Map::new())
        } else {
            value
        };
        Self {
            data: Some(data),
            error: None,
            status: true,
        }
    }

    /// Wraps a failure message. A blank message is replaced by a generic one.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            UNSPECIFIED_FAILURE.to_owned()
        } else {
            message
        };
        Self {
            data: None,
            error: Some(message),
            status: false,
        }
    }

    /// Wraps any result whose error renders as a message.
    #[must_use]
    pub fn from_result<E: Display>(result: Result<Value, E>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(err) => Self::failure(err.to_string()),
        }
    }

    /// Returns the success payload.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Returns the failure message.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Returns `true` for a successful invocation.
    #[must_use]
    pub const fn status(&self) -> bool {
        self.status
    }

    /// Converts the envelope back into a plain result.
    ///
    /// # Errors
    ///
    /// Returns the failure message for an unsuccessful envelope.
    pub fn into_result(self) -> Result<Value, String> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(UNSPECIFIED_FAILURE.to_owned()),
        }
    }
}

impl From<Outcome> for ResponseEnvelope {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Success(value) => Self::success(value),
            Outcome::Failure(message) => Self::failure(message),
        }
    }
}

/// Error returned when decoding an envelope whose fields disagree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("envelope fields are inconsistent: {reason}")]
pub struct EnvelopeError {
    reason: &'static str,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    status: bool,
}

impl TryFrom<RawEnvelope> for ResponseEnvelope {
    type Error = EnvelopeError;

    fn try_from(raw: RawEnvelope) -> Result<Self, Self::Error> {
        match (raw.data, raw.error, raw.status) {
            (Some(data), None, true) => Ok(Self::success(data)),
            (None, Some(error), false) if !error.trim().is_empty() => Ok(Self::failure(error)),
            (None, Some(_), false) => Err(EnvelopeError {
                reason: "error message is blank",
            }),
            (Some(_), Some(_), _) => Err(EnvelopeError {
                reason: "both data and error are present",
            }),
            (None, None, _) => Err(EnvelopeError {
                reason: "neither data nor error is present",
            }),
            (Some(_), None, false) | (None, Some(_), true) => Err(EnvelopeError {
                reason: "status disagrees with data/error presence",
            }),
        }
    }
}
