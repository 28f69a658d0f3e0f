//! Invocation pipeline: resolve, bind, invoke, wrap.
//!
//! Every call moves through [`InvocationStage`]s in order:
//! `Received -> Resolved -> Bound -> Invoked -> Succeeded | Failed`, and
//! `Failed` is reachable from each of them. [`Dispatcher::invoke`] always ends
//! in a [`ResponseEnvelope`]; no error, handler panic, or timeout escapes it.
//! A call runs its handler at most once and is never retried.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tool_primitives::ToolDescriptor;
use tool_registry::{Arguments, BindError, ToolHandler, ToolRegistry, bind_map, ensure_mapping};
use tracing::{Instrument, debug, error, info_span, warn};

use crate::envelope::ResponseEnvelope;
use crate::profiles::ClientProfiles;

/// A single call as decoded from the transport.
///
/// Wire shape: `{"tool": "<name>", "arguments": {...}, "client_id": "<id>"}`.
/// A missing `arguments` field means no arguments; `client_id` is optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Name of the tool to invoke.
    pub tool: String,
    /// Raw caller arguments; anything other than a JSON object is rejected.
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
    /// Client whose configured argument profile should be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl InvocationRequest {
    /// Creates a request for `tool` with the given raw arguments.
    #[must_use]
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            client_id: None,
        }
    }

    /// Attaches a client id.
    #[must_use]
    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// Steps of the per-call state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationStage {
    /// Request accepted by the dispatcher.
    Received,
    /// Tool found in the registry.
    Resolved,
    /// Arguments filtered against the schema.
    Bound,
    /// Handler called.
    Invoked,
    /// Handler returned a value.
    Succeeded,
    /// Call ended in an error envelope.
    Failed,
}

impl InvocationStage {
    /// Returns a lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::Bound => "bound",
            Self::Invoked => "invoked",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for InvocationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a call ends in a failure envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Raw arguments were not a JSON object.
    #[error(transparent)]
    InvalidArgumentsKind(#[from] BindError),

    /// No tool is registered under the requested name.
    #[error("unknown tool `{name}`")]
    UnknownTool {
        /// The requested name.
        name: String,
    },

    /// The handler failed, panicked, or exceeded the call timeout.
    ///
    /// Missing required arguments are reported by handlers through this
    /// variant as well. The message is passed to the caller verbatim.
    #[error("{message}")]
    HandlerFault {
        /// Tool whose handler failed.
        tool: String,
        /// Human-readable failure description.
        message: String,
    },
}

impl DispatchError {
    /// Returns the last stage the call reached before failing.
    #[must_use]
    pub const fn stage(&self) -> InvocationStage {
        match self {
            Self::InvalidArgumentsKind(_) | Self::UnknownTool { .. } => InvocationStage::Received,
            Self::HandlerFault { .. } => InvocationStage::Invoked,
        }
    }

    /// Returns `true` when the caller sent a request that can never succeed.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgumentsKind(_) | Self::UnknownTool { .. }
        )
    }
}

/// Single entry point for "invoke tool X with arguments Y".
///
/// The dispatcher holds the immutable registry by `Arc` and keeps no
/// per-request state, so one instance serves any number of concurrent calls
/// without locking.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    profiles: Arc<ClientProfiles>,
    call_timeout: Option<Duration>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tools", &self.registry.len())
            .field("profiles", &self.profiles.len())
            .field("call_timeout", &self.call_timeout)
            .finish()
    }
}

impl Dispatcher {
    /// Creates a dispatcher over a registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            profiles: Arc::new(ClientProfiles::new()),
            call_timeout: None,
        }
    }

    /// Installs per-client argument profiles.
    #[must_use]
    pub fn with_profiles(mut self, profiles: ClientProfiles) -> Self {
        self.profiles = Arc::new(profiles);
        self
    }

    /// Bounds how long a single handler call may run.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Returns the shared registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Lists registered tools in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    /// Invokes `tool` with raw arguments. Shorthand for [`Dispatcher::invoke`].
    pub async fn call(&self, tool: &str, arguments: Value) -> ResponseEnvelope {
        self.invoke(InvocationRequest::new(tool, arguments)).await
    }

    /// Runs one call to completion and wraps the result.
    pub async fn invoke(&self, request: InvocationRequest) -> ResponseEnvelope {
        let span = info_span!(
            "invoke",
            tool = %request.tool,
            client_id = request.client_id.as_deref().unwrap_or("-"),
        );

        async {
            match self.try_invoke(&request).await {
                Ok(value) => {
                    debug!(stage = %InvocationStage::Succeeded, "tool call succeeded");
                    ResponseEnvelope::success(value)
                }
                Err(err) => {
                    if err.is_caller_error() {
                        warn!(stage = %InvocationStage::Failed, failed_after = %err.stage(), error = %err, "tool call rejected");
                    } else {
                        error!(stage = %InvocationStage::Failed, failed_after = %err.stage(), error = %err, "tool call failed");
                    }
                    ResponseEnvelope::failure(err.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Runs one call and returns the handler value or the dispatch error.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidArgumentsKind`] when the arguments are
    /// not an object (checked before lookup), [`DispatchError::UnknownTool`]
    /// when the name is not registered, and [`DispatchError::HandlerFault`]
    /// when the handler fails, panics, or times out.
    pub async fn try_invoke(&self, request: &InvocationRequest) -> Result<Value, DispatchError> {
        debug!(stage = %InvocationStage::Received);
        let raw = ensure_mapping(&request.tool, &request.arguments)?;

        let entry = self
            .registry
            .lookup(&request.tool)
            .ok_or_else(|| DispatchError::UnknownTool {
                name: request.tool.clone(),
            })?;
        debug!(stage = %InvocationStage::Resolved);

        let merged = self.profiles.apply(request.client_id.as_deref(), raw);
        let args = bind_map(&merged, entry.descriptor().input_schema());
        debug!(
            stage = %InvocationStage::Bound,
            supplied = raw.len(),
            bound = args.len(),
        );

        debug!(stage = %InvocationStage::Invoked);
        self.run_handler(&request.tool, entry.handler(), args).await
    }

    async fn run_handler(
        &self,
        tool: &str,
        handler: Arc<dyn ToolHandler>,
        args: Arguments,
    ) -> Result<Value, DispatchError> {
        let call = AssertUnwindSafe(handler.call(args)).catch_unwind();
        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(fault(
                        tool,
                        format!("tool `{tool}` timed out after {}ms", limit.as_millis()),
                    ));
                }
            },
            None => call.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let message = err.to_string();
                if message.trim().is_empty() {
                    Err(fault(tool, format!("tool `{tool}` failed without a message")))
                } else {
                    Err(fault(tool, message))
                }
            }
            Err(payload) => Err(fault(
                tool,
                format!("tool `{tool}` panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn fault(tool: &str, message: String) -> DispatchError {
    DispatchError::HandlerFault {
        tool: tool.to_owned(),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
