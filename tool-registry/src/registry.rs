//! Runtime registry for tool descriptors and handlers.
//!
//! The registry is populated once at startup and then shared immutably (for
//! example behind an `Arc`), so lookups never take a lock and concurrent
//! invocations need no coordination on it.
//!
//! Registering a name that is already present replaces the earlier entry: last
//! write wins. The replacement is reported as [`Registration::Replaced`] and
//! logged at `warn` level. The replaced tool keeps its original position in
//! [`ToolRegistry::descriptors`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tool_primitives::{InputSchema, ToolDescriptor, ToolName};
use tracing::{info, warn};

use crate::Arguments;

/// Result alias for handler operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Boxed future produced by function-pointer handlers.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolResult<Value>> + Send>>;

/// Trait implemented by tool handlers.
///
/// A handler receives the bound argument bag, performs the tool's work, and
/// returns exactly one JSON value or a [`ToolError`]. Failures must use the
/// `Err` arm; a successful value that merely looks like an error is reported to
/// the caller as a success.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Invokes the tool with the bound arguments.
    async fn call(&self, args: Arguments) -> ToolResult<Value>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Send + Sync + Fn(Arguments) -> Fut,
    Fut: Future<Output = ToolResult<Value>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> ToolResult<Value> {
        (self)(args).await
    }
}

/// Descriptor and handler bundled for registration.
///
/// Handler modules can expose a list of bindings and let the host register
/// them in one pass.
#[derive(Clone)]
pub struct ToolBinding {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

impl ToolBinding {
    /// Creates a binding from a descriptor and a handler.
    #[must_use]
    pub fn new<H>(descriptor: ToolDescriptor, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            descriptor,
            handler: Arc::new(handler),
        }
    }

    /// Creates a binding from a plain function returning a boxed future.
    #[must_use]
    pub fn from_fn(descriptor: ToolDescriptor, executor: fn(Arguments) -> ToolFuture) -> Self {
        Self::new(descriptor, executor)
    }

    /// Returns the descriptor associated with this binding.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for ToolBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolBinding")
            .field("name", self.descriptor.name())
            .finish_non_exhaustive()
    }
}

/// A registered tool: its descriptor and the handler bound to it.
#[derive(Clone)]
pub struct ToolEntry {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

impl ToolEntry {
    /// Returns the descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &ToolName {
        self.descriptor.name()
    }

    /// Returns a shared handle to the handler.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn ToolHandler> {
        Arc::clone(&self.handler)
    }

    /// Executes the handler with already-bound arguments.
    ///
    /// # Errors
    ///
    /// Propagates any [`ToolError`] returned by the handler.
    pub async fn invoke(&self, args: Arguments) -> ToolResult<Value> {
        self.handler.call(args).await
    }
}

impl fmt::Debug for ToolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Outcome of a registration call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Registration {
    /// The name was not registered before.
    Inserted,
    /// An entry with the same name existed and was overwritten.
    Replaced {
        /// Descriptor of the overwritten entry.
        previous: ToolDescriptor,
    },
}

impl Registration {
    /// Returns `true` when an existing entry was overwritten.
    #[must_use]
    pub const fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Registry that stores tools keyed by name, preserving registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<ToolEntry>,
    index: HashMap<ToolName, usize>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.names().collect();
        f.debug_struct("ToolRegistry")
            .field("registered", &names)
            .finish()
    }
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`, overwriting any existing entry.
    pub fn register<H>(
        &mut self,
        name: ToolName,
        handler: H,
        description: impl Into<String>,
        schema: InputSchema,
    ) -> Registration
    where
        H: ToolHandler + 'static,
    {
        let descriptor = ToolDescriptor::new(name, description, schema);
        self.insert(descriptor, Arc::new(handler))
    }

    /// Registers a handler under an existing descriptor.
    pub fn register_descriptor<H>(&mut self, descriptor: ToolDescriptor, handler: H) -> Registration
    where
        H: ToolHandler + 'static,
    {
        self.insert(descriptor, Arc::new(handler))
    }

    /// Registers a prebuilt [`ToolBinding`].
    pub fn register_binding(&mut self, binding: ToolBinding) -> Registration {
        let ToolBinding {
            descriptor,
            handler,
        } = binding;
        self.insert(descriptor, handler)
    }

    /// Registers every binding in order, returning how many replaced an
    /// existing entry.
    pub fn register_all<I>(&mut self, bindings: I) -> usize
    where
        I: IntoIterator<Item = ToolBinding>,
    {
        bindings
            .into_iter()
            .map(|binding| self.register_binding(binding))
            .filter(Registration::is_replaced)
            .count()
    }

    fn insert(&mut self, descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Registration {
        let name = descriptor.name().clone();
        let entry = ToolEntry {
            descriptor,
            handler,
        };

        if let Some(&slot) = self.index.get(&name) {
            let previous = std::mem::replace(&mut self.entries[slot], entry).descriptor;
            warn!(tool = %name, "tool re-registered; previous entry replaced");
            return Registration::Replaced { previous };
        }

        info!(tool = %name, "tool registered");
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
        Registration::Inserted
    }

    /// Returns the entry registered under `name`, or `None` if there is none.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Returns `true` if a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Lists the descriptors of all registered tools in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Iterates over registered entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ToolEntry> {
        self.entries.iter()
    }

    /// Iterates over registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name().as_str())
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Errors raised by tool handlers.
///
/// The `Display` output is what the caller sees in the response envelope, so
/// [`ToolError::Execution`] renders its reason verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// Tool execution failed, typically because a downstream call failed.
    #[error("{reason}")]
    Execution {
        /// Human-readable error returned by the tool implementation.
        reason: String,
    },

    /// A field the handler needs was not supplied.
    #[error("missing required argument `{name}`")]
    MissingArgument {
        /// Name of the absent field.
        name: String,
    },

    /// A supplied field had the wrong shape or value.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending field.
        name: String,
        /// Human-readable reason for rejection.
        reason: String,
    },
}

impl ToolError {
    /// Creates an execution error from the supplied reason.
    #[must_use]
    pub fn execution(reason: impl Into<String>) -> Self {
        Self::Execution {
            reason: reason.into(),
        }
    }

    /// Creates a missing-argument error.
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Creates an invalid-argument error.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn name(raw: &str) -> ToolName {
        ToolName::new(raw).unwrap()
    }

    fn echo_handler() -> impl ToolHandler {
        |args: Arguments| async move { Ok::<_, ToolError>(Value::Object(args.into_map())) }
    }

    #[tokio::test]
    async fn register_and_lookup_tool() {
        let mut registry = ToolRegistry::new();
        let outcome = registry.register(
            name("echo"),
            echo_handler(),
            "Echo incoming payload",
            InputSchema::empty(),
        );
        assert_eq!(outcome, Registration::Inserted);

        let entry = registry.lookup("echo").expect("registered");
        assert_eq!(entry.descriptor().description(), "Echo incoming payload");

        let output = entry.invoke(Arguments::default()).await.unwrap();
        assert_eq!(output, json!({}));
    }

    #[tokio::test]
    async fn register_binding_invokes_executor() {
        let mut registry = ToolRegistry::new();
        let descriptor = ToolDescriptor::new(name("ping"), "Ping", InputSchema::empty());
        let binding = ToolBinding::from_fn(descriptor, |_args: Arguments| -> ToolFuture {
            Box::pin(async move { Ok(json!("pong")) })
        });

        registry.register_binding(binding);

        let output = registry
            .lookup("ping")
            .unwrap()
            .invoke(Arguments::default())
            .await
            .unwrap();
        assert_eq!(output, json!("pong"));
    }

    #[tokio::test]
    async fn duplicate_registration_replaces_entry() {
        let mut registry = ToolRegistry::new();
        registry.register(name("echo"), echo_handler(), "first", InputSchema::empty());
        registry.register(name("other"), echo_handler(), "other", InputSchema::empty());

        let outcome = registry.register(
            name("echo"),
            |_args: Arguments| async move { Ok::<_, ToolError>(json!("second")) },
            "second",
            InputSchema::empty(),
        );

        match outcome {
            Registration::Replaced { previous } => assert_eq!(previous.description(), "first"),
            Registration::Inserted => panic!("expected replacement"),
        }
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["echo", "other"]);

        let entry = registry.lookup("echo").unwrap();
        assert_eq!(entry.descriptor().description(), "second");
        let output = entry.invoke(Arguments::default()).await.unwrap();
        assert_eq!(output, json!("second"));
    }

    #[test]
    fn unknown_tool_lookup_returns_none() {
        let registry = ToolRegistry::new();
        assert!(registry.lookup("missing").is_none());
        assert!(registry.lookup("not a valid name").is_none());
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn descriptors_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        for raw in ["b", "a", "c"] {
            registry.register(name(raw), echo_handler(), raw, InputSchema::empty());
        }

        let listed: Vec<String> = registry
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        assert_eq!(listed, ["b", "a", "c"]);
    }

    #[test]
    fn register_all_counts_replacements() {
        let mut registry = ToolRegistry::new();
        let binding = |description: &str| {
            ToolBinding::new(
                ToolDescriptor::new(name("dup"), description, InputSchema::empty()),
                echo_handler(),
            )
        };

        let replaced = registry.register_all([binding("one"), binding("two"), binding("three")]);
        assert_eq!(replaced, 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn execution_error_renders_verbatim() {
        let err = ToolError::execution("downstream unavailable");
        assert_eq!(err.to_string(), "downstream unavailable");
        assert_eq!(
            ToolError::missing("vpc_id").to_string(),
            "missing required argument `vpc_id`"
        );
    }
}
