//! Schema-described tool invocation server.
//!
//! This crate bundles the workspace crates behind feature flags. Register
//! handlers in a [`registry::ToolRegistry`], wrap it in a
//! [`kernel::ToolServer`], and expose it through a [`transport`].

#![warn(missing_docs, clippy::pedantic)]

/// Tool names, schemas, and descriptors.
pub use tool_primitives as primitives;

/// Tool registry, handler trait, and argument binding (enabled by `registry` feature).
#[cfg(feature = "registry")]
pub use tool_registry as registry;

/// Dispatcher, envelope, and scheduler (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use tool_kernel as kernel;

/// Layered configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use tool_config as config;

/// Tracing subscriber setup (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use tool_telemetry as telemetry;

/// Stdio and HTTP transports (enabled by `transport` feature).
#[cfg(feature = "transport")]
pub use tool_transport as transport;

#[cfg(all(feature = "kernel", feature = "config"))]
mod wiring;

#[cfg(all(feature = "kernel", feature = "config"))]
pub use wiring::server_from_config;
