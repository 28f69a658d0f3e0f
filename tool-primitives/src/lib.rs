//! Core shared types for tool-invocation servers.

#![warn(missing_docs, clippy::pedantic)]

mod descriptor;
mod error;
mod name;
mod schema;

/// Immutable metadata advertised for every registered tool.
pub use descriptor::ToolDescriptor;
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Validated tool identifier.
pub use name::ToolName;
/// Declared input fields of a tool.
pub use schema::{FieldKind, FieldSpec, InputSchema, InputSchemaBuilder};
