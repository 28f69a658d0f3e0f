//! Tool registration, argument binding, and the handler contract.
//!
//! The registry maps tool names to descriptors and handlers, the binder filters
//! caller-supplied arguments down to the fields a tool declares, and
//! [`Arguments`](arguments::Arguments) gives handlers explicit, defaulting
//! accessors over the bound values.

#![warn(missing_docs, clippy::pedantic)]

pub mod arguments;
pub mod binder;
pub mod registry;

pub use arguments::Arguments;
pub use binder::{BindError, bind, bind_map, ensure_mapping, json_kind};
pub use registry::{
    Registration, ToolBinding, ToolEntry, ToolError, ToolFuture, ToolHandler, ToolRegistry,
    ToolResult,
};
