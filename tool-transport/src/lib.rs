//! Transports that expose a [`ToolServer`](tool_kernel::ToolServer) to callers.
//!
//! - [`stdio`]: newline-delimited JSON frames over any async byte stream.
//! - [`http`]: an `axum` router with discovery and invocation routes.
//!
//! Both speak the same envelope and leave all tool semantics to the kernel.

#![warn(missing_docs, clippy::pedantic)]

pub mod http;
pub mod stdio;

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors that end a transport session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Reading from or writing to the stream failed.
    #[error("transport i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The HTTP listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested listen address.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The reply writer stopped before the session finished.
    #[error("reply writer terminated unexpectedly")]
    WriterGone,
}

/// Result alias for transport operations.
pub type Result<T, E = TransportError> = std::result::Result<T, E>;
