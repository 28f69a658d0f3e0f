//! Invocation runtime for toolhost.
//!
//! This crate turns a populated [`ToolRegistry`] into a server core: the
//! [`Dispatcher`] resolves, binds, and invokes tools and wraps every outcome in
//! a [`ResponseEnvelope`], while the [`TaskScheduler`] bounds how many calls run
//! at once. Transports sit on top of [`ToolServer`].

#![warn(missing_docs, clippy::pedantic)]

mod dispatch;
mod envelope;
mod profiles;
mod scheduler;

use std::sync::Arc;

use tokio::task::JoinHandle;
use tool_primitives::ToolDescriptor;
use tool_registry::ToolRegistry;

pub use dispatch::{DispatchError, Dispatcher, InvocationRequest, InvocationStage};
pub use envelope::{EnvelopeError, Outcome, ResponseEnvelope};
pub use profiles::ClientProfiles;
pub use scheduler::{SchedulerConfig, SchedulerError, SchedulerResult, TaskScheduler};

/// Dispatcher paired with the scheduler that runs its calls.
///
/// Cloning is cheap; clones share the registry, profiles, and concurrency
/// budget.
#[derive(Debug, Clone)]
pub struct ToolServer {
    dispatcher: Arc<Dispatcher>,
    scheduler: TaskScheduler,
}

impl ToolServer {
    /// Creates a server from a dispatcher and a scheduler.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, scheduler: TaskScheduler) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            scheduler,
        }
    }

    /// Creates a server over a registry with default dispatch settings.
    #[must_use]
    pub fn from_registry(registry: ToolRegistry) -> Self {
        Self::new(Dispatcher::new(Arc::new(registry)), TaskScheduler::default())
    }

    /// Returns the dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Lists registered tools in registration order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.dispatcher.descriptors()
    }

    /// Runs a call on the current task.
    pub async fn invoke(&self, request: InvocationRequest) -> ResponseEnvelope {
        self.dispatcher.invoke(request).await
    }

    /// Runs a call on the scheduler, honoring the concurrency limit.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] once [`ToolServer::shutdown`] has
    /// been called.
    pub fn schedule(
        &self,
        request: InvocationRequest,
    ) -> SchedulerResult<JoinHandle<SchedulerResult<ResponseEnvelope>>> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.scheduler
            .spawn(async move { dispatcher.invoke(request).await })
    }

    /// Stops accepting scheduled calls.
    pub fn shutdown(&self) {
        self.scheduler.close();
    }
}
