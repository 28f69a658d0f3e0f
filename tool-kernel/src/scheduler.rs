//! Admission control for scheduled tool calls.
//!
//! Every scheduled call holds one permit from a shared pool while its
//! handler runs. Calls beyond the limit are spawned immediately but park
//! until a permit frees up, so the caller gets a handle right away and the
//! ordering of queued calls follows the semaphore's FIFO queue.
//!
//! Closing the scheduler is one-way. New calls are refused at submission,
//! parked calls resolve to [`SchedulerError::Closed`] without running, and
//! calls that already hold a permit run to completion.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

const DEFAULT_MAX_CONCURRENCY: NonZeroUsize = match NonZeroUsize::new(32) {
    Some(limit) => limit,
    None => unreachable!(),
};

/// How many tool calls may run at the same time.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    max_concurrency: NonZeroUsize,
}

impl SchedulerConfig {
    /// Caps concurrently running calls at `max_concurrency`.
    #[must_use]
    pub const fn new(max_concurrency: NonZeroUsize) -> Self {
        Self { max_concurrency }
    }

    /// The permit pool size.
    #[must_use]
    pub const fn max_concurrency(self) -> NonZeroUsize {
        self.max_concurrency
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

/// Runs tool calls on the tokio runtime behind a shared permit pool.
///
/// Clones share the pool, so closing any clone closes all of them.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    permits: Arc<Semaphore>,
    config: SchedulerConfig,
}

impl TaskScheduler {
    /// Creates an open pool sized by `config`.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrency().get())),
            config,
        }
    }

    /// The configuration this pool was built from.
    #[must_use]
    pub const fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Whether [`TaskScheduler::close`] has been called on this pool.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Number of calls currently holding a permit.
    #[must_use]
    pub fn running(&self) -> usize {
        self.config.max_concurrency().get() - self.permits.available_permits()
    }

    /// Refuses further calls and fails every call still parked for a permit.
    pub fn close(&self) {
        self.permits.close();
    }

    /// Spawns `call` once a permit is available.
    ///
    /// The handle resolves to `Err(SchedulerError::Closed)` if the pool is
    /// closed before `call` got a permit; in that case `call` is dropped
    /// without being polled.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Closed`] if the pool is already closed.
    pub fn spawn<F, T>(&self, call: F) -> SchedulerResult<JoinHandle<SchedulerResult<T>>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_closed() {
            return Err(SchedulerError::Closed);
        }

        let permits = Arc::clone(&self.permits);
        Ok(tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| SchedulerError::Closed)?;
            Ok(call.await)
        }))
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

/// Why a call could not be scheduled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// The pool was closed before the call could run.
    #[error("scheduler closed")]
    Closed,
}

/// Result alias for [`SchedulerError`].
pub type SchedulerResult<T> = Result<T, SchedulerError>;
