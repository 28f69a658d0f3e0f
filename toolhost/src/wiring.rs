use std::sync::Arc;

use tool_config::{ConfigError, ServerConfig};
use tool_kernel::{ClientProfiles, Dispatcher, SchedulerConfig, TaskScheduler, ToolServer};
use tool_registry::ToolRegistry;
use tracing::info;

/// Builds a [`ToolServer`] from a populated registry and loaded configuration.
///
/// Applies the concurrency limit, the optional call timeout, and every client
/// profile from `config.clients`.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the configuration fails validation.
pub fn server_from_config(
    registry: ToolRegistry,
    config: &ServerConfig,
) -> Result<ToolServer, ConfigError> {
    config.validate()?;

    let profiles: ClientProfiles = config
        .clients
        .iter()
        .map(|(client, overlay)| (client.clone(), overlay.clone()))
        .collect();

    let mut dispatcher = Dispatcher::new(Arc::new(registry)).with_profiles(profiles);
    if let Some(timeout) = config.dispatch.call_timeout() {
        dispatcher = dispatcher.with_call_timeout(timeout);
    }

    let limit = config.dispatch.concurrency_limit()?;
    let scheduler = TaskScheduler::new(SchedulerConfig::new(limit));

    info!(
        server = %config.server.name,
        version = %config.server.version,
        tools = dispatcher.registry().len(),
        max_concurrency = limit.get(),
        "tool server ready"
    );
    Ok(ToolServer::new(dispatcher, scheduler))
}
