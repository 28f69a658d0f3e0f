//! Demo tool server backed by an in-memory network inventory.
//!
//! ```text
//! infra-demo serve                       # stdio, newline-delimited JSON
//! infra-demo serve --transport http      # HTTP on transport.bind
//! infra-demo list
//! infra-demo call create_vpc '{"cidr": "10.1.0.0/16"}'
//! ```

mod inventory;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use toolhost::config::{ConfigLoader, ServerConfig, TransportMode};
use toolhost::kernel::{InvocationRequest, ToolServer};
use toolhost::transport::{http, stdio};
use tracing::info;

use crate::inventory::Inventory;

#[derive(Parser)]
#[command(name = "infra-demo")]
#[command(about = "Serve an in-memory network inventory as schema-described tools")]
struct Cli {
    /// Config file merged over ./toolhost.toml
    #[arg(short, long, global = true, env = "TOOLHOST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve tools until input ends (stdio) or Ctrl-C (http)
    Serve {
        /// Overrides transport.mode
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,

        /// Overrides transport.bind
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Print the tool catalog as JSON
    List,
    /// Invoke one tool and print its envelope
    Call {
        /// Tool name
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        arguments: String,

        /// Client id whose configured profile applies
        #[arg(long)]
        client: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    Stdio,
    Http,
}

impl From<TransportArg> for TransportMode {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Stdio => Self::Stdio,
            TransportArg::Http => Self::Http,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let mut config = loader.load().context("loading configuration")?;
    toolhost::telemetry::init_tracing(&config.logging)?;

    let registry =
        inventory::registry(&Inventory::default()).context("building the inventory catalog")?;

    match cli.command {
        Commands::Serve { transport, bind } => {
            if let Some(transport) = transport {
                config.transport.mode = transport.into();
            }
            if let Some(bind) = bind {
                config.transport.bind = bind;
            }
            let server = toolhost::server_from_config(registry, &config)?;
            serve(server, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::List => {
            let server = toolhost::server_from_config(registry, &config)?;
            println!("{}", serde_json::to_string_pretty(&server.descriptors())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call {
            tool,
            arguments,
            client,
        } => {
            let arguments: Value =
                serde_json::from_str(&arguments).context("arguments must be valid JSON")?;
            let mut request = InvocationRequest::new(tool, arguments);
            if let Some(client) = client {
                request = request.with_client(client);
            }

            let server = toolhost::server_from_config(registry, &config)?;
            let envelope = server.invoke(request).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(if envelope.status() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

async fn serve(server: ToolServer, config: &ServerConfig) -> Result<()> {
    match config.transport.mode {
        TransportMode::Stdio => {
            info!(server = %config.server.name, "serving over stdio");
            stdio::serve_stdio(server).await?;
        }
        TransportMode::Http => {
            http::serve_http(server, config.transport.bind, http::ctrl_c()).await?;
        }
    }
    Ok(())
}
