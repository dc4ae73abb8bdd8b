//! Azure DevOps MCP Server
//!
//! # Usage
//!
//! ```bash
//! AZURE_DEVOPS_PAT=... ado-mcp [--organization <org>] [--project <project>]
//! ```
//!
//! # Environment Variables
//!
//! - `AZURE_DEVOPS_ORG`, `AZURE_DEVOPS_PROJECT`, `AZURE_DEVOPS_WIKI`
//! - `AZURE_DEVOPS_PAT`: personal access token (required)
//! - `AZURE_DEVOPS_BASE_URL`: service root (default: `https://dev.azure.com`)
//! - `RUST_LOG`: Control log verbosity (default: `ado_mcp=info,ado_telemetry=info`)
//!
//! # Protocol
//!
//! The server communicates via JSON-RPC 2.0 over stdio:
//! - Requests/responses go through stdout
//! - Logs go to stderr (to avoid interfering with the protocol)

use std::sync::Arc;

use ado_core::config::{
    DEFAULT_BASE_URL, DEFAULT_ORGANIZATION, DEFAULT_PROJECT, ENV_BASE_URL, ENV_CREDENTIAL,
    ENV_ORGANIZATION, ENV_PROJECT, ENV_WIKI,
};
use ado_core::{AdoConfig, AdoContext, Executor, ReqwestTransport, TracingSink};
use ado_mcp::{AdoMcpServer, Dispatcher};
use clap::Parser;

/// MCP server for Azure DevOps
#[derive(Parser)]
#[command(name = "ado-mcp")]
#[command(about = "MCP server for Azure DevOps")]
#[command(version)]
struct Args {
    /// Organization name
    #[arg(long, env = ENV_ORGANIZATION, default_value = DEFAULT_ORGANIZATION)]
    organization: String,

    /// Default project for tools that do not name one
    #[arg(long, env = ENV_PROJECT, default_value = DEFAULT_PROJECT)]
    project: String,

    /// Default wiki (defaults to `<project>.wiki`)
    #[arg(long, env = ENV_WIKI)]
    wiki: Option<String>,

    /// Personal access token
    #[arg(long, env = ENV_CREDENTIAL, hide_env_values = true)]
    pat: String,

    /// Service root
    #[arg(long, env = ENV_BASE_URL, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging to stderr (stdout is reserved for MCP protocol)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ado_mcp=info".parse()?)
                .add_directive("ado_telemetry=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AdoConfig::new(args.organization, args.project, args.wiki, args.pat)?
        .with_base_url(args.base_url);

    tracing::info!(
        organization = config.organization(),
        project = config.project(),
        wiki = config.wiki(),
        "Starting ado-mcp server"
    );

    let context = AdoContext::new(config, Arc::new(TracingSink));
    let executor = Executor::new(context, Arc::new(ReqwestTransport::new()));

    AdoMcpServer::new(Dispatcher::new(executor)).run().await?;

    Ok(())
}
