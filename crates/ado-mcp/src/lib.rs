//! MCP Server for Azure DevOps
//!
//! This crate exposes Azure DevOps work items, repositories, pull requests,
//! pipelines, releases, test plans and wikis as Model Context Protocol tools.
//!
//! # Architecture
//!
//! ```text
//! [ MCP Client (IDE / agent host) ]
//!        | (JSON-RPC over stdio)
//!        v
//! [ ado-mcp: server -> Dispatcher -> handlers ]
//!        | (ApiRequest)
//!        v
//! [ ado-core: Executor -> Transport ]  --> https://dev.azure.com/<org>/<project>/_apis
//! ```
//!
//! # Tools
//!
//! See [`tools`] for the full catalogue. Every tool accepts an optional
//! `project` argument overriding the configured default project.

pub mod error;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::{Error, Result};
pub use handlers::{Dispatcher, ToolName, ToolRequest};
pub use server::AdoMcpServer;
pub use tools::{ToolContent, ToolDefinition, ToolResult, get_tool_definitions};
