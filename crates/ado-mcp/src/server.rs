//! MCP Server implementation
//!
//! Reads newline-delimited JSON-RPC messages from stdin and writes responses
//! to stdout. Each message is handled on its own task so a slow upstream call
//! does not hold up the next request; a single writer task owns stdout.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::handlers::Dispatcher;
use crate::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolsCapability,
};
use crate::tools::{ToolDefinition, ToolResult, get_tool_definitions};
use crate::{Error, Result};

/// MCP Server for Azure DevOps
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use ado_core::{AdoConfig, AdoContext, Executor, ReqwestTransport, TracingSink};
/// use ado_mcp::{AdoMcpServer, Dispatcher};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let context = AdoContext::new(AdoConfig::from_env()?, Arc::new(TracingSink));
///     let executor = Executor::new(context, Arc::new(ReqwestTransport::new()));
///     AdoMcpServer::new(Dispatcher::new(executor)).run().await?;
///     Ok(())
/// }
/// ```
pub struct AdoMcpServer {
    dispatcher: Dispatcher,

    /// Available MCP tools
    tools: Vec<ToolDefinition>,
}

impl AdoMcpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            tools: get_tool_definitions(),
        }
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Run the MCP server over stdio until stdin closes.
    pub async fn run(self) -> Result<()> {
        let server = Arc::new(self);
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(line) = rx.recv().await {
                stdout.write_all(line.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        });

        tracing::info!(tools = server.tools.len(), "MCP server ready, listening on stdio");

        let mut reader = BufReader::new(tokio::io::stdin());
        let mut read_error = None;
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    read_error = Some(e);
                    break;
                }
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            tracing::debug!(request = %String::from_utf8_lossy(&line), "Received message");

            let server = Arc::clone(&server);
            let tx = tx.clone();
            tokio::spawn(async move {
                let response = match server.handle_bytes(&line).await {
                    Ok(response) => response,
                    Err(e) => internal_error_line(&e),
                };
                if !response.is_empty() && tx.send(response).is_err() {
                    tracing::warn!("stdout writer closed, dropping response");
                }
            });
        }

        tracing::info!("stdin closed, waiting for in-flight calls");

        // The writer drains until every in-flight task has dropped its sender.
        drop(tx);
        writer.await.map_err(std::io::Error::other)??;
        match read_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Handle one raw stdin line. A line that is not UTF-8 gets a parse error.
    pub async fn handle_bytes(&self, message: &[u8]) -> Result<String> {
        match std::str::from_utf8(message) {
            Ok(text) => self.handle_message(text).await,
            Err(e) => {
                tracing::warn!(error = %e, "Message is not valid UTF-8");
                parse_error(format!("Parse error: {e}"))
            }
        }
    }

    /// Handle a single MCP message
    ///
    /// Returns the serialized response, or an empty string for notifications.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable message");
                return parse_error(format!("Parse error: {e}"));
            }
        };

        // Well-formed JSON that is not a request object
        let id = value.get("id").cloned().filter(|id| !id.is_null());
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let response = JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {e}"));
                return serde_json::to_string(&response).map_err(Error::from);
            }
        };

        if request.jsonrpc != "2.0" {
            let response = JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version: {}", request.jsonrpc),
            );
            return serde_json::to_string(&response).map_err(Error::from);
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id)?,
            "initialized" | "notifications/initialized" => return Ok(String::new()),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id)?,
            "tools/call" => self.handle_tools_call(request.id, request.params).await?,
            _ if request.id.is_none() => {
                tracing::debug!(method = %request.method, "Ignoring notification");
                return Ok(String::new());
            }
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        serde_json::to_string(&response).map_err(Error::from)
    }

    fn handle_initialize(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: "ado-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> Result<JsonRpcResponse> {
        Ok(JsonRpcResponse::success(
            id,
            json!({ "tools": serde_json::to_value(&self.tools)? }),
        ))
    }

    /// Execute the requested tool. Failures become JSON-RPC errors whose
    /// `data` member is the classified diagnosis.
    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let call: ToolCallParams = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {e}"),
                ));
            }
        };

        match self.dispatcher.dispatch(&call.name, call.arguments).await {
            Ok(result) => {
                let tool_result = ToolResult::text(serde_json::to_string_pretty(&result)?);
                Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
            }
            Err(e) => {
                let e = Error::from(e);
                Ok(JsonRpcResponse::error_with_data(
                    id,
                    e.code(),
                    e.diagnosis().to_string(),
                    e.data(),
                ))
            }
        }
    }
}

fn parse_error(message: String) -> Result<String> {
    let response = JsonRpcResponse::error(None, PARSE_ERROR, message);
    serde_json::to_string(&response).map_err(Error::from)
}

fn internal_error_line(error: &Error) -> String {
    let response = JsonRpcResponse::error_with_data(
        None,
        error.code(),
        format!("Internal error: {error}"),
        error.data(),
    );
    serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#.to_string()
    })
}
