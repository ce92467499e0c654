//! JSON-RPC 2.0 framing for the MCP protocol, shared by both
//! transports.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use engram_engine::MemoryEngine;

use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    /// Absent for notifications, which get no response.
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Parse-failure response for a line that was not valid JSON-RPC.
pub fn parse_error() -> RpcResponse {
    RpcResponse::error(Value::Null, -32700, "parse error")
}

/// Handle one request. Returns None for notifications.
pub async fn handle_request(engine: &MemoryEngine, request: RpcRequest) -> Option<RpcResponse> {
    let id = request.id.clone()?;
    let response = match request.method.as_str() {
        "initialize" => RpcResponse::result(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "engram",
                    "version": engram_core::constants::VERSION,
                },
            }),
        ),
        "ping" => RpcResponse::result(id, json!({})),
        "tools/list" => RpcResponse::result(id, json!({ "tools": tools::tool_definitions() })),
        "tools/call" => {
            let name = request
                .params
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let empty = json!({});
            let args = request.params.get("arguments").unwrap_or(&empty);

            let cancel = CancellationToken::new();
            let outcome = tools::call_tool(engine, name, args, &cancel).await;
            tracing::debug!(tool = name, is_error = outcome.is_error, "tool call complete");

            RpcResponse::result(
                id,
                json!({
                    "content": [{ "type": "text", "text": outcome.text }],
                    "details": outcome.details,
                    "isError": outcome.is_error,
                }),
            )
        }
        other => RpcResponse::error(id, -32601, format!("method not found: {other}")),
    };
    Some(response)
}
