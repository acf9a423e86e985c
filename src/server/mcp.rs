//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Stdio-based server communication

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// MCP protocol revision spoken by this server.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier; null when the request id could not be read.
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: Capabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
pub struct McpServer {
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server on stdin/stdout until EOF.
    pub async fn run(&self) -> std::io::Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serve newline-delimited JSON-RPC frames from `reader`, writing
    /// responses to `writer`.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Clue Investigator MCP server starting...");

        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Notifications get no response
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request. Returns None for notifications.
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" | "notifications/initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "clue-investigator".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "tools": tool_definitions()
            }),
        )
    }

    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => (
                    ToolResultContent {
                        content_type: "text".to_string(),
                        text: format!("Error: {}", e),
                    },
                    Some(true),
                ),
            };

        let tool_result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(tool_result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool call result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }
}

/// Every tool advertised by `tools/list`.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        // Analysis
        get_clue_analyze_tool(),
        get_clue_catalog_tool(),
        get_case_overview_tool(),
        // History
        get_history_list_tool(),
        get_history_delete_tool(),
        get_history_clear_tool(),
        get_history_stats_tool(),
        get_history_usage_tool(),
        // Game
        get_game_state_tool(),
        get_game_set_phase_tool(),
        get_game_reveal_hint_tool(),
        get_deduction_submit_tool(),
        get_game_restart_tool(),
    ]
}

fn no_arguments_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false
    })
}

fn get_clue_analyze_tool() -> Tool {
    Tool {
        name: "clue_analyze".to_string(),
        description: "Analyze a photo of a possible clue. Classifies it against the case's key clues, records the result in the investigation history and returns the clue id with the detective's comment.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "image_base64": {
                    "type": "string",
                    "description": "The photo, base64-encoded (standard alphabet, no data: prefix)"
                },
                "mime_type": {
                    "type": "string",
                    "description": "Image MIME type, e.g. image/jpeg"
                },
                "file_name": {
                    "type": "string",
                    "description": "Original filename. Names containing test, clue or 단서 are classified by filename markers."
                }
            },
            "required": ["image_base64", "mime_type"],
            "additionalProperties": false
        }),
    }
}

fn get_clue_catalog_tool() -> Tool {
    Tool {
        name: "clue_catalog".to_string(),
        description: "List every clue id with its description and the response shown when it is found.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_case_overview_tool() -> Tool {
    Tool {
        name: "case_overview".to_string(),
        description: "Show the active case: crime details, suspects and the hints that can be revealed.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_history_list_tool() -> Tool {
    Tool {
        name: "history_list".to_string(),
        description: "List analysis results, newest first.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "important_only": {
                    "type": "boolean",
                    "description": "Only return results that matched a key clue (default: false)"
                }
            },
            "additionalProperties": false
        }),
    }
}

fn get_history_delete_tool() -> Tool {
    Tool {
        name: "history_delete".to_string(),
        description: "Delete one analysis result by id. Unknown ids are ignored.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "The analysis result id"
                }
            },
            "required": ["id"],
            "additionalProperties": false
        }),
    }
}

fn get_history_clear_tool() -> Tool {
    Tool {
        name: "history_clear".to_string(),
        description: "Delete every analysis result.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_history_stats_tool() -> Tool {
    Tool {
        name: "history_stats".to_string(),
        description: "Count analysis results in total, per key clue and without a clue.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_history_usage_tool() -> Tool {
    Tool {
        name: "history_usage".to_string(),
        description: "Report how much of the storage quota the history occupies.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_game_state_tool() -> Tool {
    Tool {
        name: "game_state".to_string(),
        description: "Show the game phase, minutes played, hints used, discovered clues and the deduction result if one was submitted.".to_string(),
        input_schema: no_arguments_schema(),
    }
}

fn get_game_set_phase_tool() -> Tool {
    Tool {
        name: "game_set_phase".to_string(),
        description: "Move the game to a phase. Entering investigation starts the clock; entering completed stops it.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "phase": {
                    "type": "string",
                    "enum": ["tutorial", "investigation", "deduction", "completed"],
                    "description": "The phase to enter"
                }
            },
            "required": ["phase"],
            "additionalProperties": false
        }),
    }
}

fn get_game_reveal_hint_tool() -> Tool {
    Tool {
        name: "game_reveal_hint".to_string(),
        description: "Reveal one of the case's hints and count it as used.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "hint_id": {
                    "type": "string",
                    "description": "The hint id, as listed by case_overview"
                }
            },
            "required": ["hint_id"],
            "additionalProperties": false
        }),
    }
}

fn get_deduction_submit_tool() -> Tool {
    Tool {
        name: "deduction_submit".to_string(),
        description: "Accuse a suspect. The accusation is graded, stored and the game is completed.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "culprit": {
                    "type": "string",
                    "description": "Suspect id of the accused"
                },
                "motive": {
                    "type": "string",
                    "description": "The motive, in free text"
                },
                "evidence": {
                    "type": "array",
                    "items": {
                        "type": "string",
                        "enum": ["CLUE_01", "CLUE_02", "CLUE_03"]
                    },
                    "description": "Clue ids offered as evidence"
                }
            },
            "required": ["culprit", "motive"],
            "additionalProperties": false
        }),
    }
}

fn get_game_restart_tool() -> Tool {
    Tool {
        name: "game_restart".to_string(),
        description: "Start over: reset the game state and clear the analysis history.".to_string(),
        input_schema: no_arguments_schema(),
    }
}
