//! Unit tests for MCP protocol implementation.
//!
//! Tests JSON-RPC 2.0 request/response handling, tool definitions
//! and tool routing over an in-memory backend.

use std::sync::Arc;

use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::case::CaseBook;
use crate::config::Config;
use crate::server::AppState;
use crate::storage::MemoryStorage;

fn create_server() -> McpServer {
    let case = CaseBook::new().get("painter-studio").unwrap().clone();
    let state = AppState::new(
        Config::default(),
        Arc::new(MemoryStorage::default()),
        case,
        None,
    );
    McpServer::new(Arc::new(state))
}

fn request(id: Option<Value>, method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        id,
        method: method.to_string(),
        params,
    }
}

/// Call a tool and return the parsed text payload and the error flag.
async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> (Value, bool) {
    let response = server
        .handle_request(request(
            Some(json!(1)),
            "tools/call",
            Some(json!({"name": name, "arguments": arguments})),
        ))
        .await
        .unwrap();

    let result = response.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap().to_string();
    let is_error = result["isError"].as_bool().unwrap_or(false);

    if is_error {
        (Value::String(text), true)
    } else {
        (serde_json::from_str(&text).unwrap(), false)
    }
}

// ============================================================================
// JsonRpcResponse tests
// ============================================================================

#[test]
fn test_jsonrpc_response_success_with_id() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({"result": "ok"}));

    assert_eq!(response.jsonrpc, "2.0");
    assert_eq!(response.id, json!(1));
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["result"], "ok");
}

#[test]
fn test_jsonrpc_response_error_without_id() {
    let response = JsonRpcResponse::error(None, -32700, "Parse error");

    assert_eq!(response.id, Value::Null);
    assert!(response.result.is_none());
    assert_eq!(response.error.unwrap().code, -32700);
}

#[test]
fn test_jsonrpc_response_serialization_omits_empty_fields() {
    let ok = serde_json::to_string(&JsonRpcResponse::success(Some(json!(1)), json!({}))).unwrap();
    assert!(ok.contains("\"result\""));
    assert!(!ok.contains("\"error\""));

    let err =
        serde_json::to_string(&JsonRpcResponse::error(Some(json!(1)), -32601, "nope")).unwrap();
    assert!(err.contains("-32601"));
    assert!(!err.contains("\"result\""));
}

#[test]
fn test_jsonrpc_notification_has_no_id() {
    let request: JsonRpcRequest =
        serde_json::from_str(r#"{"jsonrpc":"2.0","method":"initialized"}"#).unwrap();

    assert!(request.id.is_none());
    assert!(request.params.is_none());
}

// ============================================================================
// Tool definitions
// ============================================================================

#[test]
fn test_tool_definitions_are_unique_objects() {
    let tools = tool_definitions();
    let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();

    assert_eq!(tools.len(), 13);
    for tool in &tools {
        assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
        assert!(!tool.description.is_empty());
    }

    names.sort();
    names.dedup();
    assert_eq!(names.len(), 13);
}

#[test]
fn test_tool_serialization_uses_input_schema_key() {
    let value = serde_json::to_value(&tool_definitions()[0]).unwrap();

    assert_eq!(value["name"], "clue_analyze");
    assert!(value.get("inputSchema").is_some());
    assert_eq!(value["inputSchema"]["required"], json!(["image_base64", "mime_type"]));
}

// ============================================================================
// Request handling
// ============================================================================

#[tokio::test]
async fn test_initialize() {
    let server = create_server();

    let response = server
        .handle_request(request(Some(json!(1)), "initialize", Some(json!({}))))
        .await
        .unwrap();

    let result = response.result.unwrap();
    assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(result["serverInfo"]["name"], "clue-investigator");
    assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let server = create_server();

    assert!(server
        .handle_request(request(None, "initialized", None))
        .await
        .is_none());
    assert!(server
        .handle_request(request(None, "notifications/whatever", None))
        .await
        .is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let server = create_server();

    let response = server
        .handle_request(request(Some(json!(7)), "resources/list", None))
        .await
        .unwrap();

    assert_eq!(response.error.unwrap().code, -32601);
}

#[tokio::test]
async fn test_tool_call_without_params() {
    let server = create_server();

    let response = server
        .handle_request(request(Some(json!(1)), "tools/call", None))
        .await
        .unwrap();

    assert_eq!(response.error.unwrap().code, -32602);
}

#[tokio::test]
async fn test_unknown_tool_is_error_result() {
    let server = create_server();

    let (text, is_error) = call_tool(&server, "clue_delete", json!({})).await;

    assert!(is_error);
    assert_eq!(text, json!("Error: Unknown tool: clue_delete"));
}

// ============================================================================
// Tool routing
// ============================================================================

#[tokio::test]
async fn test_clue_analyze_then_history() {
    let server = create_server();
    let image = base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF]);

    let (outcome, is_error) = call_tool(
        &server,
        "clue_analyze",
        json!({"image_base64": image, "mime_type": "image/jpeg", "file_name": "clue2.jpg"}),
    )
    .await;

    assert!(!is_error);
    assert_eq!(outcome["status"], "ok");
    assert_eq!(outcome["clueId"], "CLUE_02");

    let (history, _) = call_tool(&server, "history_list", json!({})).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], outcome["result"]["id"]);

    let (stats, _) = call_tool(&server, "history_stats", Value::Null).await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["clue02Count"], 1);
}

#[tokio::test]
async fn test_clue_analyze_rejects_bad_base64() {
    let server = create_server();

    let (text, is_error) = call_tool(
        &server,
        "clue_analyze",
        json!({"image_base64": "%%%", "mime_type": "image/jpeg"}),
    )
    .await;

    assert!(is_error);
    assert!(text.as_str().unwrap().contains("not valid base64"));
}

#[tokio::test]
async fn test_clue_analyze_invalid_input_outcome() {
    let server = create_server();

    let (outcome, is_error) = call_tool(
        &server,
        "clue_analyze",
        json!({"image_base64": "AAAA", "mime_type": "text/plain", "file_name": "clue1.txt"}),
    )
    .await;

    assert!(!is_error);
    assert_eq!(outcome["status"], "error");
    assert_eq!(outcome["kind"], "invalid_input");
    assert_eq!(outcome["clueId"], "CLUE_NONE");
}

#[tokio::test]
async fn test_history_delete_unknown_id() {
    let server = create_server();

    let (result, is_error) = call_tool(&server, "history_delete", json!({"id": "missing"})).await;

    assert!(!is_error);
    assert_eq!(result, json!({"id": "missing", "deleted": false}));
}

#[tokio::test]
async fn test_history_delete_requires_id() {
    let server = create_server();

    let (text, is_error) = call_tool(&server, "history_delete", json!({})).await;

    assert!(is_error);
    assert!(text.as_str().unwrap().contains("history_delete"));
}

#[tokio::test]
async fn test_catalog_and_overview() {
    let server = create_server();

    let (catalog, _) = call_tool(&server, "clue_catalog", Value::Null).await;
    assert_eq!(catalog.as_array().unwrap().len(), 4);
    assert_eq!(catalog[3]["id"], "CLUE_NONE");

    let (overview, _) = call_tool(&server, "case_overview", Value::Null).await;
    assert_eq!(overview["id"], "painter-studio");
    assert_eq!(overview["suspects"].as_array().unwrap().len(), 3);
    assert!(overview["hints"][0].get("content").is_none());
}

#[tokio::test]
async fn test_game_flow() {
    let server = create_server();

    let (state, _) = call_tool(&server, "game_set_phase", json!({"phase": "investigation"})).await;
    assert_eq!(state["phase"], "investigation");

    let image = base64::engine::general_purpose::STANDARD.encode([0xFF, 0xD8, 0xFF]);
    for name in ["clue1.jpg", "clue2.jpg"] {
        let (outcome, _) = call_tool(
            &server,
            "clue_analyze",
            json!({"image_base64": image, "mime_type": "image/jpeg", "file_name": name}),
        )
        .await;
        assert_eq!(outcome["status"], "ok");
    }

    let (reveal, _) = call_tool(&server, "game_reveal_hint", json!({"hint_id": "hint_2"})).await;
    assert_eq!(reveal["hint"]["id"], "hint_2");
    assert_eq!(reveal["hintsUsed"], 1);

    let (state, is_error) = call_tool(
        &server,
        "deduction_submit",
        json!({"culprit": "suspect_a", "motive": "jealousy", "evidence": ["CLUE_01", "CLUE_02"]}),
    )
    .await;
    assert!(!is_error);
    assert_eq!(state["phase"], "completed");
    assert_eq!(state["deductionResult"]["isCorrect"], true);

    let (snapshot, _) = call_tool(&server, "game_restart", Value::Null).await;
    assert_eq!(snapshot["state"]["phase"], "tutorial");
    assert_eq!(snapshot["state"]["hintsUsed"], 0);
}

#[tokio::test]
async fn test_game_set_phase_rejects_unknown_phase() {
    let server = create_server();

    let (_, is_error) = call_tool(&server, "game_set_phase", json!({"phase": "epilogue"})).await;

    assert!(is_error);
}

#[tokio::test]
async fn test_deduction_submit_undiscovered_evidence() {
    let server = create_server();

    let (text, is_error) = call_tool(
        &server,
        "deduction_submit",
        json!({"culprit": "suspect_a", "motive": "jealousy", "evidence": ["CLUE_01", "CLUE_02"]}),
    )
    .await;

    assert!(is_error);
    assert!(text.as_str().unwrap().contains("evidence"));

    let (state, _) = call_tool(&server, "game_state", Value::Null).await;
    assert_eq!(state["state"]["deductionSubmitted"], false);
}

#[tokio::test]
async fn test_deduction_submit_empty_culprit() {
    let server = create_server();

    let (text, is_error) = call_tool(
        &server,
        "deduction_submit",
        json!({"culprit": "", "motive": "jealousy"}),
    )
    .await;

    assert!(is_error);
    assert!(text.as_str().unwrap().contains("culprit"));
}

// ============================================================================
// Stream framing
// ============================================================================

#[tokio::test]
async fn test_serve_writes_one_line_per_request() {
    let server = create_server();
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"initialized"}"#,
        "\n\n",
        "not json\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
        "\n",
    );
    let mut output = Vec::new();

    server
        .serve(tokio::io::BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[2]["result"]["tools"].as_array().unwrap().len(), 13);
}
