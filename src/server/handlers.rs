use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::SharedState;
use crate::case::{catalog, CaseInfo, DeductionSubmission, Suspect};
use crate::error::{McpError, McpResult};
use crate::game::GamePhase;
use crate::investigation::ImageUpload;

/// Filename used when a caller does not send one.
const DEFAULT_UPLOAD_NAME: &str = "upload";

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Analysis
        "clue_analyze" => handle_clue_analyze(state, arguments).await,
        "clue_catalog" => handle_clue_catalog(),
        "case_overview" => handle_case_overview(state),
        // History
        "history_list" => handle_history_list(state, arguments).await,
        "history_delete" => handle_history_delete(state, arguments).await,
        "history_clear" => handle_history_clear(state).await,
        "history_stats" => to_value(state.investigation.history().stats().await),
        "history_usage" => to_value(state.investigation.history().usage().await),
        // Game
        "game_state" => to_value(state.investigation.snapshot().await),
        "game_set_phase" => handle_game_set_phase(state, arguments).await,
        "game_reveal_hint" => handle_game_reveal_hint(state, arguments).await,
        "deduction_submit" => handle_deduction_submit(state, arguments).await,
        "game_restart" => handle_game_restart(state).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Arguments for `clue_analyze`.
#[derive(Debug, Deserialize)]
pub struct AnalyzeParams {
    pub image_base64: String,
    pub mime_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

async fn handle_clue_analyze(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: AnalyzeParams = parse_arguments("clue_analyze", arguments)?;

    let bytes = BASE64_STANDARD
        .decode(params.image_base64.trim())
        .map_err(|e| McpError::InvalidParameters {
            tool_name: "clue_analyze".to_string(),
            message: format!("image_base64 is not valid base64: {}", e),
        })?;

    let upload = ImageUpload::new(
        params
            .file_name
            .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string()),
        params.mime_type,
        bytes,
    );

    to_value(state.investigation.analyze(upload).await)
}

fn handle_clue_catalog() -> McpResult<Value> {
    to_value(catalog::all())
}

/// Hint as listed before it is revealed.
#[derive(Debug, Serialize)]
pub struct HintSummary {
    pub id: String,
    pub title: String,
    pub cost: u32,
}

/// Response for `case_overview`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOverview {
    pub id: String,
    pub info: CaseInfo,
    pub suspects: Vec<Suspect>,
    pub hints: Vec<HintSummary>,
}

fn handle_case_overview(state: &SharedState) -> McpResult<Value> {
    let case = state.investigation.case();

    to_value(CaseOverview {
        id: case.id.clone(),
        info: case.info.clone(),
        suspects: case.suspects.clone(),
        hints: case
            .hints
            .iter()
            .map(|h| HintSummary {
                id: h.id.clone(),
                title: h.title.clone(),
                cost: h.cost,
            })
            .collect(),
    })
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct HistoryListParams {
    #[serde(default)]
    important_only: bool,
}

async fn handle_history_list(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    let params: HistoryListParams = parse_optional_arguments("history_list", arguments)?;
    let history = state.investigation.history();

    let results = if params.important_only {
        history.filter_important().await
    } else {
        history.list().await
    };

    to_value(results)
}

async fn handle_history_delete(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct DeleteParams {
        id: String,
    }

    let params: DeleteParams = parse_arguments("history_delete", arguments)?;
    let deleted = state.investigation.history().delete(&params.id).await?;

    Ok(serde_json::json!({ "id": params.id, "deleted": deleted }))
}

async fn handle_history_clear(state: &SharedState) -> McpResult<Value> {
    state.investigation.history().clear().await?;
    Ok(serde_json::json!({ "cleared": true }))
}

// ============================================================================
// Game
// ============================================================================

async fn handle_game_set_phase(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct PhaseParams {
        phase: GamePhase,
    }

    let params: PhaseParams = parse_arguments("game_set_phase", arguments)?;
    to_value(state.investigation.game().set_phase(params.phase).await)
}

async fn handle_game_reveal_hint(
    state: &SharedState,
    arguments: Option<Value>,
) -> McpResult<Value> {
    #[derive(Deserialize)]
    struct HintParams {
        hint_id: String,
    }

    let params: HintParams = parse_arguments("game_reveal_hint", arguments)?;
    let reveal = state.investigation.reveal_hint(&params.hint_id).await?;
    to_value(reveal)
}

async fn handle_deduction_submit(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    execute_handler(
        "deduction_submit",
        arguments,
        |submission: DeductionSubmission| state.investigation.submit_deduction(submission),
    )
    .await
}

async fn handle_game_restart(state: &SharedState) -> McpResult<Value> {
    state.investigation.restart().await?;
    to_value(state.investigation.snapshot().await)
}

// ============================================================================
// Helper functions
// ============================================================================

/// Helper to parse arguments with consistent error handling
fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        Some(args) => serde_json::from_value(args).map_err(|e| McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: e.to_string(),
        }),
        None => Err(McpError::InvalidParameters {
            tool_name: tool_name.to_string(),
            message: "Missing arguments".to_string(),
        }),
    }
}

/// Like [`parse_arguments`], but absent arguments mean all defaults.
fn parse_optional_arguments<T: serde::de::DeserializeOwned + Default>(
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<T> {
    match arguments {
        None | Some(Value::Null) => Ok(T::default()),
        args => parse_arguments(tool_name, args),
    }
}

/// Parse arguments, run the operation and serialize its result.
async fn execute_handler<P, R, E, F, Fut>(
    tool_name: &str,
    arguments: Option<Value>,
    operation: F,
) -> McpResult<Value>
where
    P: serde::de::DeserializeOwned,
    R: Serialize,
    E: std::fmt::Display,
    F: FnOnce(P) -> Fut,
    Fut: std::future::Future<Output = Result<R, E>>,
{
    let params: P = parse_arguments(tool_name, arguments)?;

    let result = operation(params)
        .await
        .map_err(|e| McpError::ExecutionFailed {
            message: e.to_string(),
        })?;

    to_value(result)
}

fn to_value<T: Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value).map_err(McpError::Json)
}
