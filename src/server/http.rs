//! HTTP transport: the photo analysis endpoint used by browser clients.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::SharedState;
use crate::investigation::{AnalyzeErrorKind, AnalyzeOutcome, ImageUpload};

/// Multipart field carrying the photo.
pub const IMAGE_FIELD: &str = "image";

/// Room for multipart boundaries and part headers on top of the image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router.
pub fn router(state: SharedState) -> Router {
    let body_limit = state
        .investigation
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `addr` until the process exits.
pub async fn run(addr: &str, state: SharedState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router(state)).await
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "case": state.investigation.case().id,
    }))
}

async fn analyze(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> (StatusCode, Json<AnalyzeOutcome>) {
    let outcome = match read_upload(multipart).await {
        Ok(upload) => state.investigation.analyze(upload).await,
        Err(message) => {
            warn!(error = %message, "Unreadable upload");
            AnalyzeOutcome::error(AnalyzeErrorKind::InvalidInput, message)
        }
    };

    let status = match &outcome {
        AnalyzeOutcome::Error {
            kind: AnalyzeErrorKind::InvalidInput,
            ..
        } => StatusCode::BAD_REQUEST,
        AnalyzeOutcome::Error {
            kind: AnalyzeErrorKind::Storage,
            ..
        } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };

    (status, Json(outcome))
}

/// Pull the image part out of the form.
async fn read_upload(mut multipart: Multipart) -> Result<ImageUpload, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read upload: {}", e))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {}", e))?;

        return Ok(ImageUpload::new(file_name, mime_type, bytes.to_vec()));
    }

    Err("No image uploaded".to_string())
}
