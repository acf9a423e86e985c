//! Server module: transports over the shared investigation state.
//!
//! This module provides:
//! - MCP server implementation over stdio
//! - Tool call handlers and routing
//! - HTTP routes for photo analysis
//! - Shared application state

mod handlers;
pub mod http;
mod mcp;

pub use handlers::*;
pub use mcp::*;

use std::sync::Arc;

use tracing::info;

use crate::case::CaseDefinition;
use crate::classifier::{Classifier, VisionModel};
use crate::config::Config;
use crate::game::GameStateStore;
use crate::history::HistoryStore;
use crate::investigation::InvestigationService;
use crate::storage::SharedStorage;

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Key-value backend holding the history and game-state slots.
    pub storage: SharedStorage,
    /// Game operations for the active case.
    pub investigation: InvestigationService,
}

impl AppState {
    /// Create new application state.
    ///
    /// `model` is `None` when no credential is configured; classification then
    /// runs on filenames only.
    pub fn new(
        config: Config,
        storage: SharedStorage,
        case: CaseDefinition,
        model: Option<Arc<dyn VisionModel>>,
    ) -> Self {
        info!(
            case = %case.id,
            model_configured = model.is_some(),
            max_history = config.storage.max_history,
            "AppState initializing"
        );

        let classifier = Classifier::new(model, &case);
        let history = HistoryStore::new(storage.clone(), config.storage.max_history);
        let game = GameStateStore::new(storage.clone());
        let investigation = InvestigationService::new(
            case,
            classifier,
            history,
            game,
            config.game.max_upload_bytes,
        );

        Self {
            config,
            storage,
            investigation,
        }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
