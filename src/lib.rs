//! # Clue Investigator
//!
//! Backend for a single-player detective mini-game. The player photographs
//! physical clues; a vision model (or a filename-based fallback) classifies
//! each photo into one of a small set of clue ids, and the game tracks the
//! discovered clues, hints used and the final accusation.
//!
//! ## Features
//!
//! - **Clue classification**: Gemini vision model, or deterministic filename markers
//! - **Investigation history**: bounded, newest-first record of analyzed photos
//! - **Game state**: phase machine with play-time tracking and hint usage
//! - **Deduction grading**: data-driven winning condition per case
//! - **Transports**: MCP over stdio and an HTTP upload endpoint
//!
//! ## Architecture
//!
//! ```text
//! MCP Client ─┐                          ┌→ Gemini generateContent (HTTP)
//!             ├→ InvestigationService ───┤
//! Browser ────┘                          └→ SQLite key-value slots
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clue_investigator::{AppState, CaseBook, Config, McpServer};
//! use clue_investigator::storage::SqliteStorage;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = SqliteStorage::new(&config.database, config.storage.quota_bytes).await?;
//!     let case = CaseBook::new().get(&config.game.case_id).cloned().ok_or("unknown case")?;
//!     let state = Arc::new(AppState::new(config, Arc::new(storage), case, None));
//!     McpServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

/// Case data, clue catalog and deduction grading.
pub mod case;
/// Photo classification into clue ids.
pub mod classifier;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Game-state store.
pub mod game;
/// Gemini API client and types.
pub mod gemini;
/// Analysis history store.
pub mod history;
/// Orchestration of analysis and game operations.
pub mod investigation;
/// Instruction text for the vision model.
pub mod prompts;
/// MCP and HTTP transports.
pub mod server;
/// Key-value storage backends.
pub mod storage;

pub use case::{CaseBook, CaseDefinition, ClueId};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use investigation::{AnalyzeOutcome, ImageUpload, InvestigationService};
pub use server::{AppState, McpServer, SharedState};
