use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clue_investigator::{
    case::CaseBook,
    classifier::VisionModel,
    config::{Config, LogFormat},
    gemini::GeminiClient,
    server::{http, AppState, McpServer},
    storage::{SharedStorage, SqliteStorage},
};

/// Detective mini-game backend.
#[derive(Parser, Debug)]
#[command(name = "clue-investigator", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Serve MCP over stdio (default)
    Mcp,

    /// Serve the HTTP analysis endpoint
    Http {
        /// Listen address, overrides HTTP_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr; stdout carries MCP frames
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Clue Investigator starting..."
    );

    let book = CaseBook::new();
    let case = match book.get(&config.game.case_id).cloned() {
        Some(case) => case,
        None => {
            error!(case = %config.game.case_id, available = ?book.ids(), "Unknown CASE_ID");
            anyhow::bail!(
                "Configuration error: unknown case '{}' (available: {})",
                config.game.case_id,
                book.ids().join(", ")
            );
        }
    };

    let storage = match SqliteStorage::new(&config.database, config.storage.quota_bytes).await {
        Ok(s) => {
            info!(path = %config.database.path.display(), "Database initialized");
            Arc::new(s)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };

    let model: Option<Arc<dyn VisionModel>> = if config.model_configured() {
        let client = GeminiClient::new(&config.gemini, config.request.clone())?;
        info!(model = %client.model(), base_url = %client.base_url(), "Gemini client initialized");
        let model: Arc<dyn VisionModel> = Arc::new(client);
        Some(model)
    } else {
        warn!("GEMINI_API_KEY not set, classifying photos by filename only");
        None
    };

    let http_addr = match &cli.command {
        Some(Command::Http { addr: Some(addr) }) => addr.clone(),
        _ => config.http.addr.clone(),
    };

    let shared: SharedStorage = storage.clone();
    let state = Arc::new(AppState::new(config, shared, case, model));

    let result = match cli.command.unwrap_or(Command::Mcp) {
        Command::Mcp => {
            info!("Server ready, waiting for requests on stdin...");
            McpServer::new(state).run().await
        }
        Command::Http { .. } => http::run(&http_addr, state).await,
    };

    storage.close().await;

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
