use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini: GeminiConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub game: GameConfig,
    pub http: HttpConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` puts the classifier in deterministic (filename) mode.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Key-value slot limits
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub quota_bytes: usize,
    pub max_history: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
}

/// Game rules configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub case_id: String,
    pub max_upload_bytes: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub addr: String,
}

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_CASE_ID: &str = "painter-studio";

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .ok()
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/investigator.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5),
        };

        let storage = StorageConfig {
            quota_bytes: parse_var("STORAGE_QUOTA_BYTES", StorageConfig::default().quota_bytes),
            max_history: parse_var("HISTORY_MAX_ENTRIES", StorageConfig::default().max_history),
        };

        if storage.max_history == 0 {
            return Err(AppError::Config {
                message: "HISTORY_MAX_ENTRIES must be at least 1".to_string(),
            });
        }

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS", RequestConfig::default().timeout_ms),
        };

        let game = GameConfig {
            case_id: env::var("CASE_ID").unwrap_or_else(|_| DEFAULT_CASE_ID.to_string()),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", GameConfig::default().max_upload_bytes),
        };

        let http = HttpConfig {
            addr: env::var("HTTP_ADDR").unwrap_or_else(|_| HttpConfig::default().addr),
        };

        Ok(Config {
            gemini,
            database,
            storage,
            logging,
            request,
            game,
            http,
        })
    }

    /// Whether a model credential is available.
    pub fn model_configured(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: 5 * 1024 * 1024,
            max_history: 100,
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 30000 }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            case_id: DEFAULT_CASE_ID.to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            database: DatabaseConfig {
                path: PathBuf::from("./data/investigator.db"),
                max_connections: 5,
            },
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            request: RequestConfig::default(),
            game: GameConfig::default(),
            http: HttpConfig::default(),
        }
    }
}
