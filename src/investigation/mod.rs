//! Investigation service: the game operations shared by every transport.
//!
//! A photo upload goes through validation, classification, catalog lookup
//! and finally the history store. The service also owns the active case and
//! fronts the game-state store for hints, deductions and restarts.


use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::case::{catalog, grade, CaseDefinition, ClueId, DeductionSubmission, Hint};
use crate::classifier::Classifier;
use crate::error::{AppResult, ToolError};
use crate::game::{now_millis, GameState, GameStateStore};
use crate::history::{AnalysisResult, HistoryStore};

/// A photo submitted for analysis.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Create an upload.
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// `data:` URI embedding the image.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }
}

/// Why an analysis produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeErrorKind {
    /// The model credential is missing or rejected.
    Configuration,
    /// The upload was rejected before classification.
    InvalidInput,
    /// The photo was classified but the result could not be recorded.
    Storage,
}

/// Outcome of analyzing one photo.
///
/// The error variant still carries `clueId` and `analysis` so older clients
/// that only read those two fields keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzeOutcome {
    Ok {
        #[serde(rename = "clueId")]
        clue_id: ClueId,
        analysis: String,
        result: AnalysisResult,
    },
    Error {
        kind: AnalyzeErrorKind,
        message: String,
        #[serde(rename = "clueId")]
        clue_id: ClueId,
        analysis: String,
    },
}

impl AnalyzeOutcome {
    /// Failed outcome; `analysis` carries the message for legacy clients.
    pub fn error(kind: AnalyzeErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        AnalyzeOutcome::Error {
            kind,
            analysis: format!("❌ {}", message),
            message,
            clue_id: ClueId::None,
        }
    }

    /// Whether a clue id was produced.
    pub fn is_ok(&self) -> bool {
        matches!(self, AnalyzeOutcome::Ok { .. })
    }

    /// The clue id reported to the player.
    pub fn clue_id(&self) -> ClueId {
        match self {
            AnalyzeOutcome::Ok { clue_id, .. } | AnalyzeOutcome::Error { clue_id, .. } => *clue_id,
        }
    }
}

/// A revealed hint together with the updated usage count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HintReveal {
    pub hint: Hint,
    pub hints_used: u32,
}

/// Game progress as shown on the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub state: GameState,
    pub elapsed_minutes: u64,
    pub discovered_clues: Vec<ClueId>,
}

/// Orchestrates analysis and game operations for one active case.
#[derive(Clone)]
pub struct InvestigationService {
    case: Arc<CaseDefinition>,
    classifier: Classifier,
    history: HistoryStore,
    game: GameStateStore,
    max_upload_bytes: usize,
}

impl InvestigationService {
    /// Create a service.
    ///
    /// The upload limit is lowered to the largest image the history can hold,
    /// and game-state writes may drop older history when the quota is full.
    pub fn new(
        case: CaseDefinition,
        classifier: Classifier,
        history: HistoryStore,
        game: GameStateStore,
        max_upload_bytes: usize,
    ) -> Self {
        let storable = history.max_image_bytes();
        if max_upload_bytes > storable {
            info!(
                configured = max_upload_bytes,
                effective = storable,
                "Upload limit lowered to fit the storage quota"
            );
        }

        Self {
            case: Arc::new(case),
            classifier,
            game: game.with_history(history.clone()),
            history,
            max_upload_bytes: max_upload_bytes.min(storable),
        }
    }

    /// The active case.
    pub fn case(&self) -> &CaseDefinition {
        &self.case
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn game(&self) -> &GameStateStore {
        &self.game
    }

    /// Largest accepted upload in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Reject uploads that are not images or that exceed the size limit.
    pub fn validate_upload(&self, upload: &ImageUpload) -> Result<(), ToolError> {
        if !upload.mime_type.starts_with("image/") {
            return Err(ToolError::Validation {
                field: "image".to_string(),
                reason: format!("Only image files are accepted, got '{}'", upload.mime_type),
            });
        }
        if upload.bytes.is_empty() {
            return Err(ToolError::Validation {
                field: "image".to_string(),
                reason: "The image is empty".to_string(),
            });
        }
        if upload.bytes.len() > self.max_upload_bytes {
            return Err(ToolError::Validation {
                field: "image".to_string(),
                reason: format!(
                    "The image is {} bytes, the limit is {} bytes",
                    upload.bytes.len(),
                    self.max_upload_bytes
                ),
            });
        }
        Ok(())
    }

    /// Classify a photo and record the result in history.
    pub async fn analyze(&self, upload: ImageUpload) -> AnalyzeOutcome {
        if let Err(e) = self.validate_upload(&upload) {
            warn!(file_name = %upload.file_name, error = %e, "Rejected upload");
            return AnalyzeOutcome::error(AnalyzeErrorKind::InvalidInput, e.to_string());
        }

        let clue_id = match self
            .classifier
            .classify(&upload.bytes, &upload.mime_type, &upload.file_name)
            .await
        {
            Ok(clue_id) => clue_id,
            Err(e) => {
                error!(error = %e, "Vision model credential problem");
                return AnalyzeOutcome::error(AnalyzeErrorKind::Configuration, e.to_string());
            }
        };

        let analysis = catalog::response_for(clue_id).to_string();
        let result = AnalysisResult::new(clue_id, analysis.clone(), upload.data_url());

        if let Err(e) = self.history.add(result.clone()).await {
            error!(id = %result.id, error = %e, "Failed to record analysis in history");
            return AnalyzeOutcome::error(
                AnalyzeErrorKind::Storage,
                format!("The analysis could not be saved: {}", e),
            );
        }

        info!(
            file_name = %upload.file_name,
            clue_id = %clue_id,
            id = %result.id,
            "Photo analyzed"
        );

        AnalyzeOutcome::Ok {
            clue_id,
            analysis,
            result,
        }
    }

    /// Grade an accusation against the active case and complete the game.
    ///
    /// Evidence may only name key clues already found in the history.
    pub async fn submit_deduction(&self, submission: DeductionSubmission) -> AppResult<GameState> {
        let discovered = self.history.discovered_clues().await;
        let undiscovered: Vec<String> = submission
            .evidence
            .iter()
            .filter(|c| c.is_key_clue() && !discovered.contains(*c))
            .map(ToString::to_string)
            .collect();
        if !undiscovered.is_empty() {
            return Err(ToolError::Validation {
                field: "evidence".to_string(),
                reason: format!("Clues not discovered yet: {}", undiscovered.join(", ")),
            }
            .into());
        }

        let now_ms = now_millis();
        let result = grade(&self.case, submission, now_ms)?;
        Ok(self.game.submit_deduction_at(result, now_ms).await)
    }

    /// Reveal a hint of the active case and count it as used.
    pub async fn reveal_hint(&self, hint_id: &str) -> AppResult<HintReveal> {
        let hint = self
            .case
            .hint(hint_id)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                what: "Hint".to_string(),
                id: hint_id.to_string(),
            })?;

        let state = self.game.record_hint_used().await;
        info!(hint = %hint.id, cost = hint.cost, hints_used = state.hints_used, "Hint revealed");

        Ok(HintReveal {
            hint,
            hints_used: state.hints_used,
        })
    }

    /// Start over: fresh game state and an empty history.
    pub async fn restart(&self) -> AppResult<()> {
        self.game.reset().await?;
        self.history.clear().await?;
        info!(case = %self.case.id, "Investigation restarted");
        Ok(())
    }

    /// Current state, play time and discovered clues.
    pub async fn snapshot(&self) -> GameSnapshot {
        let now_ms = now_millis();
        let state = self.game.get_at(now_ms).await;
        let elapsed_minutes = state.elapsed_minutes_at(now_ms);

        GameSnapshot {
            state,
            elapsed_minutes,
            discovered_clues: self.history.discovered_clues().await,
        }
    }
}
