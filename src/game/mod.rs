//! Game-state store: the single record tracking phase, play time, hint usage
//! and the final deduction.


use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::case::ClueId;
use crate::error::{StorageError, StorageResult};
use crate::history::HistoryStore;
use crate::storage::{SharedStorage, GAME_STATE_KEY};

const MILLIS_PER_MINUTE: i64 = 60_000;

/// Coarse stage of play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    #[default]
    Tutorial,
    Investigation,
    Deduction,
    Completed,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Tutorial => write!(f, "tutorial"),
            GamePhase::Investigation => write!(f, "investigation"),
            GamePhase::Deduction => write!(f, "deduction"),
            GamePhase::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for GamePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tutorial" => Ok(GamePhase::Tutorial),
            "investigation" => Ok(GamePhase::Investigation),
            "deduction" => Ok(GamePhase::Deduction),
            "completed" => Ok(GamePhase::Completed),
            _ => Err(format!("Unknown game phase: {}", s)),
        }
    }
}

/// Graded outcome of a final accusation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductionResult {
    /// Suspect id of the accused.
    pub culprit: String,
    pub motive: String,
    pub evidence: BTreeSet<ClueId>,
    pub is_correct: bool,
    pub feedback: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// The per-session game record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub phase: GamePhase,
    /// Epoch milliseconds.
    pub start_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_time: Option<i64>,
    #[serde(default)]
    pub hints_used: u32,
    #[serde(default)]
    pub deduction_submitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduction_result: Option<DeductionResult>,
}

impl GameState {
    /// Fresh state starting at `now_ms`.
    pub fn new_at(now_ms: i64) -> Self {
        Self {
            phase: GamePhase::Tutorial,
            start_time: now_ms,
            completed_time: None,
            hints_used: 0,
            deduction_submitted: false,
            deduction_result: None,
        }
    }

    /// Whole minutes played, frozen once the game is completed.
    pub fn elapsed_minutes_at(&self, now_ms: i64) -> u64 {
        let end = self.completed_time.unwrap_or(now_ms);
        ((end - self.start_time).max(0) / MILLIS_PER_MINUTE) as u64
    }
}

/// Durable game-state record.
///
/// Mutators never fail: a write the backend refuses is logged and the updated
/// state is still returned, so play continues from memory.
#[derive(Clone)]
pub struct GameStateStore {
    storage: SharedStorage,
    history: Option<HistoryStore>,
}

impl GameStateStore {
    /// Create a store over the given backend.
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            storage,
            history: None,
        }
    }

    /// Drop older history from this store when a state write exceeds the
    /// shared quota.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    /// Current state, or a fresh default if absent or unreadable.
    pub async fn get(&self) -> GameState {
        self.get_at(now_millis()).await
    }

    /// Like [`GameStateStore::get`], with an explicit clock reading for the default.
    pub async fn get_at(&self, now_ms: i64) -> GameState {
        match self.storage.get(GAME_STATE_KEY).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "Game state is corrupt, starting fresh");
                GameState::new_at(now_ms)
            }),
            Ok(None) => GameState::new_at(now_ms),
            Err(e) => {
                warn!(error = %e, "Failed to load game state, starting fresh");
                GameState::new_at(now_ms)
            }
        }
    }

    /// Move to a new phase.
    pub async fn set_phase(&self, phase: GamePhase) -> GameState {
        self.set_phase_at(phase, now_millis()).await
    }

    /// Move to a new phase at an explicit time.
    ///
    /// Entering `Investigation` restarts the clock; entering `Completed`
    /// stamps the completion time unless one is already set.
    pub async fn set_phase_at(&self, phase: GamePhase, now_ms: i64) -> GameState {
        let mut state = self.get_at(now_ms).await;

        if phase < state.phase {
            warn!(from = %state.phase, to = %phase, "Game phase moving backwards");
        }
        state.phase = phase;

        match phase {
            GamePhase::Investigation => state.start_time = now_ms,
            GamePhase::Completed if state.completed_time.is_none() => {
                state.completed_time = Some(now_ms)
            }
            _ => {}
        }

        self.persist(&state).await;
        info!(phase = %phase, "Game phase changed");
        state
    }

    /// Count one more hint as used.
    pub async fn record_hint_used(&self) -> GameState {
        let mut state = self.get().await;
        state.hints_used = state.hints_used.saturating_add(1);
        self.persist(&state).await;
        debug!(hints_used = state.hints_used, "Hint recorded");
        state
    }

    /// Store a graded deduction and complete the game.
    pub async fn submit_deduction(&self, result: DeductionResult) -> GameState {
        self.submit_deduction_at(result, now_millis()).await
    }

    /// Store a graded deduction at an explicit time.
    ///
    /// Unlike [`GameStateStore::set_phase_at`], the completion time is always
    /// overwritten.
    pub async fn submit_deduction_at(&self, result: DeductionResult, now_ms: i64) -> GameState {
        let mut state = self.get_at(now_ms).await;
        state.deduction_submitted = true;
        state.deduction_result = Some(result);
        state.phase = GamePhase::Completed;
        state.completed_time = Some(now_ms);

        self.persist(&state).await;
        info!("Deduction submitted, game completed");
        state
    }

    /// Forget the stored state; the next read returns defaults.
    pub async fn reset(&self) -> StorageResult<()> {
        self.storage.remove(GAME_STATE_KEY).await?;
        info!("Game state reset");
        Ok(())
    }

    /// Whole minutes played.
    pub async fn elapsed_minutes(&self) -> u64 {
        self.elapsed_minutes_at(now_millis()).await
    }

    /// Whole minutes played, measured at an explicit time.
    pub async fn elapsed_minutes_at(&self, now_ms: i64) -> u64 {
        self.get_at(now_ms).await.elapsed_minutes_at(now_ms)
    }

    /// Write the state, shedding older history while the quota is exceeded.
    async fn persist(&self, state: &GameState) {
        loop {
            let err = match self.save(state).await {
                Ok(()) => return,
                Err(e) => e,
            };

            let StorageError::QuotaExceeded { needed, quota } = err else {
                error!(error = %err, "Failed to save game state, keeping it in memory");
                return;
            };

            let shed = match &self.history {
                Some(history) => history.shed_oldest().await,
                None => Ok(false),
            };
            match shed {
                Ok(true) => warn!(
                    needed,
                    quota, "Game state exceeds storage quota, dropped older history"
                ),
                Ok(false) => {
                    error!(
                        needed,
                        quota, "Game state does not fit the storage quota, keeping it in memory"
                    );
                    return;
                }
                Err(e) => {
                    error!(error = %e, "Failed to free storage for game state, keeping it in memory");
                    return;
                }
            }
        }
    }

    async fn save(&self, state: &GameState) -> StorageResult<()> {
        let serialized = serde_json::to_string(state)?;
        self.storage.set(GAME_STATE_KEY, &serialized).await
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
