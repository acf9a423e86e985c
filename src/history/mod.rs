//! Analysis history: a bounded, newest-first list of classification results
//! persisted in a single storage slot.


use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::case::ClueId;
use crate::error::{StorageError, StorageResult};
use crate::storage::{SharedStorage, HISTORY_KEY};

/// Room reserved in each entry for everything but the image data.
const ENTRY_OVERHEAD_BYTES: usize = 1024;

/// One classified photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Unique, time-ordered identifier.
    pub id: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    /// `data:` URI of the analyzed image.
    pub image_url: String,
    /// Response text shown to the player.
    pub analysis: String,
    pub clue_id: ClueId,
}

impl AnalysisResult {
    /// Create a result stamped with the current time.
    pub fn new(clue_id: ClueId, analysis: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self::new_at(clue_id, analysis, image_url, chrono::Utc::now().timestamp_millis())
    }

    /// Create a result stamped with an explicit time.
    pub fn new_at(
        clue_id: ClueId,
        analysis: impl Into<String>,
        image_url: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            timestamp,
            image_url: image_url.into(),
            analysis: analysis.into(),
            clue_id,
        }
    }
}

/// Aggregate counts over the whole history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total: usize,
    pub important_clues: usize,
    pub clue01_count: usize,
    pub clue02_count: usize,
    pub clue03_count: usize,
    pub normal_count: usize,
}

impl AnalysisStats {
    /// Project stats from a list of results.
    pub fn from_results(results: &[AnalysisResult]) -> Self {
        let mut stats = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.clue_id {
                ClueId::Clue01 => stats.clue01_count += 1,
                ClueId::Clue02 => stats.clue02_count += 1,
                ClueId::Clue03 => stats.clue03_count += 1,
                ClueId::None => stats.normal_count += 1,
            }
        }
        stats.important_clues = stats.total - stats.normal_count;

        stats
    }
}

/// Bytes used by the history slot against the storage quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUsage {
    pub used_bytes: usize,
    pub quota_bytes: usize,
    pub percentage: u32,
}

/// Durable history of analysis results.
#[derive(Clone)]
pub struct HistoryStore {
    storage: SharedStorage,
    max_entries: usize,
}

impl HistoryStore {
    /// Create a store keeping at most `max_entries` results.
    pub fn new(storage: SharedStorage, max_entries: usize) -> Self {
        Self {
            storage,
            max_entries: max_entries.max(1),
        }
    }

    /// Maximum number of retained results.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Largest raw image whose entry fits in half the storage quota.
    ///
    /// The other half stays available for older entries and the game state.
    pub fn max_image_bytes(&self) -> usize {
        let budget = (self.storage.quota_bytes() / 2).saturating_sub(ENTRY_OVERHEAD_BYTES);
        budget / 4 * 3
    }

    /// All results, newest first. Unreadable history reads as empty.
    pub async fn list(&self) -> Vec<AnalysisResult> {
        let raw = match self.storage.get(HISTORY_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to load analysis history");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "Analysis history is corrupt, treating as empty");
            Vec::new()
        })
    }

    /// Prepend a result, dropping the oldest entries past the cap.
    pub async fn add(&self, result: AnalysisResult) -> StorageResult<()> {
        let mut history = self.list().await;
        history.insert(0, result);
        self.save(history).await
    }

    /// Delete a result by id. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> StorageResult<bool> {
        let mut history = self.list().await;
        let Some(index) = history.iter().position(|r| r.id == id) else {
            debug!(id = %id, "Delete requested for unknown analysis result");
            return Ok(false);
        };

        history.remove(index);
        self.save(history).await?;
        Ok(true)
    }

    /// Drop the older half of the results to free space.
    ///
    /// Returns `false` when there was nothing left to drop.
    pub async fn shed_oldest(&self) -> StorageResult<bool> {
        let mut history = self.list().await;
        if history.is_empty() {
            return Ok(false);
        }

        let keep = history.len() / 2;
        history.truncate(keep);
        let serialized = serde_json::to_string(&history)?;
        self.storage.set(HISTORY_KEY, &serialized).await?;
        info!(kept = keep, "Dropped older analysis results to free storage");
        Ok(true)
    }

    /// Remove every result.
    pub async fn clear(&self) -> StorageResult<()> {
        self.storage.remove(HISTORY_KEY).await
    }

    /// Recompute aggregate statistics.
    pub async fn stats(&self) -> AnalysisStats {
        AnalysisStats::from_results(&self.list().await)
    }

    /// Results whose clue is not CLUE_NONE, newest first.
    pub async fn filter_important(&self) -> Vec<AnalysisResult> {
        self.list()
            .await
            .into_iter()
            .filter(|r| r.clue_id.is_key_clue())
            .collect()
    }

    /// Distinct key clues found so far, in newest-first order of discovery.
    pub async fn discovered_clues(&self) -> Vec<ClueId> {
        let mut found = Vec::new();
        for result in self.list().await {
            if result.clue_id.is_key_clue() && !found.contains(&result.clue_id) {
                found.push(result.clue_id);
            }
        }
        found
    }

    /// Size of the history slot relative to the quota.
    pub async fn usage(&self) -> StorageUsage {
        let used_bytes = match self.storage.get(HISTORY_KEY).await {
            Ok(raw) => raw.map(|r| r.len()).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "Failed to read history slot size");
                0
            }
        };
        let quota_bytes = self.storage.quota_bytes();
        let percentage = if quota_bytes == 0 {
            0
        } else {
            ((used_bytes as f64 / quota_bytes as f64) * 100.0).round() as u32
        };

        StorageUsage {
            used_bytes,
            quota_bytes,
            percentage,
        }
    }

    /// Write the list, truncated to the cap.
    ///
    /// On quota overflow the first retry keeps `max_entries / 2` results and
    /// every further retry halves again. The newest result is never dropped.
    async fn save(&self, mut history: Vec<AnalysisResult>) -> StorageResult<()> {
        history.truncate(self.max_entries);
        let mut keep = self.max_entries / 2;

        loop {
            let serialized = serde_json::to_string(&history)?;
            match self.storage.set(HISTORY_KEY, &serialized).await {
                Err(StorageError::QuotaExceeded { needed, quota }) if history.len() > 1 => {
                    let next = keep.min(history.len() - 1).max(1);
                    warn!(
                        needed,
                        quota,
                        keep = next,
                        "History exceeds storage quota, retrying with fewer entries"
                    );
                    history.truncate(next);
                    keep = next / 2;
                }
                other => return other,
            }
        }
    }
}
