//! Deduction grading.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{CaseDefinition, ClueId};
use crate::error::ToolError;
use crate::game::DeductionResult;

/// A player's final accusation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionSubmission {
    /// Suspect id of the accused.
    pub culprit: String,
    /// Free-text motive.
    pub motive: String,
    /// Clues offered as evidence.
    #[serde(default)]
    pub evidence: BTreeSet<ClueId>,
}

impl DeductionSubmission {
    /// Create a submission with no evidence.
    pub fn new(culprit: impl Into<String>, motive: impl Into<String>) -> Self {
        Self {
            culprit: culprit.into(),
            motive: motive.into(),
            evidence: BTreeSet::new(),
        }
    }

    /// Add evidence.
    pub fn with_evidence(mut self, evidence: impl IntoIterator<Item = ClueId>) -> Self {
        self.evidence.extend(evidence);
        self
    }
}

/// Grade an accusation against a case's winning condition.
///
/// Correct iff the culprit matches and the evidence covers every required clue.
/// A culprit or motive that is empty after trimming is rejected.
pub fn grade(
    case: &CaseDefinition,
    submission: DeductionSubmission,
    now_ms: i64,
) -> Result<DeductionResult, ToolError> {
    if submission.culprit.trim().is_empty() {
        return Err(ToolError::Validation {
            field: "culprit".to_string(),
            reason: "A culprit must be selected".to_string(),
        });
    }
    if submission.motive.trim().is_empty() {
        return Err(ToolError::Validation {
            field: "motive".to_string(),
            reason: "A motive must be provided".to_string(),
        });
    }

    let is_correct = submission.culprit == case.correct_culprit_id
        && submission.evidence.is_superset(&case.required_evidence);

    let feedback = if is_correct {
        case.correct_feedback.clone()
    } else {
        case.incorrect_feedback.clone()
    };

    info!(
        case = %case.id,
        culprit = %submission.culprit,
        evidence = submission.evidence.len(),
        is_correct,
        "Deduction graded"
    );

    Ok(DeductionResult {
        culprit: submission.culprit,
        motive: submission.motive,
        evidence: submission.evidence,
        is_correct,
        feedback,
        timestamp: now_ms,
    })
}
