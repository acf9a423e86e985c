//! Case reference data: clue identifiers, the clue catalog, case definitions
//! and the deduction grader.
//!
//! A case is looked up by id in a [`CaseBook`]. The winning condition lives in
//! the [`CaseDefinition`] record, so adding a case never touches the grader.

mod builtins;
pub mod catalog;
pub mod grader;

pub use catalog::{response_for, response_for_token, ClueDefinition};
pub use grader::{grade, DeductionSubmission};

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::error;

/// Identifier of a recognized piece of physical evidence, or "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClueId {
    #[serde(rename = "CLUE_01")]
    Clue01,
    #[serde(rename = "CLUE_02")]
    Clue02,
    #[serde(rename = "CLUE_03")]
    Clue03,
    #[serde(rename = "CLUE_NONE")]
    None,
}

impl ClueId {
    /// All identifiers, key clues first.
    pub const ALL: [ClueId; 4] = [ClueId::Clue01, ClueId::Clue02, ClueId::Clue03, ClueId::None];

    /// The literal token used on the wire and in model replies.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClueId::Clue01 => "CLUE_01",
            ClueId::Clue02 => "CLUE_02",
            ClueId::Clue03 => "CLUE_03",
            ClueId::None => "CLUE_NONE",
        }
    }

    /// Whether this is an "important" clue.
    pub fn is_key_clue(&self) -> bool {
        !matches!(self, ClueId::None)
    }

    /// Parse a token, mapping anything unrecognized to [`ClueId::None`].
    pub fn parse_lenient(token: &str) -> Self {
        token.parse().unwrap_or(ClueId::None)
    }
}

impl fmt::Display for ClueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClueId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CLUE_01" => Ok(ClueId::Clue01),
            "CLUE_02" => Ok(ClueId::Clue02),
            "CLUE_03" => Ok(ClueId::Clue03),
            "CLUE_NONE" => Ok(ClueId::None),
            _ => Err(format!("Unknown clue id: {}", s)),
        }
    }
}

/// Overview of the crime being investigated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseInfo {
    pub title: String,
    pub victim: String,
    pub location: String,
    pub time_of_death: String,
    pub cause_of_death: String,
    pub description: String,
}

/// A person the player may accuse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspect {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub occupation: String,
    pub relationship: String,
    pub alibi: String,
    pub profile: String,
}

/// A hint the player can reveal. A cost of 0 means free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    pub id: String,
    pub title: String,
    pub content: String,
    pub cost: u32,
}

/// One scripted case together with its winning condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDefinition {
    pub id: String,
    pub info: CaseInfo,
    pub suspects: Vec<Suspect>,
    pub hints: Vec<Hint>,
    pub correct_culprit_id: String,
    pub required_evidence: BTreeSet<ClueId>,
    pub correct_feedback: String,
    pub incorrect_feedback: String,
}

impl CaseDefinition {
    /// Look up a suspect by id.
    pub fn suspect(&self, id: &str) -> Option<&Suspect> {
        self.suspects.iter().find(|s| s.id == id)
    }

    /// Look up a hint by id.
    pub fn hint(&self, id: &str) -> Option<&Hint> {
        self.hints.iter().find(|h| h.id == id)
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Case ID is required".to_string());
        }
        if self.suspect(&self.correct_culprit_id).is_none() {
            return Err(format!(
                "Case '{}' names unknown culprit '{}'",
                self.id, self.correct_culprit_id
            ));
        }
        if self.required_evidence.contains(&ClueId::None) {
            return Err(format!("Case '{}' cannot require CLUE_NONE", self.id));
        }
        Ok(())
    }
}

/// Registry of playable cases, keyed by case id.
pub struct CaseBook {
    cases: HashMap<String, CaseDefinition>,
}

impl CaseBook {
    /// Create a case book with the built-in cases.
    pub fn new() -> Self {
        let mut book = Self {
            cases: HashMap::new(),
        };

        for case in [builtins::painter_studio_case()] {
            let id = case.id.clone();
            if let Err(e) = book.register(case) {
                error!(case = %id, error = %e, "Failed to register builtin case");
            }
        }

        book
    }

    /// Register a case.
    ///
    /// # Errors
    /// Returns error if the case is malformed or the id is taken.
    pub fn register(&mut self, case: CaseDefinition) -> Result<(), String> {
        case.validate()?;
        if self.cases.contains_key(&case.id) {
            return Err(format!("Case '{}' already exists", case.id));
        }
        self.cases.insert(case.id.clone(), case);
        Ok(())
    }

    /// Get a case by id.
    pub fn get(&self, id: &str) -> Option<&CaseDefinition> {
        self.cases.get(id)
    }

    /// Sorted ids of all registered cases.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.cases.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for CaseBook {
    fn default() -> Self {
        Self::new()
    }
}
