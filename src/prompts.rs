//! Prompt construction for the vision model.
//!
//! The instruction embeds the case overview, the suspects and the key-clue
//! catalog so the model can match a photo against the known evidence.

use crate::case::{catalog, CaseDefinition, ClueId};

/// Build the answer rules and examples from the key-clue catalog.
pub fn classification_rules() -> String {
    let ids = catalog::key_clues()
        .map(|c| c.id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let examples = catalog::key_clues()
        .map(|c| format!("- {} -> {}", c.description, c.id))
        .collect::<Vec<_>>()
        .join("\n");
    let none = ClueId::None;

    format!(
        "IMPORTANT INSTRUCTIONS:\n\
         1. Analyze the photo provided by the user and decide whether it matches an entry in the [KEY CLUES] list above.\n\
         2. If the photo matches one of the key clues, return that clue's ID ({ids}).\n\
         3. If the photo is unrelated to the key clues or unclear, return {none}.\n\
         4. You must return exactly one of {ids}, {none}.\n\
         5. Return only the clue ID, with no other text or explanation.\n\
         \n\
         Examples:\n\
         {examples}\n\
         - An unrelated object -> {none}"
    )
}

/// Build the classification instruction for a case.
pub fn classification_prompt(case: &CaseDefinition) -> String {
    let info = &case.info;

    let overview = format!(
        "[CASE OVERVIEW]\n\
         - Title: {}\n\
         - Victim: {}\n\
         - Location: {}\n\
         - Estimated time of death: {}\n\
         - Cause of death: {}\n\
         - Details: {}",
        info.title,
        info.victim,
        info.location,
        info.time_of_death,
        info.cause_of_death,
        info.description
    );

    let suspects = case
        .suspects
        .iter()
        .enumerate()
        .map(|(idx, s)| {
            format!(
                "{}. {} ({}, {})\n   - Relationship: {}\n   - Alibi: {}",
                idx + 1,
                s.name,
                s.age,
                s.occupation,
                s.relationship,
                s.alibi
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let clues = catalog::key_clues()
        .map(|c| format!("- {}: {}", c.id, c.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a brilliant AI detective assistant investigating a fictional murder case.\n\n\
         {overview}\n\n\
         [SUSPECTS]\n{suspects}\n\n\
         [KEY CLUES]\n{clues}\n\n\
         {rules}",
        rules = classification_rules()
    )
}
