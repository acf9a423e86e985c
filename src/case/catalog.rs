//! Static clue catalog.

use serde::Serialize;

use super::ClueId;

/// Description and player-facing response for one clue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClueDefinition {
    pub id: ClueId,
    pub description: &'static str,
    pub response: &'static str,
}

static CATALOG: [ClueDefinition; 4] = [
    ClueDefinition {
        id: ClueId::Clue01,
        description: "Paint on the victim's left sleeve",
        response: "Paint is smeared on the left sleeve and pocket of the work clothes, \
            which suggests the painter was left-handed.",
    },
    ClueDefinition {
        id: ClueId::Clue02,
        description: "A brush held in the victim's right hand",
        response: "The victim is holding a brush in the right hand. Someone may have \
            staged the scene after the incident.",
    },
    ClueDefinition {
        id: ClueId::Clue03,
        description: "A glass bottle of turpentine",
        response: "Turpentine is a thinner for oil paint.",
    },
    ClueDefinition {
        id: ClueId::None,
        description: "No decisive clue",
        response: "Hmm... this doesn't look like a decisive clue. Let's take a closer look.",
    },
];

/// All catalog entries, key clues first.
pub fn all() -> &'static [ClueDefinition] {
    &CATALOG
}

/// Catalog entries for the key clues only.
pub fn key_clues() -> impl Iterator<Item = &'static ClueDefinition> {
    CATALOG.iter().filter(|c| c.id.is_key_clue())
}

/// Definition for a clue.
pub fn definition(clue_id: ClueId) -> &'static ClueDefinition {
    CATALOG
        .iter()
        .find(|c| c.id == clue_id)
        .unwrap_or(&CATALOG[3])
}

/// Response text shown to the player for a clue.
pub fn response_for(clue_id: ClueId) -> &'static str {
    definition(clue_id).response
}

/// Response text for a raw token; unknown tokens get the CLUE_NONE text.
pub fn response_for_token(token: &str) -> &'static str {
    response_for(ClueId::parse_lenient(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_clue_has_one_definition() {
        for id in ClueId::ALL {
            assert_eq!(all().iter().filter(|c| c.id == id).count(), 1);
            assert_eq!(definition(id).id, id);
        }
    }

    #[test]
    fn test_response_for_clue_01_mentions_left_sleeve() {
        let text = response_for(ClueId::Clue01);
        assert!(text.contains("left sleeve"));
        assert!(text.contains("left-handed"));
    }

    #[test]
    fn test_unknown_token_falls_back_to_none() {
        assert_eq!(response_for_token("CLUE_42"), response_for(ClueId::None));
        assert_eq!(response_for_token(""), response_for(ClueId::None));
        assert_eq!(response_for_token("CLUE_03"), response_for(ClueId::Clue03));
    }

    #[test]
    fn test_key_clues_excludes_none() {
        let ids: Vec<_> = key_clues().map(|c| c.id).collect();
        assert_eq!(ids, vec![ClueId::Clue01, ClueId::Clue02, ClueId::Clue03]);
    }
}
