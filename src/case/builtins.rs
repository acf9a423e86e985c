//! Built-in cases.

use std::collections::BTreeSet;

use super::{CaseDefinition, CaseInfo, ClueId, Hint, Suspect};

/// "Death of a Painter" - the studio case.
///
/// The victim was left-handed but found holding a brush in the right hand,
/// so the scene was staged. The apprentice (`suspect_a`) is the culprit.
pub fn painter_studio_case() -> CaseDefinition {
    CaseDefinition {
        id: "painter-studio".to_string(),
        info: CaseInfo {
            title: "Death of a Painter".to_string(),
            victim: "Kim, a renowned painter".to_string(),
            location: "The victim's private studio, Jongno-gu, Seoul".to_string(),
            time_of_death: "Last night between 10 PM and midnight (estimated)".to_string(),
            cause_of_death: "Blunt force trauma to the head".to_string(),
            description: "The renowned painter Kim was found dead in the studio. \
                An easel had toppled over, paint was scattered across the floor and a \
                bottle of turpentine lay shattered. The victim was known to be \
                left-handed, yet was holding a brush in the right hand. The studio door \
                was locked from the inside and there were no signs of forced entry."
                .to_string(),
        },
        suspects: vec![
            Suspect {
                id: "suspect_a".to_string(),
                name: "Lee Young-hee".to_string(),
                age: 27,
                occupation: "Painter's apprentice".to_string(),
                relationship: "Studied under the victim for five years".to_string(),
                alibi: "Claims to have been alone at home sketching all evening.".to_string(),
                profile: "Recently learned that the victim planned to exhibit one of her \
                    paintings under his own name. Has a spare key to the studio."
                    .to_string(),
            },
            Suspect {
                id: "suspect_b".to_string(),
                name: "Park Min-su".to_string(),
                age: 45,
                occupation: "Gallery owner".to_string(),
                relationship: "Represented the victim for over a decade".to_string(),
                alibi: "Hosting a dinner for collectors until 11:30 PM; several guests confirm."
                    .to_string(),
                profile: "Was negotiating a lucrative exclusive contract with the victim."
                    .to_string(),
            },
            Suspect {
                id: "suspect_c".to_string(),
                name: "Choi Ji-won".to_string(),
                age: 52,
                occupation: "Art critic".to_string(),
                relationship: "Publicly feuded with the victim".to_string(),
                alibi: "Says he was at a late screening; the ticket stub shows a 9 PM showing."
                    .to_string(),
                profile: "Wrote a scathing review of the victim's last exhibition.".to_string(),
            },
        ],
        hints: vec![
            Hint {
                id: "hint_1".to_string(),
                title: "Look at the hands".to_string(),
                content: "Which hand did the victim paint with? Compare that with the hand \
                    holding the brush."
                    .to_string(),
                cost: 0,
            },
            Hint {
                id: "hint_2".to_string(),
                title: "Stains tell stories".to_string(),
                content: "Paint smudges build up on the side of the body a painter works from."
                    .to_string(),
                cost: 0,
            },
            Hint {
                id: "hint_3".to_string(),
                title: "Who could lock the door?".to_string(),
                content: "A door locked from the inside with no forced entry points to someone \
                    who could come and go freely."
                    .to_string(),
                cost: 1,
            },
        ],
        correct_culprit_id: "suspect_a".to_string(),
        required_evidence: BTreeSet::from([ClueId::Clue01, ClueId::Clue02]),
        correct_feedback: "Correct! Brilliant deduction. The apprentice, Lee Young-hee, \
            was the culprit."
            .to_string(),
        incorrect_feedback: "Not quite. Review the clues and try again.".to_string(),
    }
}
