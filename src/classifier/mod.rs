//! Photo classification into clue identifiers.
//!
//! Two modes:
//! - **Deterministic**: filename markers decide the clue. Used when no model
//!   credential is configured or the filename carries a test keyword.
//! - **Model**: the photo and a case-specific instruction go to a
//!   [`VisionModel`]; the reply is scanned for a clue token.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::case::{CaseDefinition, ClueId};
use crate::error::{ClassifyError, GeminiResult};
use crate::prompts::classification_prompt;

/// Filename keywords that force deterministic mode.
const TEST_KEYWORDS: [&str; 3] = ["test", "clue", "단서"];

/// Filename markers per clue, checked in order.
const FILE_NAME_MARKERS: [(ClueId, [&str; 4]); 3] = [
    (ClueId::Clue01, ["clue1", "clue_01", "단서1", "1."]),
    (ClueId::Clue02, ["clue2", "clue_02", "단서2", "2."]),
    (ClueId::Clue03, ["clue3", "clue_03", "단서3", "3."]),
];

/// A multimodal model that answers an instruction about an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send the instruction and image, returning the model's text reply.
    async fn describe_image(
        &self,
        instruction: &str,
        mime_type: &str,
        image: &[u8],
    ) -> GeminiResult<String>;
}

/// How a photo will be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMode {
    Deterministic,
    Model,
}

/// Clue classifier.
#[derive(Clone)]
pub struct Classifier {
    model: Option<Arc<dyn VisionModel>>,
    instruction: String,
}

impl Classifier {
    /// Create a classifier for a case. `None` means no credential is configured.
    pub fn new(model: Option<Arc<dyn VisionModel>>, case: &CaseDefinition) -> Self {
        Self {
            model,
            instruction: classification_prompt(case),
        }
    }

    /// Classifier that only ever uses filename markers.
    pub fn deterministic(case: &CaseDefinition) -> Self {
        Self::new(None, case)
    }

    /// The mode a given filename would be classified in.
    pub fn mode_for(&self, file_name: &str) -> ClassificationMode {
        if self.model.is_none() || is_test_file_name(file_name) {
            ClassificationMode::Deterministic
        } else {
            ClassificationMode::Model
        }
    }

    /// Classify a photo.
    ///
    /// # Errors
    /// Only a missing or rejected model credential is reported; every other
    /// model failure yields `ClueId::None`.
    pub async fn classify(
        &self,
        image: &[u8],
        mime_type: &str,
        file_name: &str,
    ) -> Result<ClueId, ClassifyError> {
        let model = match (&self.model, self.mode_for(file_name)) {
            (Some(model), ClassificationMode::Model) => model,
            _ => {
                let clue_id = classify_by_file_name(file_name);
                info!(
                    file_name = %file_name,
                    clue_id = %clue_id,
                    "Classified by filename"
                );
                return Ok(clue_id);
            }
        };

        debug!(
            file_name = %file_name,
            mime_type = %mime_type,
            bytes = image.len(),
            "Classifying with vision model"
        );

        match model.describe_image(&self.instruction, mime_type, image).await {
            Ok(reply) => {
                let clue_id = parse_model_reply(&reply);
                info!(reply = %reply.trim(), clue_id = %clue_id, "Vision model classified photo");
                Ok(clue_id)
            }
            Err(e) if e.is_credential() => Err(ClassifyError::Credential {
                message: e.to_string(),
            }),
            Err(e) => {
                // Indistinguishable from "no clue" for the caller
                warn!(error = %e, "Vision model call failed, treating as no clue");
                Ok(ClueId::None)
            }
        }
    }
}

/// Whether the filename carries a keyword that forces deterministic mode.
pub fn is_test_file_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    TEST_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Deterministic classification from filename markers.
pub fn classify_by_file_name(file_name: &str) -> ClueId {
    let lower = file_name.to_lowercase();
    FILE_NAME_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(clue_id, _)| *clue_id)
        .unwrap_or(ClueId::None)
}

/// Extract a clue id from a free-form model reply.
pub fn parse_model_reply(reply: &str) -> ClueId {
    let upper = reply.trim().to_uppercase();
    [ClueId::Clue01, ClueId::Clue02, ClueId::Clue03]
        .into_iter()
        .find(|id| upper.contains(id.as_str()))
        .unwrap_or(ClueId::None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::CaseBook;
    use crate::error::GeminiError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Text(&'static str),
        MissingKey,
        Unavailable,
    }

    struct FakeModel {
        reply: Reply,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VisionModel for FakeModel {
        async fn describe_image(
            &self,
            instruction: &str,
            _mime_type: &str,
            _image: &[u8],
        ) -> GeminiResult<String> {
            assert!(instruction.contains("[KEY CLUES]"));
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::MissingKey => Err(GeminiError::InvalidApiKey {
                    message: "API_KEY_INVALID".to_string(),
                }),
                Reply::Unavailable => Err(GeminiError::Api {
                    status: 503,
                    message: "overloaded".to_string(),
                }),
            }
        }
    }

    fn classifier_with(model: Arc<FakeModel>) -> Classifier {
        let book = CaseBook::new();
        Classifier::new(Some(model), book.get("painter-studio").unwrap())
    }

    #[test]
    fn test_file_name_markers() {
        assert_eq!(classify_by_file_name("clue1.jpg"), ClueId::Clue01);
        assert_eq!(classify_by_file_name("CLUE_02.PNG"), ClueId::Clue02);
        assert_eq!(classify_by_file_name("단서3.jpg"), ClueId::Clue03);
        assert_eq!(classify_by_file_name("photo3.jpg"), ClueId::Clue03);
        assert_eq!(classify_by_file_name("kitchen.jpg"), ClueId::None);
    }

    #[test]
    fn test_test_keywords() {
        assert!(is_test_file_name("my_TEST_photo.jpg"));
        assert!(is_test_file_name("clue.jpg"));
        assert!(is_test_file_name("단서.png"));
        assert!(!is_test_file_name("IMG_0042.jpg"));
    }

    #[test]
    fn test_parse_model_reply() {
        assert_eq!(parse_model_reply("CLUE_02"), ClueId::Clue02);
        assert_eq!(parse_model_reply("  clue_03\n"), ClueId::Clue03);
        assert_eq!(parse_model_reply("This matches CLUE_01."), ClueId::Clue01);
        assert_eq!(parse_model_reply("CLUE_NONE"), ClueId::None);
        assert_eq!(parse_model_reply("no idea"), ClueId::None);
    }

    #[tokio::test]
    async fn test_no_credential_uses_file_name() {
        let book = CaseBook::new();
        let classifier = Classifier::deterministic(book.get("painter-studio").unwrap());

        for (name, expected) in [
            ("clue1.jpg", ClueId::Clue01),
            ("evidence_clue2.jpeg", ClueId::Clue02),
            ("clue3.png", ClueId::Clue03),
            ("IMG_0042.jpg", ClueId::None),
        ] {
            assert_eq!(classifier.mode_for(name), ClassificationMode::Deterministic);
            assert_eq!(
                classifier.classify(b"img", "image/jpeg", name).await.unwrap(),
                expected
            );
        }
    }

    #[tokio::test]
    async fn test_test_keyword_bypasses_model() {
        let model = FakeModel::new(Reply::Text("CLUE_03"));
        let classifier = classifier_with(model.clone());

        let clue = classifier
            .classify(b"img", "image/jpeg", "clue1.jpg")
            .await
            .unwrap();

        assert_eq!(clue, ClueId::Clue01);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_model_mode_parses_reply() {
        let model = FakeModel::new(Reply::Text("clue_02"));
        let classifier = classifier_with(model.clone());

        assert_eq!(classifier.mode_for("IMG_0042.jpg"), ClassificationMode::Model);
        let clue = classifier
            .classify(b"img", "image/jpeg", "IMG_0042.jpg")
            .await
            .unwrap();

        assert_eq!(clue, ClueId::Clue02);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_model_failure_maps_to_none() {
        let classifier = classifier_with(FakeModel::new(Reply::Unavailable));
        let clue = classifier
            .classify(b"img", "image/jpeg", "IMG_0042.jpg")
            .await
            .unwrap();
        assert_eq!(clue, ClueId::None);
    }

    #[tokio::test]
    async fn test_credential_failure_is_reported() {
        let classifier = classifier_with(FakeModel::new(Reply::MissingKey));
        let err = classifier
            .classify(b"img", "image/jpeg", "IMG_0042.jpg")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
