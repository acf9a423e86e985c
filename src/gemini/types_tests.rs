//! Unit tests for Gemini API types.

use serde_json::json;

use super::*;

#[test]
fn test_text_part_serialization() {
    let value = serde_json::to_value(Part::text("hello")).unwrap();
    assert_eq!(value, json!({"text": "hello"}));
}

#[test]
fn test_inline_part_serialization() {
    let value = serde_json::to_value(Part::inline_bytes("image/png", b"abc")).unwrap();
    assert_eq!(
        value,
        json!({"inlineData": {"mimeType": "image/png", "data": "YWJj"}})
    );
}

#[test]
fn test_request_serialization() {
    let request = GenerateContentRequest::new(vec![Part::text("classify")]);
    let value = serde_json::to_value(&request).unwrap();

    assert_eq!(value["contents"][0]["role"], "user");
    assert_eq!(value["contents"][0]["parts"][0]["text"], "classify");
    assert_eq!(value.as_object().unwrap().len(), 1);
}

#[test]
fn test_response_text_joins_parts() {
    let response: GenerateContentResponse = serde_json::from_value(json!({
        "candidates": [{
            "content": {"parts": [{"text": "CLUE"}, {"text": "_02"}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 2, "totalTokenCount": 12}
    }))
    .unwrap();

    assert_eq!(response.text().as_deref(), Some("CLUE_02"));
    assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(12));
}

#[test]
fn test_response_without_candidates() {
    let response: GenerateContentResponse =
        serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
    assert!(response.text().is_none());
}

#[test]
fn test_error_envelope_describe() {
    let envelope: ErrorEnvelope = serde_json::from_value(json!({
        "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
    }))
    .unwrap();
    assert_eq!(envelope.describe(), "INVALID_ARGUMENT: API key not valid.");
}
