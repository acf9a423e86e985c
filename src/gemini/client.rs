use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, Part};
use crate::classifier::VisionModel;
use crate::config::{GeminiConfig, RequestConfig};
use crate::error::{GeminiError, GeminiResult};

/// Client for the Gemini `generateContent` API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Errors
    /// `GeminiError::MissingApiKey` when no key is configured.
    pub fn new(config: &GeminiConfig, request_config: RequestConfig) -> GeminiResult<Self> {
        let api_key = config.api_key.clone().ok_or(GeminiError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(GeminiError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            request_config,
        })
    }

    /// Call `generateContent` once. No retries.
    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> GeminiResult<GenerateContentResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let start = Instant::now();

        debug!(model = %self.model, "Calling Gemini generateContent");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeminiError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    GeminiError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = map_http_error(status, body);
            error!(
                model = %self.model,
                status = status.as_u16(),
                error = %err,
                latency_ms = start.elapsed().as_millis(),
                "Gemini call failed"
            );
            return Err(err);
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| GeminiError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        info!(
            model = %self.model,
            latency_ms = start.elapsed().as_millis(),
            "Gemini call succeeded"
        );

        Ok(parsed)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn describe_image(
        &self,
        instruction: &str,
        mime_type: &str,
        image: &[u8],
    ) -> GeminiResult<String> {
        let request = GenerateContentRequest::new(vec![
            Part::text(instruction),
            Part::inline_bytes(mime_type, image),
        ]);

        self.generate_content(&request)
            .await?
            .text()
            .ok_or_else(|| GeminiError::InvalidResponse {
                message: "Gemini returned no text in the response candidates".to_string(),
            })
    }
}

/// Map a non-2xx response, singling out credential problems.
fn map_http_error(status: StatusCode, body: String) -> GeminiError {
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.describe())
        .unwrap_or_else(|_| body.clone());

    let upper = body.to_uppercase();
    let names_key = upper.contains("API_KEY") || upper.contains("API KEY");

    if names_key || matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return GeminiError::InvalidApiKey { message };
    }

    GeminiError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_api_key() {
        let result = GeminiClient::new(&GeminiConfig::default(), RequestConfig::default());
        assert!(matches!(result, Err(GeminiError::MissingApiKey)));
    }

    #[test]
    fn test_client_creation() {
        let config = GeminiConfig {
            api_key: Some("test_key".to_string()),
            base_url: "https://example.test/v1beta/".to_string(),
            model: "gemini-1.5-flash".to_string(),
        };

        let client = GeminiClient::new(&config, RequestConfig::default()).unwrap();
        assert_eq!(client.base_url(), "https://example.test/v1beta");
        assert_eq!(client.model(), "gemini-1.5-flash");
    }

    #[test]
    fn test_map_http_error_invalid_key() {
        let body = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        let err = map_http_error(StatusCode::BAD_REQUEST, body.to_string());
        assert!(err.is_credential());
        assert!(err.to_string().contains("INVALID_ARGUMENT"));
    }

    #[test]
    fn test_map_http_error_forbidden() {
        let err = map_http_error(StatusCode::FORBIDDEN, "denied".to_string());
        assert!(matches!(err, GeminiError::InvalidApiKey { .. }));
    }

    #[test]
    fn test_map_http_error_names_key_on_any_status() {
        let body = r#"{"error":{"code":429,"message":"Requests from this API_KEY are blocked.","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, body.to_string());
        assert!(err.is_credential());
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));

        let err = map_http_error(StatusCode::INTERNAL_SERVER_ERROR, "api key expired".to_string());
        assert!(matches!(err, GeminiError::InvalidApiKey { .. }));
    }

    #[test]
    fn test_map_http_error_other() {
        let err = map_http_error(StatusCode::BAD_REQUEST, "image too large".to_string());
        assert!(matches!(err, GeminiError::Api { status: 400, .. }));

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, String::new());
        assert!(matches!(err, GeminiError::Api { status: 503, .. }));
    }
}
