//! Gemini `generateContent` client used for both answer synthesis and image transcription.
//!
//! Every attempt is bounded by the configured call timeout, and answers request JSON output
//! with a fixed token budget and low temperature. Network errors, 429 and 5xx are retried with
//! jittered backoff, so callers see them only after the retries are exhausted.

use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ApiError, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use super::{LanguageModelClient, LlmError};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_OUTPUT_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.1;

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Client for the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn from_env(http: Client) -> Result<Self, LlmError> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| LlmError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(LlmError::ApiKeyNotSet);
        }
        let model = env::var("GEMINI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Per-attempt HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limited");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<GenerateContentResponse>(&text) {
                if let Some(err) = &body.error {
                    let classified = classify_api_error(err);
                    warn!(error = %classified, "Gemini API error");
                    return Err(classified);
                }
            }
            let snippet: String = text.chars().take(200).collect();
            warn!(status = %status, "Gemini API error (no structured body)");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        debug!(model = %self.model, finish_reason = ?body.finish_reason(), "gemini generation complete");

        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "Gemini API error in 200 response");
            return Err(classified);
        }

        Ok(body)
    }

    /// Send `request`, retrying transient failures with jittered exponential backoff.
    pub(crate) async fn send(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.generate_content(request).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(LlmError::RateLimited))
    }
}

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;

impl LanguageModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(prompt)])],
            generation_config: Some(GenerationConfig {
                max_output_tokens: MAX_OUTPUT_TOKENS,
                temperature: TEMPERATURE,
                response_mime_type: Some("application/json".to_string()),
            }),
        };
        let response = self.send(&request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            warn!(finish_reason = ?response.finish_reason(), "Gemini returned empty answer (safety filter or empty response)");
        }
        Ok(text)
    }
}

fn is_retriable(e: &LlmError) -> bool {
    matches!(
        e,
        LlmError::RateLimited
            | LlmError::Network(_)
            | LlmError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_api_error(err: &ApiError) -> LlmError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => LlmError::RateLimited,
        Some(403) => LlmError::QuotaExhausted(message),
        Some(code) => LlmError::Api { code, message },
        None => LlmError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn generate_returns_candidate_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {
                        "parts": [{"text": "{\"answer\": \"Use gpt-3.5\","}, {"text": " \"sources\": [1]}"}],
                        "role": "model"
                    },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri());
        let text = client.generate("prompt").await.unwrap();
        assert_eq!(text, "{\"answer\": \"Use gpt-3.5\", \"sources\": [1]}");
    }

    #[tokio::test]
    async fn generate_without_candidates_is_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri());
        assert_eq!(client.generate("prompt").await.unwrap(), "");
    }

    #[tokio::test]
    async fn generate_400_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "Invalid argument"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri());
        match client.generate("prompt").await {
            Err(LlmError::Api { code: 400, message }) => assert_eq!(message, "Invalid argument"),
            other => panic!("expected Api(400), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_500_retries_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(500).set_body_string("not json"))
            .expect(3)
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri());
        let result = client.generate("prompt").await;
        match &result {
            Err(LlmError::Api { code: 500, message }) => {
                assert!(message.contains("not json"), "expected body snippet in error, got: {message}");
            }
            other => panic!("expected Api(500), got: {other:?}"),
        }
        assert!(result.unwrap_err().is_unreachable());
    }

    #[tokio::test]
    async fn generate_200_with_error_field_returns_classified_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Quota exceeded"}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri());
        let result = client.generate("prompt").await;
        assert!(matches!(result, Err(LlmError::QuotaExhausted(_))));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url(Client::new(), &server.uri())
            .with_timeout(Duration::from_millis(50));
        assert!(matches!(client.generate("prompt").await, Err(LlmError::Timeout)));
    }
}
