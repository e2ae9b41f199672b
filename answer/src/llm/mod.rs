pub mod gemini;
pub mod types;

use std::future::Future;
use std::sync::Arc;

pub use gemini::GeminiClient;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY not set. Get one at https://aistudio.google.com/apikey")]
    ApiKeyNotSet,

    #[error("API rate limit exceeded. Please retry later.")]
    RateLimited,

    #[error("API quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("request to the language model timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(e)
        }
    }
}

impl LlmError {
    /// True when the service could not be reached or kept failing on its side.
    /// Rate limiting and 5xx responses count only once the client's retries have run out.
    /// Anything else means the service answered and refused, which callers may recover from.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            LlmError::Timeout
                | LlmError::Network(_)
                | LlmError::RateLimited
                | LlmError::Api {
                    code: 500..=599,
                    ..
                }
        )
    }
}

/// Text generation by a large language model.
/// Implemented by `GeminiClient` for production; deterministic stubs are used in tests.
pub trait LanguageModelClient: Send + Sync {
    /// Send one prompt and return the model's text output, which may be empty.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;
}

impl<T: LanguageModelClient> LanguageModelClient for Arc<T> {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send {
        (**self).generate(prompt)
    }
}
