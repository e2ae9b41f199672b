use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use ta_core::{search, Index, RetrievalError};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::cost::{mentions_token_cost, token_cost_note};
use crate::llm::{LanguageModelClient, LlmError};
use crate::ocr::{decode_image, TextExtractor};
use crate::synthesizer::{AnswerResponse, Synthesizer};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of documents retrieved per question.
    pub top_k: usize,
    pub max_links: usize,
    /// Hits scoring at or below this are not passed to the model.
    pub min_score: f32,
    /// Characters of each document included in the prompt.
    pub context_chars: usize,
    /// Deadline for each external stage (OCR, answer synthesis).
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_links: 5,
            min_score: 0.0,
            context_chars: 1000,
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Inbound question. `image` is base64, optionally as a data URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl QuestionRequest {
    pub fn text(question: impl Into<String>) -> Self {
        Self { question: question.into(), image: None }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("answer synthesis timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("language model service unavailable: {0}")]
    Unavailable(#[source] LlmError),
}

/// Per-request flow: validate, OCR the optional image, retrieve, synthesize.
///
/// Holds the shared read-only index; safe to call concurrently from many tasks.
pub struct Pipeline<L, O> {
    index: Arc<Index>,
    synthesizer: Synthesizer<L>,
    ocr: O,
    config: PipelineConfig,
}

impl<L: LanguageModelClient, O: TextExtractor> Pipeline<L, O> {
    pub fn new(index: Arc<Index>, llm: L, ocr: O, config: PipelineConfig) -> Self {
        let synthesizer = Synthesizer::new(llm, config.max_links, config.context_chars);
        Self { index, synthesizer, ocr, config }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn answer(&self, request: &QuestionRequest) -> Result<AnswerResponse, PipelineError> {
        let started = Instant::now();
        let question = request.question.trim();
        if question.is_empty() {
            return Err(PipelineError::Validation("Question is required".to_string()));
        }

        let mut query = question.to_string();
        let mut image_text = None;
        if let Some(image) = request.image.as_deref().filter(|i| !i.trim().is_empty()) {
            if let Some(text) = self.image_text(image).await {
                query = format!("{query}\n\nImage content: {text}");
                image_text = Some(text);
            }
        }

        let context = search(&self.index, &query, self.config.top_k)?.above(self.config.min_score);

        let mut response = match timeout(self.config.call_timeout, self.synthesizer.synthesize(&query, &context)).await {
            Ok(Ok(response)) => response,
            Ok(Err(LlmError::Timeout)) | Err(_) => {
                warn!(after = ?self.config.call_timeout, "answer synthesis timed out");
                return Err(PipelineError::Timeout { after: self.config.call_timeout });
            }
            Ok(Err(e)) => {
                warn!(error = %e, "language model unreachable");
                return Err(PipelineError::Unavailable(e));
            }
        };

        if let Some(text) = image_text.as_deref().filter(|_| mentions_token_cost(&query)) {
            if let Some(note) = token_cost_note(text) {
                response.answer = format!("{}\n\n{note}", response.answer);
            }
        }

        info!(
            hits = context.len(),
            links = response.links.len(),
            used_image = image_text.is_some(),
            fallback = response.is_fallback(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "answered question"
        );
        Ok(response)
    }

    /// Text extracted from the attached image, or `None` on any failure.
    async fn image_text(&self, encoded: &str) -> Option<String> {
        let bytes = match decode_image(encoded) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable image");
                return None;
            }
        };
        match timeout(self.config.call_timeout, self.ocr.extract_text(&bytes)).await {
            Ok(Ok(text)) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "image text extraction failed; continuing without it");
                None
            }
            Err(_) => {
                warn!(after = ?self.config.call_timeout, "image text extraction timed out; continuing without it");
                None
            }
        }
    }
}
