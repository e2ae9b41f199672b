use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

use super::{sniff_mime, OcrError, TextExtractor};
use crate::llm::types::{Content, GenerateContentRequest, GenerationConfig, Part};
use crate::llm::GeminiClient;

const TRANSCRIBE_PROMPT: &str = "Transcribe all text visible in this image exactly as written. \
    Output only the transcribed text, without commentary. If there is no text, output nothing.";

impl TextExtractor for GeminiClient {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        let mime = sniff_mime(image).ok_or(OcrError::UnsupportedImage)?;
        let request = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::inline(mime, STANDARD.encode(image)),
                Part::text(TRANSCRIBE_PROMPT),
            ])],
            generation_config: Some(GenerationConfig {
                max_output_tokens: 1024,
                temperature: 0.0,
                response_mime_type: None,
            }),
        };
        let response = self.send(&request).await?;
        let text = response.text().trim().to_string();
        debug!(mime, chars = text.len(), "gemini transcription complete");
        Ok(text)
    }
}
