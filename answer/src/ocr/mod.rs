//! Image-to-text extraction for screenshots attached to questions.
//!
//! Extraction is best effort: the pipeline logs failures and carries on with the question alone.

mod gemini;
pub mod tesseract;

use std::future::Future;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::llm::{GeminiClient, LlmError};
pub use tesseract::TesseractCli;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("image is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("unsupported image format")]
    UnsupportedImage,

    #[error("OCR service error: {0}")]
    Service(#[from] LlmError),

    #[error("OCR process failed: {0}")]
    Process(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait TextExtractor: Send + Sync {
    /// Extract plain text from encoded image bytes (PNG, JPEG, ...).
    fn extract_text(&self, image: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send;
}

impl<T: TextExtractor> TextExtractor for Arc<T> {
    fn extract_text(&self, image: &[u8]) -> impl Future<Output = Result<String, OcrError>> + Send {
        (**self).extract_text(image)
    }
}

/// OCR back end selected at startup.
#[derive(Debug)]
pub enum OcrBackend {
    Gemini(GeminiClient),
    Tesseract(TesseractCli),
    Disabled,
}

impl TextExtractor for OcrBackend {
    async fn extract_text(&self, image: &[u8]) -> Result<String, OcrError> {
        match self {
            OcrBackend::Gemini(client) => client.extract_text(image).await,
            OcrBackend::Tesseract(cli) => cli.extract_text(image).await,
            OcrBackend::Disabled => Ok(String::new()),
        }
    }
}

/// Decode a base64 image as sent by clients, with or without a `data:<mime>;base64,` prefix.
pub fn decode_image(encoded: &str) -> Result<Vec<u8>, OcrError> {
    let payload = match encoded.trim().strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => encoded,
    };
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Detect the image MIME type from magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}
