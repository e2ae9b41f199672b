pub mod cost;
pub mod llm;
pub mod ocr;
pub mod pipeline;
pub mod synthesizer;

pub const USER_AGENT: &str = concat!("virtual-ta/", env!("CARGO_PKG_VERSION"));

pub use llm::{GeminiClient, LanguageModelClient, LlmError};
pub use ocr::{OcrBackend, OcrError, TesseractCli, TextExtractor};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError, QuestionRequest};
pub use synthesizer::{AnswerResponse, Link, Synthesizer, FALLBACK_ANSWER};
