//! Token-cost note for questions about pricing input text for gpt-3.5-turbo style models.

use lazy_static::lazy_static;
use tiktoken_rs::CoreBPE;

/// Input price used in the note.
pub const CENTS_PER_MILLION_TOKENS: f64 = 50.0;

const KEYWORDS: [&str; 5] = ["token", "cost", "cents", "gpt-3.5", "turbo"];

lazy_static! {
    static ref CL100K: Option<CoreBPE> = match tiktoken_rs::cl100k_base() {
        Ok(bpe) => Some(bpe),
        Err(e) => {
            tracing::warn!(error = %e, "cl100k_base encoding unavailable; token-cost notes disabled");
            None
        }
    };
}

/// True when the question asks about tokens, cost or gpt-3.5-turbo.
pub fn mentions_token_cost(question: &str) -> bool {
    let lower = question.to_lowercase();
    KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Number of `cl100k_base` tokens in `text`.
pub fn count_tokens(text: &str) -> Option<usize> {
    CL100K.as_ref().map(|bpe| bpe.encode_with_special_tokens(text).len())
}

pub fn cost_cents(tokens: usize) -> f64 {
    tokens as f64 / 1_000_000.0 * CENTS_PER_MILLION_TOKENS
}

/// Note appended to answers when image text was supplied with a token-cost question.
pub fn token_cost_note(image_text: &str) -> Option<String> {
    let cents = cost_cents(count_tokens(image_text)?);
    Some(format!(
        "Note: If this question is about calculating token costs, the input would cost approximately \
{cents:.5} cents (assuming 50 cents per million input tokens)."
    ))
}
