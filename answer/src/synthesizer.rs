//! Prompt assembly, the single model call, and parsing of the model output into an [`AnswerResponse`].

use std::collections::HashSet;
use std::fmt::Write as _;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ta_core::RetrievalResult;
use tracing::{debug, warn};

use crate::llm::{LanguageModelClient, LlmError};

pub const FALLBACK_ANSWER: &str = "I don't have enough information to answer this question.";

/// Characters of document text shown as the label of a link.
const LINK_TEXT_CHARS: usize = 100;

lazy_static! {
    static ref CITATION: Regex = Regex::new(r"\[(\d{1,3})\]").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub links: Vec<Link>,
}

impl AnswerResponse {
    pub fn fallback() -> Self {
        Self {
            answer: FALLBACK_ANSWER.to_string(),
            links: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.answer == FALLBACK_ANSWER && self.links.is_empty()
    }
}

/// The model's answer plus the 1-based numbers of the context blocks it cited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAnswer {
    pub answer: String,
    pub sources: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct RawModelAnswer {
    answer: Option<String>,
    #[serde(default)]
    sources: Option<Value>,
}

pub struct Synthesizer<L> {
    llm: L,
    max_links: usize,
    context_chars: usize,
}

impl<L: LanguageModelClient> Synthesizer<L> {
    pub fn new(llm: L, max_links: usize, context_chars: usize) -> Self {
        Self { llm, max_links, context_chars }
    }

    /// Answer `question` from `context` with one model call.
    ///
    /// Unparseable output and refused requests produce the fallback answer. Only failures that
    /// mean the model could not be reached are returned as errors.
    pub async fn synthesize(&self, question: &str, context: &RetrievalResult) -> Result<AnswerResponse, LlmError> {
        if context.is_empty() {
            debug!("no supporting context; skipping model call");
            return Ok(AnswerResponse::fallback());
        }

        let prompt = build_prompt(question, context, self.context_chars);
        let raw = match self.llm.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) if e.is_unreachable() => return Err(e),
            Err(e) => {
                warn!(error = %e, "language model refused the request; using fallback answer");
                return Ok(AnswerResponse::fallback());
            }
        };

        let Some(parsed) = parse_model_output(&raw) else {
            warn!(chars = raw.len(), "unparseable model output; using fallback answer");
            return Ok(AnswerResponse::fallback());
        };
        if parsed.answer == FALLBACK_ANSWER {
            return Ok(AnswerResponse::fallback());
        }
        let links = collect_links(&parsed.sources, context, self.max_links);
        Ok(AnswerResponse { answer: parsed.answer, links })
    }
}

pub fn build_prompt(question: &str, context: &RetrievalResult, context_chars: usize) -> String {
    let mut blocks = String::new();
    for (n, hit) in context.hits.iter().enumerate() {
        let doc = &hit.document;
        let _ = writeln!(blocks, "[{}] {}: {}", n + 1, doc.kind, doc.title);
        let _ = writeln!(blocks, "Source: {}", doc.url().unwrap_or("course notes (no link)"));
        let _ = writeln!(blocks, "{}\n", doc.excerpt(context_chars));
    }

    format!(
        "You are a Teaching Assistant for a Technical Data Science course. Answer the student's question \
using only the numbered context blocks below, taken from the course materials and the course discussion forum.

Context:
{blocks}
Student question: {question}

Rules:
- Use only facts stated in the context. If the context does not answer the question, set \"answer\" to \
\"{FALLBACK_ANSWER}\" and leave \"sources\" empty.
- Be precise about commands, model names, numbers and deadlines mentioned in the context.
- List in \"sources\" the number of every context block you relied on.

Respond with a single JSON object and nothing else:
{{\"answer\": \"<your answer>\", \"sources\": [<block numbers>]}}
"
    )
}

/// Parse model output into an answer and cited block numbers.
///
/// Accepts the JSON object requested by the prompt, optionally inside a Markdown code fence. Plain
/// text is accepted as the answer, with citations read from `[n]` markers. Returns `None` when
/// there is no usable answer.
pub fn parse_model_output(raw: &str) -> Option<ModelAnswer> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return None;
    }

    if let Ok(parsed) = serde_json::from_str::<RawModelAnswer>(body) {
        let answer = parsed.answer.map(|a| a.trim().to_string()).filter(|a| !a.is_empty())?;
        let sources = parsed.sources.as_ref().map(cited_numbers).unwrap_or_default();
        return Some(ModelAnswer { answer, sources });
    }
    if body.starts_with('{') {
        // Truncated or otherwise broken JSON.
        return None;
    }

    let sources = CITATION
        .captures_iter(body)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    Some(ModelAnswer { answer: body.to_string(), sources })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Block numbers from a `sources` field: an array, a single number, or a string such as `"1, 3"`.
/// Any other shape cites nothing.
fn cited_numbers(value: &Value) -> Vec<usize> {
    match value {
        Value::Array(items) => items.iter().filter_map(source_number).collect(),
        Value::Number(_) => source_number(value).into_iter().collect(),
        Value::String(s) => s
            .split(',')
            .filter_map(|part| source_number(&Value::String(part.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn source_number(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().trim_start_matches('[').trim_end_matches(']').parse().ok(),
        _ => None,
    }
}

/// Map cited block numbers to links: unknown numbers dropped, URLs deduplicated, empty URLs skipped.
pub fn collect_links(sources: &[usize], context: &RetrievalResult, max_links: usize) -> Vec<Link> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter_map(|&n| n.checked_sub(1).and_then(|i| context.hits.get(i)))
        .filter_map(|hit| {
            let url = hit.document.url()?;
            seen.insert(url.to_string()).then(|| Link {
                url: url.to_string(),
                text: hit.document.excerpt(LINK_TEXT_CHARS),
            })
        })
        .take(max_links)
        .collect()
}
