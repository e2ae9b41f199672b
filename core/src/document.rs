use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Position of a document inside an [`Index`](crate::Index), in corpus order.
pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    CourseContent,
    DiscoursePost,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::CourseContent => "COURSE CONTENT",
            DocumentKind::DiscoursePost => "DISCOURSE POST",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A retrievable unit of text derived from one corpus record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// `course:<index>` or `post:<id>`.
    pub id: String,
    pub kind: DocumentKind,
    pub title: String,
    /// Normalized body used for scoring and for prompt context. Never empty.
    pub text: String,
    pub source_url: Option<String>,
    /// Display-only attributes (module, week, author, ...). Not scored.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    /// The link target for this document, if it has a non-empty one.
    pub fn url(&self) -> Option<&str> {
        self.source_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// First `max_chars` characters of the text, with `...` appended when cut.
    pub fn excerpt(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.text[..cut]),
            None => self.text.clone(),
        }
    }
}
