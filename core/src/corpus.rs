//! Loading of the two static corpora (course content and forum posts) into [`Document`]s.
//!
//! Files are parsed as a JSON array first; each element is then validated on its own so a
//! single bad record is skipped and counted instead of failing the whole load.

use crate::document::{Document, DocumentKind};
use crate::error::CorpusLoadError;
use crate::tokenizer::collapse_whitespace;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]+>").expect("valid regex");
}

const INLINE_ORIGIN: &str = "<inline>";

/// Documents produced from one corpus file plus the number of records that failed validation.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub skipped: usize,
}

/// Both corpora, concatenated in load order: course content first, then forum posts.
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub course_documents: usize,
    pub discourse_documents: usize,
    pub skipped: usize,
}

impl Corpus {
    pub fn load(course_path: impl AsRef<Path>, discourse_path: impl AsRef<Path>) -> Result<Self, CorpusLoadError> {
        let course = load_course_content(course_path)?;
        let posts = load_discourse_posts(discourse_path)?;
        Ok(Self::from_reports(course, posts))
    }

    pub fn from_reports(course: LoadReport, posts: LoadReport) -> Self {
        let course_documents = course.documents.len();
        let discourse_documents = posts.documents.len();
        let mut documents = course.documents;
        documents.extend(posts.documents);
        Self {
            documents,
            course_documents,
            discourse_documents,
            skipped: course.skipped + posts.skipped,
        }
    }
}

/// `module` and `week` show up both as strings and as numbers in exported course data.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(s) => f.write_str(s.trim()),
            Scalar::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CourseRecord {
    title: Option<String>,
    content: Option<String>,
    module: Option<Scalar>,
    week: Option<Scalar>,
    #[serde(rename = "type")]
    kind: Option<String>,
    description: Option<String>,
    text: Option<String>,
    body: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscourseRecord {
    id: Option<Scalar>,
    title: Option<String>,
    url: Option<String>,
    raw: Option<String>,
    cooked: Option<String>,
    created_at: Option<String>,
    author: Option<String>,
}

#[derive(Debug)]
enum Invalid {
    Shape(serde_json::Error),
    Missing(&'static str),
    EmptyText,
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invalid::Shape(e) => write!(f, "unexpected shape: {e}"),
            Invalid::Missing(field) => write!(f, "missing or blank field `{field}`"),
            Invalid::EmptyText => f.write_str("no text left after normalization"),
        }
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, Invalid> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(Invalid::Missing(field))
}

fn required_scalar(value: Option<Scalar>, field: &'static str) -> Result<String, Invalid> {
    required(value.map(|v| v.to_string()), field)
}

/// Remove HTML tags and decode the handful of entities forum exports use.
pub fn strip_html(html: &str) -> String {
    HTML_TAG
        .replace_all(html, " ")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn document_text(title: &str, body_parts: &[&str]) -> Result<String, Invalid> {
    let body = collapse_whitespace(&body_parts.join(" "));
    if body.is_empty() {
        return Err(Invalid::EmptyText);
    }
    Ok(collapse_whitespace(&format!("{title} {body}")))
}

fn course_document(position: usize, value: Value) -> Result<Document, Invalid> {
    let record: CourseRecord = serde_json::from_value(value).map_err(Invalid::Shape)?;
    let title = required(record.title, "title")?;
    let content = required(record.content, "content")?;
    let module = required_scalar(record.module, "module")?;
    let week = required_scalar(record.week, "week")?;
    let kind = required(record.kind, "type")?;

    let extras: Vec<String> = [record.description, record.text, record.body, record.summary]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    let mut parts = vec![content.as_str()];
    parts.extend(extras.iter().map(String::as_str));
    let text = document_text(&title, &parts)?;

    let mut metadata = BTreeMap::new();
    metadata.insert("module".to_string(), module);
    metadata.insert("week".to_string(), week);
    metadata.insert("type".to_string(), kind);

    Ok(Document {
        id: format!("course:{position}"),
        kind: DocumentKind::CourseContent,
        title,
        text,
        source_url: None,
        metadata,
    })
}

fn discourse_document(value: Value) -> Result<Document, Invalid> {
    let record: DiscourseRecord = serde_json::from_value(value).map_err(Invalid::Shape)?;
    let id = required_scalar(record.id, "id")?;
    let title = required(record.title, "title")?;
    let url = required(record.url, "url")?;
    let raw = record.raw.ok_or(Invalid::Missing("raw"))?;
    let created_at = required(record.created_at, "created_at")?;
    let author = required(record.author, "author")?;

    let body = if raw.trim().is_empty() {
        record.cooked.as_deref().map(strip_html).unwrap_or_default()
    } else {
        raw
    };
    let text = document_text(&title, &[body.as_str()])?;

    let mut metadata = BTreeMap::new();
    metadata.insert("author".to_string(), author);
    metadata.insert("created_at".to_string(), created_at);

    Ok(Document {
        id: format!("post:{id}"),
        kind: DocumentKind::DiscoursePost,
        title,
        text,
        source_url: Some(url),
        metadata,
    })
}

fn parse_records<F>(bytes: &[u8], origin: &Path, mut convert: F) -> Result<LoadReport, CorpusLoadError>
where
    F: FnMut(usize, Value) -> Result<Document, Invalid>,
{
    let json: Value = serde_json::from_slice(bytes).map_err(|source| CorpusLoadError::Json {
        path: origin.to_path_buf(),
        source,
    })?;
    let Value::Array(records) = json else {
        return Err(CorpusLoadError::NotAnArray { path: origin.to_path_buf() });
    };

    let mut report = LoadReport::default();
    for (position, record) in records.into_iter().enumerate() {
        match convert(position, record) {
            Ok(doc) => report.documents.push(doc),
            Err(reason) => {
                tracing::debug!(origin = %origin.display(), position, %reason, "skipping corpus record");
                report.skipped += 1;
            }
        }
    }
    tracing::info!(
        origin = %origin.display(),
        documents = report.documents.len(),
        skipped = report.skipped,
        "loaded corpus"
    );
    Ok(report)
}

fn read(path: &Path) -> Result<Vec<u8>, CorpusLoadError> {
    std::fs::read(path).map_err(|source| CorpusLoadError::Io {
        path: PathBuf::from(path),
        source,
    })
}

pub fn parse_course_content(bytes: &[u8]) -> Result<LoadReport, CorpusLoadError> {
    parse_records(bytes, Path::new(INLINE_ORIGIN), course_document)
}

pub fn parse_discourse_posts(bytes: &[u8]) -> Result<LoadReport, CorpusLoadError> {
    parse_records(bytes, Path::new(INLINE_ORIGIN), |_, value| discourse_document(value))
}

pub fn load_course_content(path: impl AsRef<Path>) -> Result<LoadReport, CorpusLoadError> {
    let path = path.as_ref();
    parse_records(&read(path)?, path, course_document)
}

pub fn load_discourse_posts(path: impl AsRef<Path>) -> Result<LoadReport, CorpusLoadError> {
    let path = path.as_ref();
    parse_records(&read(path)?, path, |_, value| discourse_document(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_record_maps_to_document() {
        let json = br#"[{"title": "Week 1: Setup", "content": "Install  uv\nand python.", "module": "Tools", "week": 1, "type": "notes", "summary": "Setup steps"}]"#;
        let report = parse_course_content(json).unwrap();
        assert_eq!(report.skipped, 0);
        let doc = &report.documents[0];
        assert_eq!(doc.id, "course:0");
        assert_eq!(doc.kind, DocumentKind::CourseContent);
        assert_eq!(doc.text, "Week 1: Setup Install uv and python. Setup steps");
        assert_eq!(doc.metadata["week"], "1");
        assert_eq!(doc.metadata["type"], "notes");
        assert!(doc.source_url.is_none());
    }

    #[test]
    fn course_record_missing_content_is_skipped() {
        let json = br#"[
            {"title": "A", "module": "m", "week": "1", "type": "notes"},
            {"title": "B", "content": "body", "module": "m", "week": "2", "type": "notes"}
        ]"#;
        let report = parse_course_content(json).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].id, "course:1");
    }

    #[test]
    fn discourse_blank_raw_falls_back_to_cooked() {
        let json = br#"[{"id": 7, "title": "Docker", "url": "https://d/t/7", "raw": "", "cooked": "<p>Use <b>podman</b> &amp; docker</p>", "created_at": "2025-01-01", "author": "ta"}]"#;
        let report = parse_discourse_posts(json).unwrap();
        let doc = &report.documents[0];
        assert_eq!(doc.id, "post:7");
        assert_eq!(doc.text, "Docker Use podman & docker");
        assert_eq!(doc.url(), Some("https://d/t/7"));
        assert_eq!(doc.metadata["author"], "ta");
    }

    #[test]
    fn discourse_record_without_raw_is_skipped() {
        let json = br#"[{"id": 1, "title": "t", "url": "u", "cooked": "<p>x</p>", "created_at": "c", "author": "a"}]"#;
        let report = parse_discourse_posts(json).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(report.documents.is_empty());
    }

    #[test]
    fn wrongly_typed_field_skips_only_that_record() {
        let json = br#"[{"id": 1, "title": 42, "url": "u", "raw": "r", "created_at": "c", "author": "a"}, "junk"]"#;
        let report = parse_discourse_posts(json).unwrap();
        assert_eq!(report.skipped, 2);
    }

    #[test]
    fn non_array_file_is_an_error() {
        let err = parse_course_content(br#"{"title": "x"}"#).unwrap_err();
        assert!(matches!(err, CorpusLoadError::NotAnArray { .. }));
        let err = parse_course_content(b"not json").unwrap_err();
        assert!(matches!(err, CorpusLoadError::Json { .. }));
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(collapse_whitespace(&strip_html("<p>a<br/>b</p>")), "a b");
    }
}
