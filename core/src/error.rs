use crate::DocId;
use std::path::PathBuf;
use thiserror::Error;

/// A corpus file could not be turned into records at all. Individual bad records never raise this.
#[derive(Debug, Error)]
pub enum CorpusLoadError {
    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("corpus file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("corpus file {path} must contain a JSON array of records")]
    NotAnArray { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("scoring produced a non-finite value for document {doc}")]
    NonFiniteScore { doc: DocId },
}
