pub mod corpus;
pub mod document;
pub mod error;
pub mod index;
pub mod search;
pub mod tokenizer;

pub use corpus::{Corpus, LoadReport};
pub use document::{DocId, Document, DocumentKind};
pub use error::{CorpusLoadError, RetrievalError};
pub use index::{Index, IndexOptions, Posting, TermId};
pub use search::{search, RetrievalResult, ScoredDocument};
