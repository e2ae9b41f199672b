use crate::document::{DocId, Document};
use crate::tokenizer::tokenize;
use std::collections::HashMap;

pub type TermId = u32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f32, // normalized tf-idf weight
}

#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    /// Use smoothed IDF = ln(1 + N/df) instead of ln(N/df).
    ///
    /// With plain IDF a term present in every document weighs zero, so a document made only of
    /// such terms can never be retrieved, not even by its own text.
    pub smoothed_idf: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { smoothed_idf: true }
    }
}

/// Immutable TF-IDF inverted index over an in-memory document collection.
///
/// Built once with [`Index::build`] and only read afterwards; share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Index {
    dictionary: HashMap<String, TermId>,
    idf: Vec<f32>,
    postings: Vec<Vec<Posting>>, // by term id, each sorted by doc_id
    docs: Vec<Document>,
}

impl Index {
    pub fn build(documents: Vec<Document>) -> Self {
        Self::build_with(documents, IndexOptions::default())
    }

    pub fn build_with(documents: Vec<Document>, options: IndexOptions) -> Self {
        let received = documents.len();
        // A document with no terms after normalization has no postings and could never be retrieved.
        let (docs, doc_tokens): (Vec<Document>, Vec<Vec<String>>) = documents
            .into_iter()
            .map(|d| {
                let tokens = tokenize(&d.text);
                (d, tokens)
            })
            .filter(|(_, tokens)| !tokens.is_empty())
            .unzip();
        if docs.len() < received {
            tracing::debug!(dropped = received - docs.len(), "documents without index terms excluded");
        }

        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        // Per document: (term, raw tf), sorted by term id.
        let mut doc_terms: Vec<Vec<(TermId, u32)>> = Vec::with_capacity(docs.len());

        for tokens in doc_tokens {
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for term in tokens {
                let next_id = dictionary.len() as TermId;
                let tid = *dictionary.entry(term).or_insert(next_id);
                if tid == next_id {
                    df.push(0);
                }
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            let mut terms: Vec<(TermId, u32)> = tf_counts.into_iter().collect();
            terms.sort_unstable_by_key(|(tid, _)| *tid);
            for (tid, _) in &terms {
                df[*tid as usize] += 1;
            }
            doc_terms.push(terms);
        }

        let n = docs.len().max(1) as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&df_t| {
                let ratio = n / df_t.max(1) as f32;
                if options.smoothed_idf { (1.0 + ratio).ln() } else { ratio.ln() }
            })
            .collect();

        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); dictionary.len()];
        for (doc_id, terms) in doc_terms.iter().enumerate() {
            let weights: Vec<(TermId, f32)> = terms
                .iter()
                .map(|&(tid, tf_raw)| (tid, tf_weight(tf_raw) * idf[tid as usize]))
                .collect();
            let mut norm = weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
            if norm == 0.0 {
                norm = 1.0;
            }
            for (tid, w) in weights {
                // Documents are visited in id order, so every postings list stays sorted.
                postings[tid as usize].push(Posting { doc_id: doc_id as DocId, weight: w / norm });
            }
        }

        tracing::info!(num_docs = docs.len(), num_terms = dictionary.len(), "index built");
        Self { dictionary, idf, postings, docs }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(doc_id as usize)
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    pub fn idf(&self, term_id: TermId) -> f32 {
        self.idf.get(term_id as usize).copied().unwrap_or(0.0)
    }

    pub fn postings(&self, term_id: TermId) -> &[Posting] {
        self.postings.get(term_id as usize).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Sublinear term frequency: 1 + ln(tf).
pub(crate) fn tf_weight(tf_raw: u32) -> f32 {
    if tf_raw > 0 { 1.0 + (tf_raw as f32).ln() } else { 0.0 }
}
