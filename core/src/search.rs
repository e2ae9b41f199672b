use crate::document::{DocId, Document};
use crate::error::RetrievalError;
use crate::index::{tf_weight, Index, TermId};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: f32,
    pub document: Document,
}

/// Ranked hits, highest score first; equal scores keep corpus order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub hits: Vec<ScoredDocument>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn top(&self) -> Option<&ScoredDocument> {
        self.hits.first()
    }

    /// Keep only hits scoring strictly above `min_score`.
    pub fn above(mut self, min_score: f32) -> Self {
        self.hits.retain(|h| h.score > min_score);
        self
    }
}

/// Rank the documents of `index` against `query` by TF-IDF cosine similarity and return the top `k`.
pub fn search(index: &Index, query: &str, k: usize) -> Result<RetrievalResult, RetrievalError> {
    if k == 0 || index.is_empty() {
        return Ok(RetrievalResult::default());
    }

    // Tokenize query and build tf map; BTreeMap keeps term order stable across calls.
    let mut tf_q_raw: BTreeMap<TermId, u32> = BTreeMap::new();
    for term in tokenize(query) {
        if let Some(tid) = index.term_id(&term) {
            *tf_q_raw.entry(tid).or_insert(0) += 1;
        }
    }
    // Edge case: empty after filtering
    if tf_q_raw.is_empty() {
        return Ok(RetrievalResult::default());
    }

    let q_weights: Vec<(TermId, f32)> = tf_q_raw
        .iter()
        .map(|(&tid, &tf_raw)| (tid, tf_weight(tf_raw) * index.idf(tid)))
        .collect();
    let mut norm = q_weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm == 0.0 {
        norm = 1.0;
    }

    // Aggregate scores from postings
    let mut scores: HashMap<DocId, f32> = HashMap::new();
    for (tid, q_w) in q_weights {
        let q_w = q_w / norm;
        for p in index.postings(tid) {
            *scores.entry(p.doc_id).or_insert(0.0) += p.weight * q_w; // cosine since doc weights are normalized
        }
    }

    let mut scored: Vec<(DocId, f32)> = scores.into_iter().filter(|(_, s)| *s != 0.0).collect();
    if let Some(&(doc, _)) = scored.iter().find(|(_, s)| !s.is_finite()) {
        return Err(RetrievalError::NonFiniteScore { doc });
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);

    let hits = scored
        .into_iter()
        .filter_map(|(doc_id, score)| {
            index.document(doc_id).map(|document| ScoredDocument {
                doc_id,
                score,
                document: document.clone(),
            })
        })
        .collect();
    Ok(RetrievalResult { hits })
}
