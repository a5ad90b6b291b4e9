//! BM25 keyword index over candidate text.
//!
//! Built once per corpus snapshot and read-only afterwards, so concurrent
//! queries share it without locking.
//!
//! score(d, q) = Σ_{t∈q} idf(t) · f(t,d)·(k1+1) / (f(t,d) + k1·(1 − b + b·|d|/avgdl))
//! idf(t)      = ln((N − n(t) + 0.5) / (n(t) + 0.5) + 1)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::retrieval::tokenizer::tokenize;
use crate::retrieval::types::{rank_scored, CandidateRecord, RankedHit};

/// BM25 constants. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone)]
struct Posting {
    doc: u32,
    term_frequency: u32,
}

/// Inverted index: term → postings, plus per-document lengths for
/// length normalization.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    params: Bm25Params,
    postings: HashMap<String, Vec<Posting>>,
    doc_ids: Vec<String>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f64,
}

impl LexicalIndex {
    /// Tokenizes every record and builds postings in corpus order.
    /// Records with no terms still count toward N and avgdl.
    pub fn build(records: &[impl AsRef<CandidateRecord>], params: Bm25Params) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_ids = Vec::with_capacity(records.len());
        let mut doc_lengths = Vec::with_capacity(records.len());
        let mut total_length: u64 = 0;

        for (doc, record) in records.iter().enumerate() {
            let record = record.as_ref();
            let tokens = tokenize(&record.normalized_text);
            let doc_len = tokens.len() as u32;
            total_length += u64::from(doc_len);

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for (term, term_frequency) in tf {
                postings.entry(term).or_default().push(Posting {
                    doc: doc as u32,
                    term_frequency,
                });
            }

            doc_ids.push(record.id.clone());
            doc_lengths.push(doc_len);
        }

        let avg_doc_length = if doc_ids.is_empty() {
            0.0
        } else {
            total_length as f64 / doc_ids.len() as f64
        };

        Self {
            params,
            postings,
            doc_ids,
            doc_lengths,
            avg_doc_length,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    #[cfg(test)]
    pub fn average_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    /// Number of candidates containing `term` (already case-folded).
    #[cfg(test)]
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    /// Scores every candidate sharing at least one term with `query`.
    /// Candidates without overlap are absent from the result, not scored zero.
    pub fn search(&self, query: &str) -> Vec<RankedHit> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.is_empty() || self.avg_doc_length == 0.0 {
            return Vec::new();
        }

        let Bm25Params { k1, b } = self.params;
        let n = self.doc_ids.len() as f64;
        let mut scores: HashMap<u32, f64> = HashMap::new();

        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let df = postings.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

            for posting in postings {
                let dl = f64::from(self.doc_lengths[posting.doc as usize]);
                let tf = f64::from(posting.term_frequency);
                let norm = tf + k1 * (1.0 - b + b * dl / self.avg_doc_length);
                *scores.entry(posting.doc).or_insert(0.0) += idf * (tf * (k1 + 1.0)) / norm;
            }
        }

        rank_scored(
            scores
                .into_iter()
                .map(|(doc, score)| (self.doc_ids[doc as usize].clone(), score))
                .collect(),
        )
    }
}
