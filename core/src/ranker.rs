//! Cosine ranking of documents against a free-text query.
//!
//! The query vector is a 0/1 indicator over the TF-IDF vocabulary, so with a
//! single active term every candidate whose only nonzero weight sits on that
//! term scores exactly 1 regardless of magnitude.

use crate::tokenizer::Normalizer;
use crate::{DocId, InvertedIndex, PostingList, WeightMatrix};
use serde::Serialize;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub score: f64,
    /// TF-IDF weight of each matched query term in this document. Diagnostic only.
    pub term_weights: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RankOutcome {
    /// None of the query terms is in the index.
    NoIndexedTerms,
    Ranked(Vec<RankedDoc>),
}

impl RankOutcome {
    pub fn is_empty(&self) -> bool {
        match self {
            RankOutcome::NoIndexedTerms => true,
            RankOutcome::Ranked(docs) => docs.is_empty(),
        }
    }

    pub fn into_results(self) -> Vec<RankedDoc> {
        match self {
            RankOutcome::NoIndexedTerms => Vec::new(),
            RankOutcome::Ranked(docs) => docs,
        }
    }
}

/// Read-only view over an index and its TF-IDF matrix.
pub struct VectorRanker<'a> {
    index: &'a InvertedIndex,
    weights: &'a WeightMatrix,
}

impl<'a> VectorRanker<'a> {
    pub fn new(index: &'a InvertedIndex, weights: &'a WeightMatrix) -> Self {
        Self { index, weights }
    }

    /// Normalize `text` and rank.
    pub fn search(&self, text: &str, normalizer: &Normalizer, top_n: usize) -> RankOutcome {
        self.rank(&normalizer.normalize(text), top_n)
    }

    /// Rank candidates for already-normalized query terms; best first, ties
    /// by ascending document ID, at most `top_n` results.
    pub fn rank<S: AsRef<str>>(&self, terms: &[S], top_n: usize) -> RankOutcome {
        let mut query_terms: Vec<&str> = Vec::new();
        for term in terms {
            let term: &str = term.as_ref();
            if self.index.contains_term(term) && !query_terms.contains(&term) {
                query_terms.push(term);
            }
        }
        if query_terms.is_empty() {
            tracing::debug!("no query term present in index");
            return RankOutcome::NoIndexedTerms;
        }

        let candidates = query_terms.iter().fold(PostingList::new(), |acc, term| {
            acc.union(self.index.postings(term).unwrap_or(&PostingList::new()))
        });

        // Rows set to 1 in the binary query vector.
        let query_rows: Vec<usize> = query_terms.iter().filter_map(|t| self.weights.row(t)).collect();
        let query_norm = (query_rows.len() as f64).sqrt();

        let mut ranked: Vec<RankedDoc> = candidates
            .iter()
            .map(|doc_id| {
                let score = match self.weights.column(doc_id) {
                    Some(col) => {
                        let dot: f64 = query_rows.iter().filter_map(|&row| self.weights.cell(row, col)).sum();
                        cosine(dot, query_norm, self.weights.column_norm(col))
                    }
                    None => {
                        tracing::warn!(doc_id, "candidate has no tf-idf column");
                        0.0
                    }
                };
                let term_weights = query_terms
                    .iter()
                    .filter(|t| self.weights.row(t).is_some())
                    .map(|t| (t.to_string(), self.weights.weight(t, doc_id)))
                    .collect();
                RankedDoc { doc_id, score, term_weights }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        ranked.truncate(top_n);
        RankOutcome::Ranked(ranked)
    }
}

fn cosine(dot: f64, a_norm: f64, b_norm: f64) -> f64 {
    if a_norm == 0.0 || b_norm == 0.0 {
        0.0
    } else {
        dot / (a_norm * b_norm)
    }
}
