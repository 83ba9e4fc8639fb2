//! TF, IDF and TF-IDF tables.
//!
//! `TF(t,d) = count(t,d) / |d|`, `IDF(t) = ln(N / df(t))`, and TF-IDF is the
//! cellwise product. Matrices are sparse: only cells defined for a
//! (term, document) pair are stored, and rows/columns are kept in sorted
//! lookup tables.

use crate::{Corpus, DocId, InvertedIndex};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Sparse term × document matrix. Rows are terms in lexicographic order,
/// columns are document IDs in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightMatrix {
    terms: Vec<String>,
    docs: Vec<DocId>,
    term_rows: HashMap<String, u32>,
    doc_cols: HashMap<DocId, u32>,
    cells: HashMap<(u32, u32), f64>,
    column_norms: Vec<f64>,
}

impl WeightMatrix {
    /// Build from `(term, doc, value)` triples; a repeated pair keeps the
    /// last value.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, DocId, f64)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let docs: BTreeSet<DocId> = entries.iter().map(|(_, d, _)| *d).collect();
        Self::assemble(docs, entries)
    }

    /// Like [`from_entries`](Self::from_entries) but with an explicit column
    /// set, so columns without any defined cell survive.
    pub fn with_columns<I>(docs: impl IntoIterator<Item = DocId>, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, DocId, f64)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        let mut columns: BTreeSet<DocId> = docs.into_iter().collect();
        columns.extend(entries.iter().map(|(_, d, _)| *d));
        Self::assemble(columns, entries)
    }

    fn assemble(docs: BTreeSet<DocId>, entries: Vec<(String, DocId, f64)>) -> Self {
        let terms: Vec<String> = entries
            .iter()
            .map(|(t, _, _)| t.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let docs: Vec<DocId> = docs.into_iter().collect();
        let term_rows: HashMap<String, u32> =
            terms.iter().enumerate().map(|(i, t)| (t.clone(), i as u32)).collect();
        let doc_cols: HashMap<DocId, u32> =
            docs.iter().enumerate().map(|(i, d)| (*d, i as u32)).collect();

        // Sorted first so norms are summed in a fixed order.
        let mut sorted = BTreeMap::new();
        for (term, doc, value) in entries {
            sorted.insert((term_rows[&term], doc_cols[&doc]), value);
        }
        let mut column_norms = vec![0.0f64; docs.len()];
        for (&(_, col), value) in &sorted {
            column_norms[col as usize] += value * value;
        }
        for norm in column_norms.iter_mut() {
            *norm = norm.sqrt();
        }
        let cells: HashMap<(u32, u32), f64> = sorted.into_iter().collect();
        Self { terms, docs, term_rows, doc_cols, cells, column_norms }
    }

    /// Copy without the rows whose cells are all zero (or undefined).
    /// Columns are kept as they are.
    pub fn without_zero_rows(&self) -> Self {
        let live: BTreeSet<u32> = self
            .cells
            .iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|(&(row, _), _)| row)
            .collect();
        let entries = self
            .entries()
            .filter(|(term, _, _)| live.contains(&self.term_rows[*term]))
            .map(|(term, doc, v)| (term.to_string(), doc, v));
        Self::with_columns(self.docs.iter().copied(), entries)
    }

    pub fn terms(&self) -> &[String] { &self.terms }
    pub fn docs(&self) -> &[DocId] { &self.docs }
    pub fn num_terms(&self) -> usize { self.terms.len() }
    pub fn num_docs(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    pub fn row(&self, term: &str) -> Option<usize> { self.term_rows.get(term).map(|r| *r as usize) }
    pub fn column(&self, doc: DocId) -> Option<usize> { self.doc_cols.get(&doc).map(|c| *c as usize) }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(&(row as u32, col as u32)).copied()
    }

    /// Defined value for the pair, `None` if the cell is empty.
    pub fn get(&self, term: &str, doc: DocId) -> Option<f64> {
        self.cell(self.row(term)?, self.column(doc)?)
    }

    /// Value for the pair, empty cells read as zero.
    pub fn weight(&self, term: &str, doc: DocId) -> f64 {
        self.get(term, doc).unwrap_or(0.0)
    }

    /// Euclidean norm of a document column.
    pub fn column_norm(&self, col: usize) -> f64 {
        self.column_norms.get(col).copied().unwrap_or(0.0)
    }

    /// Defined cells in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, DocId, f64)> + '_ {
        self.cells
            .iter()
            .map(|(&(row, col), &v)| (self.terms[row as usize].as_str(), self.docs[col as usize], v))
    }
}

/// Per-term inverse document frequency, every indexed term included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdfTable(BTreeMap<String, f64>);

impl IdfTable {
    pub fn get(&self, term: &str) -> Option<f64> { self.0.get(term).copied() }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> { self.0.iter().map(|(t, v)| (t.as_str(), *v)) }
}

impl FromIterator<(String, f64)> for IdfTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

struct DocCounts<'a> {
    total: usize,
    counts: HashMap<&'a str, usize>,
}

fn count_tokens(tokens: &[String]) -> DocCounts<'_> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }
    DocCounts { total: tokens.len(), counts }
}

/// Term frequencies for every (term, document) pair the index records.
/// Documents without tokens are left out entirely.
pub fn compute_tf(corpus: &Corpus, index: &InvertedIndex) -> WeightMatrix {
    let docs: Vec<(DocId, &[String])> = corpus.iter().filter(|(_, t)| !t.is_empty()).collect();
    #[cfg(feature = "parallel")]
    let counted: Vec<(DocId, DocCounts<'_>)> = docs.par_iter().map(|(id, t)| (*id, count_tokens(t))).collect();
    #[cfg(not(feature = "parallel"))]
    let counted: Vec<(DocId, DocCounts<'_>)> = docs.iter().map(|(id, t)| (*id, count_tokens(t))).collect();
    let counted: HashMap<DocId, DocCounts<'_>> = counted.into_iter().collect();

    let mut missing: BTreeSet<DocId> = BTreeSet::new();
    let mut entries = Vec::new();
    for (term, postings) in index.iter() {
        for doc_id in postings.iter() {
            let Some(doc) = counted.get(&doc_id) else {
                if missing.insert(doc_id) {
                    tracing::warn!(doc_id, "document in index has no tokens in corpus, skipping TF");
                }
                continue;
            };
            let count = doc.counts.get(term).copied().unwrap_or(0);
            if count == 0 {
                tracing::warn!(doc_id, term, "index lists term absent from document");
            }
            entries.push((term.to_string(), doc_id, count as f64 / doc.total as f64));
        }
    }
    let tf = WeightMatrix::from_entries(entries);
    tracing::info!(terms = tf.num_terms(), docs = tf.num_docs(), "computed term frequencies");
    tf
}

/// `ln(total_docs / df)` for every indexed term; zero for a term found in
/// every document. Never negative.
pub fn compute_idf(index: &InvertedIndex, total_docs: usize) -> IdfTable {
    index
        .iter()
        .map(|(term, postings)| {
            let df = postings.len();
            if df > total_docs {
                tracing::warn!(term, df, total_docs, "document frequency exceeds document count, idf floored at 0");
                return (term.to_string(), 0.0);
            }
            (term.to_string(), (total_docs as f64 / df as f64).ln())
        })
        .collect()
}

/// Cellwise TF × IDF with all-zero rows removed.
pub fn compute_tfidf(tf: &WeightMatrix, idf: &IdfTable) -> WeightMatrix {
    let entries = tf
        .entries()
        .map(|(term, doc, v)| (term.to_string(), doc, v * idf.get(term).unwrap_or(0.0)));
    let tfidf = WeightMatrix::with_columns(tf.docs().iter().copied(), entries).without_zero_rows();
    tracing::info!(vocabulary = tfidf.num_terms(), "computed tf-idf matrix");
    tfidf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        let mut c = Corpus::new();
        c.insert(1, "кот кот пёс");
        c.insert(2, "кот мышь");
        c.insert(3, "");
        c
    }

    #[test]
    fn tf_is_count_over_length() {
        let c = corpus();
        let index = InvertedIndex::build(&c);
        let tf = compute_tf(&c, &index);
        assert!((tf.weight("кот", 1) - 2.0 / 3.0).abs() < 1e-12);
        assert!((tf.weight("пёс", 1) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(tf.get("пёс", 2), None);
        assert_eq!(tf.docs(), &[1, 2]);
    }

    #[test]
    fn idf_uses_universe_size() {
        let c = corpus();
        let index = InvertedIndex::build(&c);
        let idf = compute_idf(&index, index.num_docs());
        assert!((idf.get("кот").unwrap() - (3.0f64 / 2.0).ln()).abs() < 1e-12);
        assert!((idf.get("мышь").unwrap() - 3.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn idf_with_undercounted_total_is_zero_not_negative() {
        let c = corpus();
        let index = InvertedIndex::build(&c);
        let idf = compute_idf(&index, 1);
        assert_eq!(idf.get("кот"), Some(0.0));
        assert_eq!(idf.get("мышь"), Some(0.0));
    }

    #[test]
    fn tfidf_drops_zero_rows_keeps_columns() {
        let mut c = Corpus::new();
        c.insert(1, "общий редкий");
        c.insert(2, "общий");
        let index = InvertedIndex::build(&c);
        let tf = compute_tf(&c, &index);
        let idf = compute_idf(&index, index.num_docs());
        assert_eq!(idf.get("общий"), Some(0.0));

        let tfidf = compute_tfidf(&tf, &idf);
        assert_eq!(tfidf.terms(), &["редкий".to_string()]);
        assert_eq!(tfidf.docs(), &[1, 2]);
        assert_eq!(tfidf.get("редкий", 2), None);
        assert!((tfidf.weight("редкий", 1) - 0.5 * 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn missing_corpus_documents_contribute_nothing() {
        let mut full = Corpus::new();
        full.insert(1, "а б");
        full.insert(2, "б");
        let index = InvertedIndex::build(&full);
        let mut partial = Corpus::new();
        partial.insert(1, "а б");
        let tf = compute_tf(&partial, &index);
        assert_eq!(tf.docs(), &[1]);
        assert_eq!(tf.get("б", 2), None);
    }

    #[test]
    fn column_norm_matches_cells() {
        let m = WeightMatrix::from_entries(vec![
            ("a".to_string(), 4, 3.0),
            ("b".to_string(), 4, 4.0),
            ("a".to_string(), 9, 1.0),
        ]);
        assert_eq!(m.column_norm(m.column(4).unwrap()), 5.0);
        assert_eq!(m.column_norm(m.column(9).unwrap()), 1.0);
    }
}
