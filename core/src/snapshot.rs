use crate::{
    compute_idf, compute_tf, compute_tfidf, BooleanEngine, Corpus, DocId, IdfTable, InvertedIndex,
    Normalizer, VectorRanker, WeightMatrix,
};
use serde::{Deserialize, Serialize};

/// Everything derived from one corpus: the index and its weight tables.
/// Never mutated after construction; a rebuild produces a new snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub index: InvertedIndex,
    /// Term frequencies with all-zero rows removed.
    pub tf: WeightMatrix,
    pub idf: IdfTable,
    pub tfidf: WeightMatrix,
}

impl Snapshot {
    pub fn build(corpus: &Corpus) -> Self {
        let index = InvertedIndex::build(corpus);
        let tf = compute_tf(corpus, &index);
        let idf = compute_idf(&index, index.num_docs());
        let tfidf = compute_tfidf(&tf, &idf);
        Self { tf: tf.without_zero_rows(), index, idf, tfidf }
    }

    pub fn from_parts(index: InvertedIndex, tf: WeightMatrix, idf: IdfTable, tfidf: WeightMatrix) -> Self {
        Self { index, tf, idf, tfidf }
    }

    pub fn boolean(&self, engine: &BooleanEngine, query: &str) -> Vec<DocId> {
        engine.evaluate(query, &self.index)
    }

    /// Boolean query whose terms go through `normalizer` first, so inflected
    /// words meet the normalized index terms.
    pub fn boolean_normalized(&self, engine: &BooleanEngine, query: &str, normalizer: &Normalizer) -> Vec<DocId> {
        engine.evaluate_with(query, &self.index, |term| normalizer.query_term(term))
    }

    pub fn ranker(&self) -> VectorRanker<'_> {
        VectorRanker::new(&self.index, &self.tfidf)
    }
}
