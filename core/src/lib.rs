pub mod boolean;
pub mod corpus;
pub mod index;
pub mod persist;
pub mod ranker;
pub mod snapshot;
pub mod tokenizer;
pub mod weights;

pub use boolean::{BooleanEngine, Operator, OperatorWords};
pub use corpus::{Corpus, CorpusLayout};
pub use index::*;
pub use ranker::{RankOutcome, RankedDoc, VectorRanker, DEFAULT_TOP_N};
pub use snapshot::Snapshot;
pub use tokenizer::{Language, Normalizer, NormalizerConfig};
pub use weights::{compute_idf, compute_tf, compute_tfidf, IdfTable, WeightMatrix};
