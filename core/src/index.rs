use crate::corpus::Corpus;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type DocId = u32;

/// Ascending, duplicate-free list of document IDs.
///
/// Set operations are merge-style walks over both lists, so results stay
/// sorted without any re-sorting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList(Vec<DocId>);

impl PostingList {
    pub fn new() -> Self { Self::default() }

    pub fn from_unsorted(mut ids: Vec<DocId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self(ids)
    }

    pub fn as_slice(&self) -> &[DocId] { &self.0 }
    pub fn into_vec(self) -> Vec<DocId> { self.0 }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ { self.0.iter().copied() }

    pub fn contains(&self, doc_id: DocId) -> bool {
        self.0.binary_search(&doc_id).is_ok()
    }

    pub fn intersect(&self, other: &PostingList) -> PostingList {
        let (a, b) = (&self.0, &other.0);
        let mut out = Vec::with_capacity(a.len().min(b.len()));
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        PostingList(out)
    }

    pub fn union(&self, other: &PostingList) -> PostingList {
        let (a, b) = (&self.0, &other.0);
        let mut out = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => {
                    out.push(a[i]);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    out.push(b[j]);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    out.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }
        out.extend_from_slice(&a[i..]);
        out.extend_from_slice(&b[j..]);
        PostingList(out)
    }

    /// Documents in `self` that are not in `other`.
    pub fn difference(&self, other: &PostingList) -> PostingList {
        let (a, b) = (&self.0, &other.0);
        let mut out = Vec::with_capacity(a.len());
        let mut j = 0;
        for &id in a {
            while j < b.len() && b[j] < id {
                j += 1;
            }
            if j >= b.len() || b[j] != id {
                out.push(id);
            }
        }
        PostingList(out)
    }
}

impl FromIterator<DocId> for PostingList {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        Self::from_unsorted(iter.into_iter().collect())
    }
}

/// Term → posting list mapping plus the universe of every document seen
/// during the build. Keys iterate in lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, PostingList>,
    universe: PostingList,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build the index from every document in the corpus. Documents with no
    /// tokens still join the universe.
    pub fn build(corpus: &Corpus) -> Self {
        let docs: Vec<(DocId, &[String])> = corpus.iter().collect();

        #[cfg(feature = "parallel")]
        let distinct: Vec<(DocId, BTreeSet<&str>)> = docs
            .par_iter()
            .map(|(doc_id, tokens)| (*doc_id, tokens.iter().map(String::as_str).collect()))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let distinct: Vec<(DocId, BTreeSet<&str>)> = docs
            .iter()
            .map(|(doc_id, tokens)| (*doc_id, tokens.iter().map(String::as_str).collect()))
            .collect();

        let mut raw: BTreeMap<String, Vec<DocId>> = BTreeMap::new();
        let mut universe = Vec::with_capacity(distinct.len());
        for (doc_id, terms) in distinct {
            universe.push(doc_id);
            for term in terms {
                raw.entry(term.to_string()).or_default().push(doc_id);
            }
        }

        let postings = raw
            .into_iter()
            .map(|(term, ids)| (term, PostingList::from_unsorted(ids)))
            .collect::<BTreeMap<_, _>>();
        let index = Self { postings, universe: PostingList::from_unsorted(universe) };
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "built inverted index");
        index
    }

    /// Assemble an index from already-materialized postings. Empty posting
    /// lists are discarded and every posted document is added to the universe.
    pub fn from_parts(postings: BTreeMap<String, PostingList>, universe: PostingList) -> Self {
        let postings: BTreeMap<String, PostingList> =
            postings.into_iter().filter(|(_, list)| !list.is_empty()).collect();
        let universe = postings.values().fold(universe, |acc, list| acc.union(list));
        Self { postings, universe }
    }

    pub fn postings(&self, term: &str) -> Option<&PostingList> { self.postings.get(term) }

    /// Documents containing `term`; empty when the term is unknown.
    pub fn get(&self, term: &str) -> &[DocId] {
        self.postings.get(term).map(PostingList::as_slice).unwrap_or(&[])
    }

    pub fn contains_term(&self, term: &str) -> bool { self.postings.contains_key(term) }
    pub fn universe(&self) -> &PostingList { &self.universe }
    pub fn num_docs(&self) -> usize { self.universe.len() }
    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.postings.keys().map(String::as_str) }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingList)> {
        self.postings.iter().map(|(term, list)| (term.as_str(), list))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[DocId]) -> PostingList { PostingList::from_unsorted(ids.to_vec()) }

    #[test]
    fn merge_operations_keep_order() {
        let a = list(&[1, 3, 5, 7]);
        let b = list(&[3, 4, 7, 9]);
        assert_eq!(a.intersect(&b).as_slice(), &[3, 7]);
        assert_eq!(a.union(&b).as_slice(), &[1, 3, 4, 5, 7, 9]);
        assert_eq!(a.difference(&b).as_slice(), &[1, 5]);
        assert_eq!(b.difference(&a).as_slice(), &[4, 9]);
    }

    #[test]
    fn from_unsorted_dedups() {
        assert_eq!(list(&[5, 1, 5, 3, 1]).as_slice(), &[1, 3, 5]);
    }

    #[test]
    fn build_collects_distinct_terms_and_universe() {
        let mut corpus = Corpus::new();
        corpus.insert(3, "кошка собака кошка");
        corpus.insert(1, "собака");
        corpus.insert(2, "");
        let index = InvertedIndex::build(&corpus);

        assert_eq!(index.get("кошка"), &[3]);
        assert_eq!(index.get("собака"), &[1, 3]);
        assert!(index.get("мышь").is_empty());
        assert_eq!(index.universe().as_slice(), &[1, 2, 3]);
        assert_eq!(index.terms().collect::<Vec<_>>(), vec!["кошка", "собака"]);
    }

    #[test]
    fn from_parts_drops_empty_lists() {
        let mut postings = BTreeMap::new();
        postings.insert("a".to_string(), list(&[2]));
        postings.insert("b".to_string(), PostingList::new());
        let index = InvertedIndex::from_parts(postings, list(&[7]));
        assert!(!index.contains_term("b"));
        assert_eq!(index.universe().as_slice(), &[2, 7]);
    }
}
