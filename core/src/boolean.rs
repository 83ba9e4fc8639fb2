//! Flat boolean queries (AND / OR / NOT, no parentheses) over an inverted index.
//!
//! Evaluation runs in three passes over the token stream:
//!
//! 1. terms and NOT operands resolve to posting lists,
//! 2. AND markers fold their neighbours by intersection (left to right),
//! 3. the remaining lists fold by union across OR markers.
//!
//! Parsing is permissive: an operator without operands is dropped, an unknown
//! term contributes nothing, and no input is ever rejected.

use crate::{DocId, InvertedIndex, PostingList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    Op(Operator),
    Term(String),
}

/// Spellings recognized for each operator besides `&`, `|` and `!`.
/// Matching is case-sensitive.
#[derive(Debug, Clone)]
pub struct OperatorWords {
    and: Vec<String>,
    or: Vec<String>,
    not: Vec<String>,
}

impl Default for OperatorWords {
    fn default() -> Self {
        Self { and: vec!["И".into()], or: vec!["ИЛИ".into()], not: vec!["НЕ".into()] }
    }
}

impl OperatorWords {
    pub fn new() -> Self { Self::default() }

    pub fn with_synonym(mut self, op: Operator, word: impl Into<String>) -> Self {
        let word = word.into();
        if word.is_empty() { return self; }
        match op {
            Operator::And => self.and.push(word),
            Operator::Or => self.or.push(word),
            Operator::Not => self.not.push(word),
        }
        self
    }

    fn classify(&self, word: &str) -> Option<Operator> {
        match word {
            "&" => return Some(Operator::And),
            "|" => return Some(Operator::Or),
            "!" => return Some(Operator::Not),
            _ => {}
        }
        if self.and.iter().any(|w| w == word) {
            Some(Operator::And)
        } else if self.or.iter().any(|w| w == word) {
            Some(Operator::Or)
        } else if self.not.iter().any(|w| w == word) {
            Some(Operator::Not)
        } else {
            None
        }
    }

    /// The term of a NOT fused with its operand, e.g. `НЕкошка` → `кошка`.
    fn strip_fused_not<'a>(&self, word: &'a str) -> Option<&'a str> {
        self.not
            .iter()
            .filter_map(|w| word.strip_prefix(w.as_str()))
            .find(|rest| !rest.is_empty())
    }

    /// Split a query into canonical operator and term tokens. Symbolic
    /// operators are padded so `кот&пёс` reads as `кот & пёс`.
    pub fn tokenize(&self, query: &str) -> Vec<QueryToken> {
        let mut padded = String::with_capacity(query.len() + 8);
        for c in query.chars() {
            if matches!(c, '&' | '|' | '!') {
                padded.push(' ');
                padded.push(c);
                padded.push(' ');
            } else {
                padded.push(c);
            }
        }

        let mut tokens = Vec::new();
        for word in padded.split_whitespace() {
            if let Some(op) = self.classify(word) {
                tokens.push(QueryToken::Op(op));
            } else if let Some(term) = self.strip_fused_not(word) {
                tokens.push(QueryToken::Op(Operator::Not));
                tokens.push(QueryToken::Term(term.to_lowercase()));
            } else {
                tokens.push(QueryToken::Term(word.to_lowercase()));
            }
        }
        tokens
    }
}

enum Item {
    Set(PostingList),
    Op(Operator),
}

#[derive(Debug, Clone, Default)]
pub struct BooleanEngine {
    words: OperatorWords,
}

impl BooleanEngine {
    pub fn new(words: OperatorWords) -> Self { Self { words } }

    pub fn operator_words(&self) -> &OperatorWords { &self.words }

    /// Documents satisfying `query`, ascending. Pure function of the query
    /// and the index snapshot.
    pub fn evaluate(&self, query: &str, index: &InvertedIndex) -> Vec<DocId> {
        self.evaluate_with(query, index, |term| term.to_string())
    }

    /// Like [`evaluate`](Self::evaluate), but every term token is passed
    /// through `map_term` before lookup. Operators are never mapped.
    pub fn evaluate_with<F>(&self, query: &str, index: &InvertedIndex, map_term: F) -> Vec<DocId>
    where
        F: Fn(&str) -> String,
    {
        let tokens = self
            .words
            .tokenize(query)
            .into_iter()
            .map(|token| match token {
                QueryToken::Term(term) => QueryToken::Term(map_term(&term)),
                op => op,
            })
            .collect();
        let items = resolve_terms(tokens, index);
        let items = reduce_and(items);
        let result = reduce_or(items).into_vec();
        tracing::debug!(query, hits = result.len(), "evaluated boolean query");
        result
    }
}

fn lookup(index: &InvertedIndex, term: &str) -> PostingList {
    index.postings(term).cloned().unwrap_or_default()
}

fn resolve_terms(tokens: Vec<QueryToken>, index: &InvertedIndex) -> Vec<Item> {
    let mut items = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter().peekable();
    while let Some(token) = tokens.next() {
        match token {
            QueryToken::Term(term) => items.push(Item::Set(lookup(index, &term))),
            QueryToken::Op(Operator::Not) => {
                match tokens.next_if(|t| matches!(t, QueryToken::Term(_))) {
                    Some(QueryToken::Term(term)) => {
                        let excluded = lookup(index, &term);
                        items.push(Item::Set(index.universe().difference(&excluded)));
                    }
                    _ => tracing::debug!("dropping NOT without operand"),
                }
            }
            QueryToken::Op(op) => items.push(Item::Op(op)),
        }
    }
    items
}

fn as_set(item: Option<&Item>) -> Option<&PostingList> {
    match item {
        Some(Item::Set(set)) => Some(set),
        _ => None,
    }
}

fn reduce_and(mut items: Vec<Item>) -> Vec<Item> {
    let mut i = 0;
    while i < items.len() {
        if !matches!(items[i], Item::Op(Operator::And)) {
            i += 1;
            continue;
        }
        let left = if i > 0 { as_set(items.get(i - 1)) } else { None };
        let merged = match (left, as_set(items.get(i + 1))) {
            (Some(left), Some(right)) => Some(left.intersect(right)),
            _ => None,
        };
        match merged {
            Some(set) => {
                items.splice(i - 1..=i + 1, std::iter::once(Item::Set(set)));
                i -= 1;
            }
            None => {
                tracing::debug!(position = i, "dropping AND without two operands");
                items.remove(i);
            }
        }
    }
    items
}

fn reduce_or(items: Vec<Item>) -> PostingList {
    let mut result: Option<PostingList> = None;
    let mut pending_or = false;
    for item in items {
        match item {
            Item::Op(Operator::Or) => pending_or = true,
            Item::Op(_) => {}
            Item::Set(set) => {
                result = match result {
                    None => Some(set),
                    Some(acc) if pending_or => Some(acc.union(&set)),
                    Some(acc) => {
                        tracing::debug!("dropping operand not joined by an operator");
                        Some(acc)
                    }
                };
                pending_or = false;
            }
        }
    }
    result.unwrap_or_default()
}
