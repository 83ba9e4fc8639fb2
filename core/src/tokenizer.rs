use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Letter runs only; hyphenated compounds fall apart into their parts.
    static ref WORD_RE: Regex = Regex::new(r"(?u)\p{L}+").expect("valid regex");
}

const RUSSIAN_STOPWORDS: &[&str] = &[
    "и","в","во","не","что","он","на","я","с","со","как","а","то","все","она","так","его","но","да","ты",
    "к","у","же","вы","за","бы","по","только","ее","мне","было","вот","от","меня","еще","нет","о","из",
    "ему","теперь","когда","даже","ну","вдруг","ли","если","уже","или","ни","быть","был","него","до",
    "вас","нибудь","опять","уж","вам","ведь","там","потом","себя","ничего","ей","может","они","тут","где",
    "есть","надо","ней","для","мы","тебя","их","чем","была","сам","чтоб","без","будто","чего","раз","тоже",
    "себе","под","будет","ж","тогда","кто","этот","того","потому","этого","какой","совсем","ним","здесь",
    "этом","один","почти","мой","тем","чтобы","нее","сейчас","были","куда","зачем","всех","никогда",
    "можно","при","наконец","два","об","другой","хоть","после","над","больше","тот","через","эти","нас",
    "про","всего","них","какая","много","разве","три","эту","моя","впрочем","хорошо","свою","этой",
    "перед","иногда","лучше","чуть","том","нельзя","такой","им","более","всегда","конечно","всю","между",
];

const ENGLISH_STOPWORDS: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","cannot","could","did","do","does","doing","down","during",
    "each","few","for","from","further","had","has","have","having","he","her","here","hers","herself",
    "him","himself","his","how","i","if","in","into","is","it","its","itself",
    "me","more","most","my","myself","no","nor","not","of","off","on","once","only","or","other","ought",
    "our","ours","ourselves","out","over","own","same","she","should","so","some","such",
    "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those",
    "through","to","too","under","until","up","very","was","we","were","what","when","where","which",
    "while","who","whom","why","with","would","you","your","yours","yourself","yourselves",
];

/// Language of the built-in stop-word list and stemmer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    Russian,
    English,
    /// No built-in stop words, no stemming.
    None,
}

impl Language {
    fn stopwords(self) -> &'static [&'static str] {
        match self {
            Language::Russian => RUSSIAN_STOPWORDS,
            Language::English => ENGLISH_STOPWORDS,
            Language::None => &[],
        }
    }

    fn algorithm(self) -> Option<Algorithm> {
        match self {
            Language::Russian => Some(Algorithm::Russian),
            Language::English => Some(Algorithm::English),
            Language::None => None,
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "russian" | "ru" => Ok(Language::Russian),
            "english" | "en" => Ok(Language::English),
            "none" => Ok(Language::None),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    pub language: Language,
    /// Tokens shorter than this many characters are dropped.
    pub min_len: usize,
    pub extra_stopwords: HashSet<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { language: Language::default(), min_len: 2, extra_stopwords: HashSet::new() }
    }
}

impl NormalizerConfig {
    pub fn new(language: Language) -> Self {
        Self { language, ..Self::default() }
    }

    /// Add stop words from a file, one per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn with_stopword_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading stop-word file {}", path.display()))?;
        self.extra_stopwords.extend(parse_stopwords(&text));
        Ok(self)
    }
}

fn parse_stopwords(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
}

/// Turns raw text into the lemma stream the index is built from. Corpus
/// preprocessing and query normalization must share one configuration.
pub struct Normalizer {
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
    min_len: usize,
}

impl Default for Normalizer {
    fn default() -> Self { Self::new(NormalizerConfig::default()) }
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let mut stopwords: HashSet<String> =
            config.language.stopwords().iter().map(|w| w.to_string()).collect();
        stopwords.extend(config.extra_stopwords);
        Self {
            stopwords,
            stemmer: config.language.algorithm().map(Stemmer::create),
            min_len: config.min_len,
        }
    }

    fn is_stopword(&self, token: &str) -> bool { self.stopwords.contains(token) }

    /// NFKC, lowercase, letter runs, length and stop-word filtering, stemming.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let folded = text.nfkc().collect::<String>().to_lowercase();
        let mut terms = Vec::new();
        for mat in WORD_RE.find_iter(&folded) {
            let token = mat.as_str();
            if token.chars().count() < self.min_len || self.is_stopword(token) {
                continue;
            }
            let term = match &self.stemmer {
                Some(stemmer) => stemmer.stem(token).into_owned(),
                None => token.to_string(),
            };
            if term.is_empty() || self.is_stopword(&term) {
                continue;
            }
            terms.push(term);
        }
        terms
    }

    /// Index form of a single boolean query term. A token that normalizes to
    /// exactly one term is replaced by it; anything else (a stop word, a
    /// hyphenated compound) is kept lowercased and simply matches nothing.
    pub fn query_term(&self, token: &str) -> String {
        let mut terms = self.normalize(token);
        match terms.len() {
            1 => terms.remove(0),
            _ => token.to_lowercase(),
        }
    }

    /// Normalized terms joined with single spaces, the on-disk corpus format.
    pub fn normalize_to_line(&self, text: &str) -> String {
        self.normalize(text).join(" ")
    }
}
