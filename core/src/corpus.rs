//! In-memory corpus of lemma streams keyed by document ID.

use crate::DocId;
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// File naming convention of a lemma-stream directory: `<prefix><id>.<extension>`.
/// A bare `<id>.<extension>` is accepted as well.
#[derive(Debug, Clone)]
pub struct CorpusLayout {
    pub prefix: String,
    pub extension: String,
}

impl Default for CorpusLayout {
    fn default() -> Self {
        Self { prefix: "processed_doc_".into(), extension: "txt".into() }
    }
}

impl CorpusLayout {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), ..Self::default() }
    }

    /// `None` for files that are not part of the corpus at all, `Some(Err)`
    /// for corpus files whose name does not carry a positive integer ID.
    pub fn doc_id(&self, file_name: &str) -> Option<Result<DocId, String>> {
        let stem = file_name.strip_suffix(&format!(".{}", self.extension))?;
        let raw = stem.strip_prefix(self.prefix.as_str()).unwrap_or(stem);
        Some(match raw.parse::<DocId>() {
            Ok(0) => Err(format!("document id must be positive: {file_name}")),
            Ok(id) => Ok(id),
            Err(_) => Err(format!("file name does not encode a document id: {file_name}")),
        })
    }

    pub fn file_name(&self, doc_id: DocId) -> String {
        format!("{}{}.{}", self.prefix, doc_id, self.extension)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: BTreeMap<DocId, Vec<String>>,
}

impl Corpus {
    pub fn new() -> Self { Self::default() }

    /// Insert a whitespace-delimited lemma stream, replacing any previous
    /// content for the same ID.
    pub fn insert(&mut self, doc_id: DocId, text: &str) {
        self.insert_tokens(doc_id, text.split_whitespace().map(str::to_string).collect());
    }

    pub fn insert_tokens(&mut self, doc_id: DocId, tokens: Vec<String>) {
        self.docs.insert(doc_id, tokens);
    }

    pub fn get(&self, doc_id: DocId) -> Option<&[String]> {
        self.docs.get(&doc_id).map(Vec::as_slice)
    }

    /// Documents in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[String])> {
        self.docs.iter().map(|(id, tokens)| (*id, tokens.as_slice()))
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    /// Load every lemma-stream file in `dir`. Files with a bad name or
    /// unreadable content are skipped with a warning.
    pub fn load_dir<P: AsRef<Path>>(dir: P, layout: &CorpusLayout) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            bail!("corpus directory not found: {}", dir.display());
        }

        let mut corpus = Corpus::new();
        let mut skipped = 0usize;
        let entries = WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true).sort_by_file_name();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable directory entry");
                    skipped += 1;
                    continue;
                }
            };
            let p = entry.path();
            if !p.is_file() { continue; }
            let Some(name) = p.file_name().and_then(|s| s.to_str()) else { continue };
            let doc_id = match layout.doc_id(name) {
                None => {
                    tracing::debug!(file = name, "ignoring non-corpus file");
                    continue;
                }
                Some(Err(reason)) => {
                    tracing::warn!(%reason, "skipping corpus file");
                    skipped += 1;
                    continue;
                }
                Some(Ok(id)) => id,
            };
            if corpus.docs.contains_key(&doc_id) {
                tracing::warn!(doc_id, file = name, "duplicate document id, keeping first file");
                skipped += 1;
                continue;
            }
            match fs::read_to_string(p) {
                Ok(text) => corpus.insert(doc_id, &text),
                Err(err) => {
                    tracing::warn!(doc_id, file = name, error = %err, "unreadable corpus file");
                    skipped += 1;
                }
            }
        }
        tracing::info!(num_docs = corpus.len(), skipped, dir = %dir.display(), "loaded corpus");
        Ok(corpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_and_bare_names() {
        let layout = CorpusLayout::default();
        assert_eq!(layout.doc_id("processed_doc_12.txt"), Some(Ok(12)));
        assert_eq!(layout.doc_id("7.txt"), Some(Ok(7)));
        assert!(matches!(layout.doc_id("processed_doc_x.txt"), Some(Err(_))));
        assert!(matches!(layout.doc_id("processed_doc_0.txt"), Some(Err(_))));
        assert_eq!(layout.doc_id("notes.md"), None);
    }

    #[test]
    fn load_dir_skips_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("processed_doc_2.txt"), "дом  сад\nдом").unwrap();
        fs::write(dir.path().join("processed_doc_abc.txt"), "лес").unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let corpus = Corpus::load_dir(dir.path(), &CorpusLayout::default()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.get(2).unwrap(), &["дом", "сад", "дом"]);
    }

    #[cfg(unix)]
    #[test]
    fn load_dir_skips_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("processed_doc_1.txt"), "дом").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("processed_doc_2.txt")).unwrap();

        let corpus = Corpus::load_dir(dir.path(), &CorpusLayout::default()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.get(2).is_none());
    }

    #[test]
    fn load_dir_requires_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Corpus::load_dir(dir.path().join("missing"), &CorpusLayout::default()).is_err());
    }
}
