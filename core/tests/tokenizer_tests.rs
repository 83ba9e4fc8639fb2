use lemma_core::tokenizer::{Language, Normalizer, NormalizerConfig};
use std::fs;

#[test]
fn it_stems_inflected_forms_together() {
    let n = Normalizer::default();
    assert_eq!(n.normalize("кошка"), n.normalize("кошки"));
    assert_eq!(n.normalize("Кошки").len(), 1);
}

#[test]
fn it_filters_stopwords_and_short_tokens() {
    let n = Normalizer::default();
    let words = n.normalize("Я и ты в лесу");
    assert_eq!(words.len(), 1);
    assert!(words[0].starts_with("лес"));
}

#[test]
fn it_splits_hyphenated_compounds() {
    let n = Normalizer::new(NormalizerConfig::new(Language::None));
    assert_eq!(n.normalize("северо-запад -- восток"), vec!["северо", "запад", "восток"]);
}

#[test]
fn it_reads_custom_stopwords() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stopwords-ru.txt");
    fs::write(&path, "# custom list\nзапад\n").unwrap();
    let config = NormalizerConfig::new(Language::None).with_stopword_file(&path).unwrap();
    let n = Normalizer::new(config);
    assert_eq!(n.normalize("северо-запад"), vec!["северо"]);
}

#[test]
fn english_normalization_matches_running_forms() {
    let n = Normalizer::new(NormalizerConfig::new(Language::English));
    let words = n.normalize("Running Runners RUN! The quick fox.");
    assert!(words.contains(&"run".to_string()));
    assert!(!words.contains(&"the".to_string()));
}
