//! End-to-end: lemma files on disk → snapshot → artifacts → reload → search.

use lemma_core::persist::{
    format_inverted_list, format_weight_csv, load_index, parse_inverted_list, save_artifacts, IndexPaths,
};
use lemma_core::{BooleanEngine, Corpus, CorpusLayout, RankOutcome, Snapshot};
use std::fs;
use std::path::Path;

fn write_corpus(dir: &Path) {
    let docs = [
        (1, "собака двор"),
        (2, "собака кошка кошка"),
        (3, "кошка дом"),
        (4, "дом двор"),
    ];
    for (id, text) in docs {
        fs::write(dir.join(format!("processed_doc_{id}.txt")), text).unwrap();
    }
    fs::write(dir.join("processed_doc_oops.txt"), "мусор").unwrap();
}

#[test]
fn builds_and_reloads_artifacts() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_corpus(input.path());

    let corpus = Corpus::load_dir(input.path(), &CorpusLayout::default()).unwrap();
    assert_eq!(corpus.len(), 4);
    let snapshot = Snapshot::build(&corpus);
    let paths = IndexPaths::new(output.path());
    save_artifacts(&paths, &snapshot).unwrap();

    let listing = fs::read_to_string(paths.inverted_list()).unwrap();
    assert_eq!(listing, "двор: 1, 4\nдом: 3, 4\nкошка: 2, 3\nсобака: 1, 2\n");
    let tfidf = fs::read_to_string(paths.tfidf()).unwrap();
    assert!(tfidf.starts_with(",doc_1,doc_2,doc_3,doc_4\n"));

    let reloaded = load_index(&paths).unwrap();
    assert_eq!(reloaded, snapshot);

    // Text fallback when the binary snapshot is gone.
    fs::remove_file(paths.snapshot()).unwrap();
    let from_text = load_index(&paths).unwrap();
    assert_eq!(from_text.index, snapshot.index);
    assert_eq!(from_text.tfidf.terms(), snapshot.tfidf.terms());
    assert!((from_text.tfidf.weight("кошка", 2) - snapshot.tfidf.weight("кошка", 2)).abs() < 1e-6);
}

#[test]
fn rebuild_is_byte_identical() {
    let input = tempfile::tempdir().unwrap();
    write_corpus(input.path());
    let a = Snapshot::build(&Corpus::load_dir(input.path(), &CorpusLayout::default()).unwrap());
    let b = Snapshot::build(&Corpus::load_dir(input.path(), &CorpusLayout::default()).unwrap());
    assert_eq!(format_inverted_list(&a.index), format_inverted_list(&b.index));
    assert_eq!(format_weight_csv(&a.tf), format_weight_csv(&b.tf));
    assert_eq!(format_weight_csv(&a.tfidf), format_weight_csv(&b.tfidf));
}

#[test]
fn inverted_list_round_trip() {
    let mut corpus = Corpus::new();
    corpus.insert(5, "альфа бета");
    corpus.insert(9, "бета гамма альфа");
    let snapshot = Snapshot::build(&corpus);
    let back = parse_inverted_list(&format_inverted_list(&snapshot.index));
    assert_eq!(back, snapshot.index);
}

#[test]
fn boolean_queries_over_built_snapshot() {
    let input = tempfile::tempdir().unwrap();
    write_corpus(input.path());
    let snapshot = Snapshot::build(&Corpus::load_dir(input.path(), &CorpusLayout::default()).unwrap());
    let engine = BooleanEngine::default();
    assert_eq!(snapshot.boolean(&engine, "собака И кошка"), vec![2]);
    assert_eq!(snapshot.boolean(&engine, "двор | дом"), vec![1, 3, 4]);
    assert_eq!(snapshot.boolean(&engine, "!кошка & двор"), vec![1, 4]);
}

#[test]
fn single_active_term_scores_one_regardless_of_weight() {
    // "редкий" is the only term with nonzero weight in docs 2 and 5,
    // at different magnitudes; "общий" is everywhere and weighs nothing.
    let mut corpus = Corpus::new();
    corpus.insert(1, "общий");
    corpus.insert(2, "редкий общий общий");
    corpus.insert(3, "общий");
    corpus.insert(4, "общий");
    corpus.insert(5, "редкий общий общий общий общий общий общий общий общий");
    let snapshot = Snapshot::build(&corpus);
    assert!(snapshot.tfidf.weight("редкий", 2) > snapshot.tfidf.weight("редкий", 5));

    let results = snapshot.ranker().rank(&["редкий"], 10).into_results();
    assert_eq!(results.iter().map(|r| r.doc_id).collect::<Vec<_>>(), vec![2, 5]);
    for r in &results {
        assert!((r.score - 1.0).abs() < 1e-12, "doc {} scored {}", r.doc_id, r.score);
    }
}

#[test]
fn ranking_is_idempotent() {
    let input = tempfile::tempdir().unwrap();
    write_corpus(input.path());
    let snapshot = Snapshot::build(&Corpus::load_dir(input.path(), &CorpusLayout::default()).unwrap());
    let ranker = snapshot.ranker();
    let first = ranker.rank(&["кошка", "двор"], 10);
    let second = ranker.rank(&["кошка", "двор"], 10);
    assert_eq!(first, second);
    assert!(matches!(first, RankOutcome::Ranked(ref docs) if docs.len() == 4));
    assert_eq!(ranker.rank(&["ничего"], 10), RankOutcome::NoIndexedTerms);
}
