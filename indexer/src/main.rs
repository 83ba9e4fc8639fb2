use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lemma_core::persist::{load_index, save_artifacts, save_meta, IndexPaths, MetaFile};
use lemma_core::{
    BooleanEngine, Corpus, CorpusLayout, Language, Normalizer, NormalizerConfig, Operator, OperatorWords,
    RankOutcome, Snapshot, DEFAULT_TOP_N,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs;
use std::path::Path;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a TF-IDF inverted index over lemma streams", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct NormalizerArgs {
    /// Stop-word list and stemmer: russian, english or none
    #[arg(long, default_value = "russian")]
    language: String,
    /// Extra stop words, one per line (# starts a comment)
    #[arg(long)]
    stopwords: Option<String>,
    /// Drop tokens shorter than this many characters
    #[arg(long, default_value_t = 2)]
    min_len: usize,
}

impl NormalizerArgs {
    fn normalizer(&self) -> Result<Normalizer> {
        let language: Language = self.language.parse().map_err(anyhow::Error::msg)?;
        let mut config = NormalizerConfig::new(language);
        config.min_len = self.min_len;
        if let Some(path) = &self.stopwords {
            config = config.with_stopword_file(path)?;
        }
        Ok(Normalizer::new(config))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw `doc_<id>.txt` files into lemma streams
    Preprocess {
        /// Directory with raw documents
        #[arg(long)]
        input: String,
        /// Directory for `processed_doc_<id>.txt` files
        #[arg(long)]
        output: String,
        #[command(flatten)]
        normalizer: NormalizerArgs,
    },
    /// Build the index and weight tables from a lemma-stream directory
    Build {
        /// Directory with `processed_doc_<id>.txt` files
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// File name prefix in front of the document id
        #[arg(long, default_value = "processed_doc_")]
        prefix: String,
    },
    /// Run a boolean or vector query against a built index
    Query {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Boolean expression, e.g. "кошка И НЕ собака"
        #[arg(long, conflicts_with = "vector", required_unless_present = "vector")]
        boolean: Option<String>,
        /// Free-text query ranked by cosine similarity
        #[arg(long)]
        vector: Option<String>,
        /// Number of ranked results
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top: usize,
        /// Extra spellings for AND
        #[arg(long = "and")]
        and_words: Vec<String>,
        /// Extra spellings for OR
        #[arg(long = "or")]
        or_words: Vec<String>,
        /// Extra spellings for NOT
        #[arg(long = "not")]
        not_words: Vec<String>,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        #[command(flatten)]
        normalizer: NormalizerArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { input, output, normalizer } => {
            let processed = preprocess_dir(Path::new(&input), Path::new(&output), &normalizer.normalizer()?)?;
            tracing::info!(processed, output, "preprocessing complete");
            Ok(())
        }
        Commands::Build { input, output, prefix } => build_index(&input, &output, &prefix),
        Commands::Query { index, boolean, vector, top, and_words, or_words, not_words, json, normalizer } => {
            let snapshot = load_index(&IndexPaths::new(&index))?;
            if let Some(query) = boolean {
                let mut words = OperatorWords::default();
                for (op, list) in [(Operator::And, and_words), (Operator::Or, or_words), (Operator::Not, not_words)] {
                    for w in list {
                        words = words.with_synonym(op, w);
                    }
                }
                let hits = snapshot.boolean_normalized(&BooleanEngine::new(words), &query, &normalizer.normalizer()?);
                if json {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                } else {
                    println!("results: {:?}", hits);
                }
                Ok(())
            } else if let Some(query) = vector {
                run_vector_query(&snapshot, &query, &normalizer.normalizer()?, top, json)
            } else {
                bail!("either --boolean or --vector is required")
            }
        }
    }
}

/// Normalize every `doc_<id>.txt` in `input` into `processed_doc_<id>.txt`.
/// Unreadable or badly named files are skipped.
fn preprocess_dir(input: &Path, output: &Path, normalizer: &Normalizer) -> Result<usize> {
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    let raw_layout = CorpusLayout::new("doc_");
    let out_layout = CorpusLayout::default();
    let mut processed = 0usize;

    for entry in WalkDir::new(input).min_depth(1).max_depth(1).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if !p.is_file() { continue; }
        let Some(name) = p.file_name().and_then(|s| s.to_str()) else { continue };
        let doc_id = match raw_layout.doc_id(name) {
            Some(Ok(id)) => id,
            Some(Err(reason)) => {
                tracing::warn!(%reason, "skipping raw document");
                continue;
            }
            None => continue,
        };
        let text = match fs::read_to_string(p) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(file = name, error = %err, "unreadable raw document");
                continue;
            }
        };
        fs::write(output.join(out_layout.file_name(doc_id)), normalizer.normalize_to_line(&text))?;
        processed += 1;
    }
    Ok(processed)
}

fn build_index(input: &str, output: &str, prefix: &str) -> Result<()> {
    let corpus = Corpus::load_dir(input, &CorpusLayout::new(prefix))?;
    let snapshot = Snapshot::build(&corpus);
    let out_paths = IndexPaths::new(output);
    save_artifacts(&out_paths, &snapshot)?;

    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "".into());
    save_meta(&out_paths, &MetaFile::for_snapshot(&snapshot, created_at))?;

    tracing::info!(output, num_docs = snapshot.index.num_docs(), vocabulary = snapshot.tfidf.num_terms(), "index build complete");
    Ok(())
}

fn run_vector_query(snapshot: &Snapshot, query: &str, normalizer: &Normalizer, top: usize, json: bool) -> Result<()> {
    let terms = normalizer.normalize(query);
    if terms.is_empty() {
        println!("query has no meaningful words");
        return Ok(());
    }
    let results = match snapshot.ranker().rank(&terms, top) {
        RankOutcome::NoIndexedTerms => {
            println!("no query word is present in the index");
            return Ok(());
        }
        RankOutcome::Ranked(results) => results,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no matching documents");
    }
    for r in results {
        println!("\ndocument {}: score = {:.4}", r.doc_id, r.score);
        for (term, weight) in r.term_weights {
            println!("  {}: {:.5}", term, weight);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lemma_core::persist::load_meta;

    #[test]
    fn preprocess_then_build() {
        let raw = tempfile::tempdir().unwrap();
        let processed = tempfile::tempdir().unwrap();
        let index = tempfile::tempdir().unwrap();
        fs::write(raw.path().join("doc_1.txt"), "Кошки и собаки живут во дворе.").unwrap();
        fs::write(raw.path().join("doc_2.txt"), "Кошка спит.").unwrap();
        fs::write(raw.path().join("doc_x.txt"), "ignored").unwrap();

        let normalizer = Normalizer::default();
        let n = preprocess_dir(raw.path(), processed.path(), &normalizer).unwrap();
        assert_eq!(n, 2);
        let line = fs::read_to_string(processed.path().join("processed_doc_2.txt")).unwrap();
        assert_eq!(line.split_whitespace().count(), 2);

        build_index(
            processed.path().to_str().unwrap(),
            index.path().to_str().unwrap(),
            "processed_doc_",
        )
        .unwrap();
        let meta = load_meta(&IndexPaths::new(index.path())).unwrap();
        assert_eq!(meta.num_docs, 2);

        let snapshot = load_index(&IndexPaths::new(index.path())).unwrap();
        let cat = normalizer.normalize("кошка");
        assert_eq!(snapshot.index.get(&cat[0]), &[1, 2]);
        let engine = BooleanEngine::default();
        assert_eq!(snapshot.boolean_normalized(&engine, "Кошка И НЕ собаки", &normalizer), vec![2]);
    }
}
