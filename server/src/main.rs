use anyhow::Result;
use axum::Router;
use clap::Parser;
use lemma_core::{Language, NormalizerConfig, Operator, OperatorWords};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use server::{build_app, ServerConfig};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Query normalization language: russian, english or none
    #[arg(long, default_value = "russian")]
    language: String,
    /// Extra stop words, one per line
    #[arg(long)]
    stopwords: Option<String>,
    /// Drop query tokens shorter than this many characters
    #[arg(long, default_value_t = 2)]
    min_len: usize,
    /// Extra spellings for AND
    #[arg(long = "and")]
    and_words: Vec<String>,
    /// Extra spellings for OR
    #[arg(long = "or")]
    or_words: Vec<String>,
    /// Extra spellings for NOT
    #[arg(long = "not")]
    not_words: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let language: Language = args.language.parse().map_err(anyhow::Error::msg)?;
    let mut normalizer = NormalizerConfig::new(language);
    normalizer.min_len = args.min_len;
    if let Some(path) = &args.stopwords {
        normalizer = normalizer.with_stopword_file(path)?;
    }
    let mut operators = OperatorWords::default();
    for (op, words) in [(Operator::And, args.and_words), (Operator::Or, args.or_words), (Operator::Not, args.not_words)] {
        for w in words {
            operators = operators.with_synonym(op, w);
        }
    }

    let mut config = ServerConfig::new(&args.index);
    config.normalizer = normalizer;
    config.operators = operators;
    config.admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app: Router = build_app(config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
