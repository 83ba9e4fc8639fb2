use anyhow::Result;
use axum::{extract::{Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use lemma_core::persist::{load_index, IndexPaths};
use lemma_core::{BooleanEngine, DocId, Normalizer, NormalizerConfig, OperatorWords, RankOutcome, Snapshot, DEFAULT_TOP_N};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer, AllowOrigin};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct BooleanParams {
    pub q: String,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_N }

#[derive(Serialize)]
pub struct BooleanResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub doc_ids: Vec<DocId>,
}

#[derive(Serialize)]
pub struct VectorResponse {
    pub query: String,
    pub took_s: f64,
    /// `ok`, `no_meaningful_words` or `no_indexed_terms`
    pub status: &'static str,
    pub total_hits: usize,
    pub results: Vec<VectorHit>,
}

#[derive(Serialize)]
pub struct VectorHit {
    pub doc_id: DocId,
    pub score: f64,
    pub term_weights: Vec<TermWeight>,
}

#[derive(Serialize)]
pub struct TermWeight {
    pub term: String,
    pub weight: f64,
}

pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub normalizer: NormalizerConfig,
    pub operators: OperatorWords,
    pub admin_token: Option<String>,
}

impl ServerConfig {
    pub fn new<P: Into<PathBuf>>(index_dir: P) -> Self {
        Self {
            index_dir: index_dir.into(),
            normalizer: NormalizerConfig::default(),
            operators: OperatorWords::default(),
            admin_token: None,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub index_paths_root: PathBuf,
    /// Swapped whole on reload; searches work on their own `Arc` clone.
    pub snapshot: Arc<RwLock<Arc<Snapshot>>>,
    pub normalizer: Arc<Normalizer>,
    pub engine: Arc<BooleanEngine>,
    pub admin_token: Option<String>,
}

impl AppState {
    fn current(&self) -> Arc<Snapshot> { self.snapshot.read().clone() }
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    // Load the snapshot at startup
    let snapshot = load_index(&IndexPaths::new(&config.index_dir))?;
    tracing::info!(num_docs = snapshot.index.num_docs(), vocabulary = snapshot.tfidf.num_terms(), "index loaded");
    let app_state = AppState {
        index_paths_root: config.index_dir,
        snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
        normalizer: Arc::new(Normalizer::new(config.normalizer)),
        engine: Arc::new(BooleanEngine::new(config.operators)),
        admin_token: config.admin_token,
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search/boolean", get(boolean_handler))
        .route("/search/vector", get(vector_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn boolean_handler(State(state): State<AppState>, Query(params): Query<BooleanParams>) -> Json<BooleanResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let doc_ids = snapshot.boolean_normalized(&state.engine, &params.q, &state.normalizer);
    Json(BooleanResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: doc_ids.len(), doc_ids })
}

pub async fn vector_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<VectorResponse> {
    let start = std::time::Instant::now();
    let snapshot = state.current();
    let terms = state.normalizer.normalize(&params.q);
    let respond = |status: &'static str, total_hits: usize, results: Vec<VectorHit>| {
        Json(VectorResponse { query: params.q.clone(), took_s: start.elapsed().as_secs_f64(), status, total_hits, results })
    };
    if terms.is_empty() {
        return respond("no_meaningful_words", 0, vec![]);
    }

    let ranked = match snapshot.ranker().rank(&terms, usize::MAX) {
        RankOutcome::NoIndexedTerms => return respond("no_indexed_terms", 0, vec![]),
        RankOutcome::Ranked(ranked) => ranked,
    };
    let total_hits = ranked.len();
    let k = params.k.clamp(1, 100);
    let results = ranked
        .into_iter()
        .take(k)
        .map(|r| VectorHit {
            doc_id: r.doc_id,
            score: r.score,
            term_weights: r.term_weights.into_iter().map(|(term, weight)| TermWeight { term, weight }).collect(),
        })
        .collect();
    respond("ok", total_hits, results)
}

/// Re-read the index directory and swap the new snapshot in.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_paths_root);
    let loaded = tokio::task::spawn_blocking(move || load_index(&paths))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;
    let body = serde_json::json!({
        "num_docs": loaded.index.num_docs(),
        "vocabulary": loaded.tfidf.num_terms(),
    });
    *state.snapshot.write() = Arc::new(loaded);
    tracing::info!(%body, "snapshot reloaded");
    Ok(Json(body))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
