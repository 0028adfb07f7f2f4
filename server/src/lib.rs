use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use engine::eval::{self, GoldSet, MetricBlock, Verdict};
use engine::persist::{load_index, IndexPaths};
use engine::rank::{self, Algorithm, CompareOutcome, SearchHit};
use engine::{Bm25Params, CorpusIndex, DocId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, AllowOrigin, CorsLayer};

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    /// Immutable index snapshot; reload builds a new one and swaps the Arc,
    /// so in-flight requests keep reading the snapshot they started with.
    pub index: Arc<RwLock<Arc<CorpusIndex>>>,
    pub gold: Option<Arc<GoldSet>>,
    pub bm25: Bm25Params,
    pub admin_token: Option<String>,
}

impl AppState {
    fn snapshot(&self) -> Arc<CorpusIndex> {
        self.index.read().clone()
    }
}

/// Load the index snapshot and judgments and assemble the router.
pub fn build_app(index_dir: &str, judgments: Option<&str>, bm25: Bm25Params) -> Result<Router> {
    let paths = IndexPaths::new(index_dir);
    let index = load_index(&paths)?;
    tracing::info!(
        num_docs = index.document_count(),
        num_terms = index.vocabulary_size(),
        "index snapshot loaded"
    );

    let gold = match judgments {
        Some(path) => {
            let gold = GoldSet::from_path(path)?;
            tracing::info!(num_queries = gold.len(), "gold judgments loaded");
            Some(Arc::new(gold))
        }
        None => None,
    };

    let state = AppState {
        index_dir: PathBuf::from(index_dir),
        index: Arc::new(RwLock::new(Arc::new(index))),
        gold,
        bm25,
        admin_token: std::env::var("ADMIN_TOKEN").ok(),
    };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/", get(home_handler))
        .route("/api/health", get(health_handler))
        .route("/api/search", post(search_handler))
        .route("/api/search/compare", post(compare_handler))
        .route("/api/evaluate", post(evaluate_handler))
        .route("/api/document/:doc_id", get(document_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/index/reload", post(reload_handler))
        .with_state(state)
        .layer(cors);
    Ok(app)
}

async fn home_handler() -> Json<serde_json::Value> {
    Json(json!({
        "name": "news search api",
        "algorithms": ["tfidf", "bm25"],
        "endpoints": {
            "health": "/api/health",
            "search": "/api/search",
            "compare": "/api/search/compare",
            "evaluate": "/api/evaluate",
            "document": "/api/document/<doc_id>",
            "stats": "/api/stats"
        }
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = state.snapshot();
    Json(json!({
        "status": "ok",
        "documents": index.document_count(),
        "judgments_loaded": state.gold.is_some(),
    }))
}

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub algorithm: Option<Algorithm>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub algorithm: Algorithm,
    pub execution_time: f64,
    pub total_results: usize,
    pub results: Vec<SearchHit>,
}

fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn validated_query(raw: &str) -> Result<&str, ApiError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "query cannot be empty"));
    }
    Ok(query)
}

async fn search_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = validated_query(&body.query)?;
    let algorithm = body.algorithm.unwrap_or(Algorithm::Tfidf);
    let limit = clamp_limit(body.limit);
    let index = state.snapshot();
    let ranked = rank::search_timed(&index, query, algorithm, Some(limit), state.bm25);
    Ok(Json(SearchResponse {
        query: query.to_string(),
        algorithm,
        execution_time: ranked.execution_time,
        total_results: ranked.total_results,
        results: ranked.results,
    }))
}

#[derive(Deserialize)]
pub struct CompareBody {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct CompareResponse {
    pub query: String,
    #[serde(flatten)]
    pub outcome: CompareOutcome,
    pub comparison: OverlapSummary,
}

#[derive(Serialize)]
pub struct OverlapSummary {
    pub overlap_count: usize,
    pub overlap_percentage: f64,
    pub tfidf_only: Vec<DocId>,
    pub bm25_only: Vec<DocId>,
    pub faster_algorithm: Algorithm,
    pub speed_difference: f64,
}

async fn compare_handler(
    State(state): State<AppState>,
    Json(body): Json<CompareBody>,
) -> Result<Json<CompareResponse>, ApiError> {
    let query = validated_query(&body.query)?;
    let limit = clamp_limit(body.limit);
    let index = state.snapshot();
    let outcome = rank::compare(&index, query, Some(limit), state.bm25);

    let tfidf_ids: HashSet<DocId> = outcome.tfidf.results.iter().map(|h| h.doc_id).collect();
    let bm25_ids: HashSet<DocId> = outcome.bm25.results.iter().map(|h| h.doc_id).collect();
    let overlap_count = tfidf_ids.intersection(&bm25_ids).count();
    let mut tfidf_only: Vec<DocId> = tfidf_ids.difference(&bm25_ids).copied().collect();
    let mut bm25_only: Vec<DocId> = bm25_ids.difference(&tfidf_ids).copied().collect();
    tfidf_only.sort_unstable();
    bm25_only.sort_unstable();

    let comparison = OverlapSummary {
        overlap_count,
        overlap_percentage: overlap_count as f64 / limit as f64 * 100.0,
        tfidf_only,
        bm25_only,
        faster_algorithm: if outcome.tfidf.execution_time <= outcome.bm25.execution_time {
            Algorithm::Tfidf
        } else {
            Algorithm::Bm25
        },
        speed_difference: (outcome.tfidf.execution_time - outcome.bm25.execution_time).abs(),
    };

    Ok(Json(CompareResponse {
        query: query.to_string(),
        outcome,
        comparison,
    }))
}

#[derive(Deserialize)]
pub struct EvaluateBody {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Metric blocks are `null` when no judgment data exists for the query;
/// a judged query with an empty relevant set reports genuine zeros.
#[derive(Serialize)]
pub struct EvaluateResponse {
    pub query: String,
    pub top_k: usize,
    pub relevant_count: Option<usize>,
    pub tfidf: Option<MetricBlock>,
    pub bm25: Option<MetricBlock>,
    pub comparison: Option<Verdict>,
}

async fn evaluate_handler(
    State(state): State<AppState>,
    Json(body): Json<EvaluateBody>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let query = validated_query(&body.query)?;
    let top_k = body.top_k.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let index = state.snapshot();

    let evaluation = state
        .gold
        .as_deref()
        .and_then(|gold| eval::evaluate(&index, query, top_k, gold, state.bm25));

    let response = match evaluation {
        Some(e) => EvaluateResponse {
            query: query.to_string(),
            top_k,
            relevant_count: Some(e.relevant_count),
            tfidf: Some(e.tfidf),
            bm25: Some(e.bm25),
            comparison: Some(e.comparison),
        },
        None => EvaluateResponse {
            query: query.to_string(),
            top_k,
            relevant_count: None,
            tfidf: None,
            bm25: None,
            comparison: None,
        },
    };
    Ok(Json(response))
}

async fn document_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<u32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.snapshot();
    let doc = index
        .document(doc_id)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    Ok(Json(json!({
        "doc_id": doc_id,
        "id": doc.id,
        "title": doc.title,
        "content": doc.content,
        "url": doc.url,
        "source": doc.source,
        "published_at": doc.published_at,
        "main_image": doc.main_image,
    })))
}

async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = state.snapshot();
    let mut sources: HashMap<&str, u32> = HashMap::new();
    for doc in &index.docs {
        *sources.entry(doc.source.as_str()).or_insert(0) += 1;
    }
    Json(json!({
        "total_documents": index.document_count(),
        "vocabulary_size": index.vocabulary_size(),
        "average_document_length": index.average_document_length(),
        "sources": sources,
        "algorithms": ["tfidf", "bm25"],
    }))
}

/// Reload the index from disk and swap the snapshot in place. Readers that
/// already hold the old Arc finish against it; no torn reads.
async fn reload_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let paths = IndexPaths::new(&state.index_dir);
    let fresh = load_index(&paths)
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, format!("reload failed: {e}")))?;
    let num_docs = fresh.document_count();
    *state.index.write() = Arc::new(fresh);
    tracing::info!(num_docs, "index snapshot reloaded");
    Ok(Json(json!({ "status": "reloaded", "documents": num_docs })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers
        .get("X-ADMIN-TOKEN")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
