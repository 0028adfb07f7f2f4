use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use engine::index::{CorpusIndex, Document, TfWeighting};
use engine::persist::{save_index, IndexPaths};
use engine::Bm25Params;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::fs;
use tempfile::tempdir;
use tower::ServiceExt;

fn doc(id: &str, title: &str, content: &str) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        source: "bola.net".to_string(),
        published_at: Some("2025-11-10".to_string()),
        content: content.to_string(),
        url: Some(format!("https://bola.example/{id}")),
        main_image: None,
    }
}

fn build_tiny_index(dir: &std::path::Path) {
    let index = CorpusIndex::build(
        vec![
            doc("d1", "Malam penentuan", "liga champions final liga champions final"),
            doc("d2", "Kabar kota", "liga"),
            doc("d3", "Cuaca", "hujan deras kota bandung"),
        ],
        TfWeighting::default(),
    );
    save_index(&IndexPaths::new(dir), &index).unwrap();
}

fn app_with_judgments(dir: &std::path::Path) -> Router {
    build_tiny_index(dir);
    let judgments = dir.join("judgments.json");
    fs::write(
        &judgments,
        json!({
            "liga champions": ["d1"],
            "tanpa jawaban": []
        })
        .to_string(),
    )
    .unwrap();
    server::build_app(
        dir.to_str().unwrap(),
        Some(judgments.to_str().unwrap()),
        Bm25Params::default(),
    )
    .unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    for algorithm in ["tfidf", "bm25"] {
        let (status, body) = post_json(
            app.clone(),
            "/api/search",
            json!({ "query": "liga champions", "algorithm": algorithm }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2, "{algorithm}");
        assert_eq!(results[0]["id"], "d1");
        assert_eq!(results[1]["id"], "d2");
        assert!(results[0]["score"].as_f64().unwrap() > results[1]["score"].as_f64().unwrap());
        assert!(body["execution_time"].as_f64().unwrap() >= 0.0);
    }
}

#[tokio::test]
async fn empty_query_is_a_validation_error() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) = post_json(app, "/api/search", json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_terms_yield_empty_results_not_an_error() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) = post_json(app, "/api/search", json!({ "query": "kriket wimbledon" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_results"], 0);
    assert!(body["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn compare_runs_both_algorithms() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) =
        post_json(app, "/api/search/compare", json!({ "query": "liga champions" })).await;
    assert_eq!(status, StatusCode::OK);
    for algorithm in ["tfidf", "bm25"] {
        let list = &body[algorithm];
        assert_eq!(list["results"].as_array().unwrap().len(), 2);
        assert!(list["execution_time"].as_f64().unwrap() >= 0.0);
    }
    assert_eq!(body["comparison"]["overlap_count"], 2);
    assert!(body["comparison"]["tfidf_only"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn evaluate_reports_metrics_for_judged_queries() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) = post_json(
        app,
        "/api/evaluate",
        json!({ "query": "liga champions", "top_k": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relevant_count"], 1);
    for algorithm in ["tfidf", "bm25"] {
        // d1 is the sole relevant document and ranks first under both.
        assert_eq!(body[algorithm]["map"], 1.0);
        assert_eq!(body[algorithm]["precision_at_5"].as_f64().unwrap(), 0.2);
        assert_eq!(body[algorithm]["recall_at_5"].as_f64().unwrap(), 1.0);
    }
    assert_eq!(body["comparison"]["winner_map"], "tie");
    assert_eq!(body["comparison"]["map_difference"], 0.0);
}

#[tokio::test]
async fn evaluate_with_empty_relevant_set_is_all_zeros() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) =
        post_json(app, "/api/evaluate", json!({ "query": "tanpa jawaban" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relevant_count"], 0);
    for algorithm in ["tfidf", "bm25"] {
        assert_eq!(body[algorithm]["map"], 0.0);
        assert_eq!(body[algorithm]["f1_at_10"], 0.0);
    }
    assert_eq!(body["comparison"]["winner_map"], "tie");
}

#[tokio::test]
async fn evaluate_without_judgment_data_serializes_null() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) =
        post_json(app, "/api/evaluate", json!({ "query": "query tak dinilai" })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["tfidf"].is_null());
    assert!(body["bm25"].is_null());
    assert!(body["comparison"].is_null());
    assert!(body["relevant_count"].is_null());
}

#[tokio::test]
async fn document_lookup_and_missing_document() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) = get(app.clone(), "/api/document/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "d1");
    assert_eq!(body["source"], "bola.net");

    let (status, _) = get(app, "/api/document/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reports_corpus_shape() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let (status, body) = get(app, "/api/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_documents"], 3);
    assert_eq!(body["sources"]["bola.net"], 3);
    assert!(body["vocabulary_size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn reload_requires_admin_token() {
    let dir = tempdir().unwrap();
    let app = app_with_judgments(dir.path());
    let req = Request::builder()
        .method("POST")
        .uri("/api/index/reload")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
