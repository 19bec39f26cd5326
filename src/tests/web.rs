//! Router-level tests: response shapes, status codes, cache headers.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::Config;
use crate::listings::MemoryCatalog;
use crate::semantic::{IndexMaintainer, MemoryStore, QueryService};
use crate::tests::stubs::StubEmbedder;
use crate::web::{router, SharedState};

fn state() -> SharedState {
    let embeddings = Arc::new(StubEmbedder);
    let store = Arc::new(MemoryStore::new());

    SharedState {
        query: Arc::new(QueryService::new(
            embeddings.clone(),
            Some(store.clone()),
            Config::default().search,
        )),
        maintainer: Arc::new(IndexMaintainer::new(
            Some(Arc::new(MemoryCatalog::new(vec![]))),
            embeddings,
            Some(store),
        )),
        config: Arc::new(Config::default()),
    }
}

async fn post_json(uri: &str, body: Value) -> (StatusCode, Option<String>, Value) {
    let app = router(state());
    let response = app
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let cache = response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, cache, body)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_short_query_is_200_with_reason() {
    let (status, cache, body) =
        post_json("/api/search/semantic", json!({"query": "ap"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache.as_deref(), Some("no-store"));
    assert_eq!(body["enabled"], false);
    assert_eq!(body["reason"], "query_too_short");
    assert_eq!(body["results"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_malformed_body_is_400() {
    let app = router(state());
    let response = app
        .oneshot(
            Request::post("/api/search/semantic")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_search_happy_path_shape() {
    let (status, _, body) = post_json(
        "/api/search/semantic",
        json!({"query": "appartement oran", "limit": 10, "min_similarity": 0.2}),
    )
    .await;

    // empty index: enabled with zero results, not an error
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert!(body.get("reason").is_none());
    assert_eq!(body["results"], json!([]));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reindex_endpoint_reports_page() {
    let (status, _, body) =
        post_json("/api/admin/reindex", json!({"limit": 10, "offset": 0})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 0);
    assert_eq!(body["has_more"], false);
    assert_eq!(body["next_offset"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reindex_one_endpoint_is_bounded() {
    let (status, _, body) = post_json(
        "/api/internal/reindex-one",
        json!({"id": 4, "reference": "REF-0004", "title": "Appartement F4", "location": "Oran"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_health() {
    let app = router(state());
    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
