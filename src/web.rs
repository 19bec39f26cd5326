use crate::{
    config::Config,
    listings::Listing,
    semantic::{trigger_reindex, IndexMaintainer, QueryService, ReindexReport, SearchOutcome},
};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tokio::signal;

#[derive(Clone)]
pub struct SharedState {
    pub query: Arc<QueryService>,
    pub maintainer: Arc<IndexMaintainer>,
    pub config: Arc<Config>,
}

/// Build the full router. Split out of `start_app` so tests can drive it
/// with `tower::ServiceExt::oneshot`.
pub fn router(state: SharedState) -> Router {
    // Search responses must never be cached by intermediaries.
    let no_store = tower_http::set_header::SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );

    Router::new()
        .route("/api/search/semantic", post(search).layer(no_store))
        .route("/api/admin/reindex", post(reindex_page))
        .route("/api/internal/reindex-one", post(reindex_one))
        .route("/api/health", get(health))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(state)
}

async fn start_app(state: SharedState) {
    let listen_addr = state.config.listen_addr.clone();
    let app = router(state);

    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("cannot bind listen address");
    log::info!("listening on {listen_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

pub fn start_daemon(state: SharedState) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(state).await });
}

// Wraps errors from the admin paths; the search path never errors.
#[derive(Debug)]
struct HttpError(anyhow::Error);

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        log::error!("{:?}", self.0);
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": self.0.to_string()}).to_string(),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub limit: Option<usize>,
    pub min_similarity: Option<f32>,
}

/// Read path. Always answers 200 with the outcome envelope; a disabled
/// outcome tells the caller to fall back to keyword ranking.
async fn search(
    State(state): State<SharedState>,
    Json(payload): Json<SearchRequest>,
) -> Json<SearchOutcome> {
    log::debug!("payload: {payload:?}");

    tokio::task::block_in_place(move || {
        Json(
            state
                .query
                .search(&payload.query, payload.limit, payload.min_similarity),
        )
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReindexPageRequest {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Administrative batch path: processes exactly one page per call. Callers
/// poll with `next_offset` until `has_more` is false.
async fn reindex_page(
    State(state): State<SharedState>,
    Json(payload): Json<ReindexPageRequest>,
) -> Result<Json<ReindexReport>, HttpError> {
    log::debug!("payload: {payload:?}");

    let offset = payload.offset.unwrap_or(0);
    let limit = payload.limit.unwrap_or(state.config.reindex.page_size);

    tokio::task::block_in_place(move || {
        state
            .maintainer
            .reindex_page(offset, limit)
            .map(Json)
            .map_err(Into::into)
    })
}

#[derive(Debug, Serialize)]
pub struct ReindexOneResponse {
    /// `None` when the write outlived the ceiling and continues in
    /// background.
    pub indexed: Option<bool>,
}

/// Write-path trigger, called by the listing CRUD component after a
/// successful write. Bounded by the configured ceiling; never fails.
async fn reindex_one(
    State(state): State<SharedState>,
    Json(listing): Json<Listing>,
) -> Json<ReindexOneResponse> {
    log::debug!("reindex-one: listing {} ({})", listing.id, listing.reference);

    let ceiling = Duration::from_millis(state.config.reindex.write_ceiling_ms);
    let indexed = trigger_reindex(state.maintainer.clone(), listing, ceiling).await;

    Json(ReindexOneResponse { indexed })
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
