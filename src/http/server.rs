//! Router assembly and server lifecycle.

use super::error::ApiError;
use super::{handlers, voice};
use crate::config::{HeritageConfig, ServerSettings};
use crate::services::deduplication::RequestLedger;
use crate::services::voice::{ScriptedResponder, SpeechService};
use crate::services::{GraphService, SearchService, VoiceService};
use crate::storage::{GraphGateway, GraphStore};
use crate::{Error, Result};
use axum::extract::{DefaultBodyLimit, MatchedPath, Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Browse and CRUD.
    pub graph: GraphService,
    /// Question and mention resolution.
    pub search: SearchService,
    /// Chat and voice round trips.
    pub voice: VoiceService,
    metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wires services over `store` from configuration.
    ///
    /// The request ledger is created here and owned by the state.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>, config: &HeritageConfig) -> Self {
        let ledger = Arc::new(RequestLedger::new(config.ledger.clone()));
        let gateway: Arc<dyn GraphGateway> = store.clone();
        let search = SearchService::new(gateway, config.resolver.clone());
        let voice = VoiceService::new(search.clone(), ScriptedResponder::new(config.chat.clone()))
            .with_fallback_tone(config.speech.fallback_tone);

        Self {
            graph: GraphService::new(store).with_ledger(ledger),
            search,
            voice,
            metrics: None,
        }
    }

    /// Attaches a speech service for `/api/voice/interact`.
    #[must_use]
    pub fn with_speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.voice = self.voice.with_speech(speech);
        self
    }

    /// Serves Prometheus metrics at `/metrics` through `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Runs a blocking service call on the blocking pool.
pub(super) async fn blocking<T, F>(f: F) -> std::result::Result<T, ApiError>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(Error::operation("spawn_blocking", e)))?
        .map_err(ApiError)
}

/// Builds the application router.
pub fn build_router(state: AppState, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/api/data", get(handlers::sample))
        .route("/api/data/{name}", get(handlers::children))
        .route("/api/data/parents/{name}", get(handlers::parents))
        .route("/api/data/nodes", post(handlers::create_node))
        .route(
            "/api/data/nodes/{name}",
            patch(handlers::update_node).delete(handlers::delete_node),
        )
        .route(
            "/api/data/relationships",
            post(handlers::create_relationship).delete(handlers::delete_relationships),
        )
        .route("/api/data/semantic-search", post(handlers::semantic_search))
        .route("/api/data/fuzzy-search", post(handlers::fuzzy_search))
        .route("/api/voice/chat", post(voice::chat))
        .route("/api/voice/interact", post(voice::interact))
        .route_layer(middleware::from_fn(track_requests))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(cors_layer(&settings.cors_origins))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Binds `addr` and serves `router` until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::operation("bind", e))?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::operation("serve", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            },
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!("http_request_duration_ms", "method" => method, "route" => route)
        .record(start.elapsed().as_secs_f64() * 1000.0);

    response
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let graph = state.graph.clone();
    let stats = blocking(move || graph.stats()).await;
    let (status, graph) = match stats {
        Ok(stats) => ("ok", json!(stats)),
        Err(e) => {
            tracing::warn!(error = ?e.0, "Health check could not read graph stats");
            ("degraded", Value::Null)
        },
    };
    Json(json!({
        "status": status,
        "version": env!("CARGO_PKG_VERSION"),
        "speech": state.voice.speech_name(),
        "graph": graph,
    }))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    state.metrics.as_ref().map_or_else(
        || (StatusCode::NOT_FOUND, "metrics are not enabled").into_response(),
        |handle| handle.render().into_response(),
    )
}
