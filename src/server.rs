use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{
    error_response, AnalyzeRequest, AnalyzeResponse, ApiError, CompareQuery, CompareResponse,
    DiagnoseQuery,
};
use engagement_metrics::diagnostics::{diagnose_upstream, env_report, EnvReport, UpstreamReport};
use engagement_metrics::handle::{normalize_handle, parse_handle_list};
use engagement_metrics::{
    Aggregator, AppConfig, CompareEntry, CompareOptions, ContentSource, Error, Synchronizer,
};

#[derive(Clone)]
pub struct AppState {
    pub synchronizer: Arc<Synchronizer>,
    pub aggregator: Aggregator,
    pub source: Arc<dyn ContentSource>,
    pub config: Arc<AppConfig>,
    pub config_path: Option<PathBuf>,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/profile/analyze", post(analyze_handler))
        .route("/api/profile/:handle/summary", get(summary_handler))
        .route("/api/compare", get(compare_handler))
        .route("/api/diagnostics/upstream", get(diagnose_upstream_handler))
        .route("/api/diagnostics/env", get(diagnose_env_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(args: crate::ServeArgs, state: AppState) -> Result<(), String> {
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind server: {}", err))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<AnalyzeResponse> {
    let handle = request.into_handle().map_err(error_response)?;
    let report = state
        .synchronizer
        .sync(&handle)
        .await
        .map_err(error_response)?;
    Ok(Json(AnalyzeResponse::from(report)))
}

async fn summary_handler(
    State(state): State<AppState>,
    Path(handle): Path<String>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<CompareEntry> {
    let handle = normalize_handle(&handle);
    if handle.is_empty() {
        return Err(error_response(Error::InvalidRequest(
            "handle is required".to_string(),
        )));
    }
    let limit = state.config.compare.post_limit(query.requested_posts());
    let entry = state
        .aggregator
        .summarize_handle(&handle, limit)
        .await
        .map_err(error_response)?;
    Ok(Json(entry))
}

async fn compare_handler(
    State(state): State<AppState>,
    Query(query): Query<CompareQuery>,
) -> ApiResult<CompareResponse> {
    let handles =
        parse_handle_list([query.users.as_deref().unwrap_or_default()]).map_err(error_response)?;
    let options = CompareOptions {
        posts: state.config.compare.post_limit(query.requested_posts()),
        autofill: query.autofill(),
    };
    let results = state.aggregator.compare(&handles, options).await;
    Ok(Json(CompareResponse {
        ok: true,
        n: options.posts,
        results,
    }))
}

async fn diagnose_upstream_handler(
    State(state): State<AppState>,
    Query(query): Query<DiagnoseQuery>,
) -> ApiResult<UpstreamReport> {
    let report = diagnose_upstream(state.source.as_ref(), &query.into_handle())
        .await
        .map_err(error_response)?;
    Ok(Json(report))
}

async fn diagnose_env_handler(State(state): State<AppState>) -> Json<EnvReport> {
    Json(env_report(&state.config, state.config_path.as_deref()))
}
