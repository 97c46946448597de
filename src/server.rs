use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use chrono::Utc;
use hyper::Server;
use serde::Serialize;
use serde_json::json;
use tokio::task;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::acquire::ReportFetcher;
use crate::config::Settings;
use crate::error::ScraperError;
use crate::locator::find_latest_report_file;
use crate::normalize::{normalize_file, persist_records, Record};
use crate::reports::ReportKind;

/// Shared state for the report routes
pub struct AppState {
    pub settings: Settings,
    pub fetcher: Box<dyn ReportFetcher>,
}

/// Envelope wrapping a normalized record list in every successful response
#[derive(Serialize)]
struct ReportResponse {
    status: &'static str,
    message: String,
    timestamp: String,
    source: &'static str,
    report_type: &'static str,
    total_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_saved: Option<String>,
    data: Vec<Record>,
}

impl ReportResponse {
    fn success(
        kind: ReportKind,
        message: String,
        source: &'static str,
        file_saved: Option<String>,
        data: Vec<Record>,
    ) -> Response {
        Json(ReportResponse {
            status: "success",
            message,
            timestamp: Utc::now().to_rfc3339(),
            source,
            report_type: kind.tag(),
            total_records: data.len(),
            file_saved,
            data,
        })
        .into_response()
    }
}

/// Service info endpoint
async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Data-sharing portal report API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /api/reports/:kind": "Normalize the newest existing export (no acquisition)",
            "POST /api/reports/:kind": "Run the acquisition stage, then normalize the fresh export",
            "GET /health": "Service health",
        },
        "report_kinds": ["catalogados", "stockdetalle", "mermasventas"],
    }))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "datashare-scraper",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET: normalize the newest existing export for a report kind.
/// Never triggers acquisition.
async fn get_report(
    Extension(state): Extension<Arc<AppState>>,
    Path(kind_tag): Path<String>,
) -> Response {
    let kind = match parse_kind(&kind_tag) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    let downloads_dir = state.settings.downloads_dir.clone();
    let result = task::spawn_blocking(move || {
        let file = find_latest_report_file(&downloads_dir, kind)?;
        normalize_file(&file, Some(kind))
    })
    .await;

    match flatten(result) {
        Ok(records) => ReportResponse::success(
            kind,
            format!("{} data read from existing export", kind.display_name()),
            "existing_file",
            None,
            records,
        ),
        Err(err) => error_response(kind, &err),
    }
}

/// POST: run the acquisition stage, then normalize and persist the fresh
/// export. Persistence is best effort; records are returned either way.
async fn acquire_report(
    Extension(state): Extension<Arc<AppState>>,
    Path(kind_tag): Path<String>,
) -> Response {
    let kind = match parse_kind(&kind_tag) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    let file = match state.fetcher.fetch(kind).await {
        Ok(file) => file,
        Err(err) => return error_response(kind, &err),
    };

    let output_path = state.settings.downloads_dir.join(kind.output_file_name());
    let result = task::spawn_blocking(move || {
        let records = normalize_file(&file, Some(kind))?;
        let file_saved = match persist_records(&records, &output_path) {
            Ok(()) => Some(output_path.display().to_string()),
            Err(err) => {
                warn!("Keeping in-memory records despite persist failure: {}", err);
                None
            }
        };
        Ok((records, file_saved))
    })
    .await;

    match flatten(result) {
        Ok((records, file_saved)) => ReportResponse::success(
            kind,
            format!("{} acquisition completed successfully", kind.display_name()),
            "fresh_scraping",
            file_saved,
            records,
        ),
        Err(err) => error_response(kind, &err),
    }
}

fn parse_kind(tag: &str) -> Result<ReportKind, Response> {
    ReportKind::from_tag(tag).ok_or_else(|| {
        let body = json!({
            "detail": format!(
                "unknown report kind '{}' (expected catalogados, stockdetalle or mermasventas)",
                tag
            )
        });
        (StatusCode::NOT_FOUND, Json(body)).into_response()
    })
}

fn flatten<T>(
    result: Result<crate::error::Result<T>, task::JoinError>,
) -> crate::error::Result<T> {
    match result {
        Ok(inner) => inner,
        Err(join_err) => Err(ScraperError::Internal(format!(
            "normalization task failed: {}",
            join_err
        ))),
    }
}

fn error_response(kind: ReportKind, err: &ScraperError) -> Response {
    let (status, detail) = match err {
        ScraperError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            format!(
                "No {} export available yet. Run a POST acquisition first.",
                kind.display_name()
            ),
        ),
        ScraperError::Acquisition(message) => (StatusCode::BAD_GATEWAY, message.clone()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    };
    error!("{} request failed: {}", kind.tag(), err);
    (status, Json(json!({ "detail": detail }))).into_response()
}

/// Create the HTTP router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/reports/:kind", get(get_report).post(acquire_report))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the configured host and port
pub async fn start_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let host: IpAddr = state
        .settings
        .server_host
        .parse()
        .map_err(|_| ScraperError::Config(format!("invalid SERVER_HOST '{}'", state.settings.server_host)))?;
    let addr = SocketAddr::new(host, state.settings.server_port);
    let port = state.settings.server_port;

    let app = create_router(state);

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check:   http://localhost:{port}/health");
    println!("📊 Report routes:  http://localhost:{port}/api/reports/<kind>");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}
