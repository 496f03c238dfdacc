//! HTTP boundary for the article pipeline.
//!
//! Routes:
//! - `GET /api/parse?url=` fetches and pre-sanitizes a page, returning its
//!   metadata plus the sanitized HTML. Content extraction and display
//!   normalization are left to the consumer, which calls back into the
//!   core for them.
//! - `GET /api/settings` / `POST /api/settings` read and replace the
//!   shared display settings; writes are validated, never clamped.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use legam_core::{DisplaySettings, LegamError, Reader};

#[derive(Clone)]
struct AppState {
    reader: Arc<Reader>,
    settings: Arc<RwLock<DisplaySettings>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseResponse {
    url: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_name: Option<String>,
    html: String,
    has_video: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

/// Map pipeline errors onto HTTP statuses. Upstream statuses pass through
/// when valid; anything unmappable becomes a 502.
fn status_for(err: &LegamError) -> StatusCode {
    match err {
        LegamError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        LegamError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
        LegamError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        LegamError::UpstreamStatus { status } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn parse_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(url) = params.get("url").map(String::as_str).filter(|u| !u.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "missing url parameter");
    };

    match state.reader.fetch_page(url).await {
        Ok(page) => Json(ParseResponse {
            url: page.url,
            title: page.metadata.title,
            excerpt: page.metadata.excerpt,
            site_name: page.metadata.site_name,
            html: page.html,
            has_video: page.metadata.has_video,
        })
        .into_response(),
        Err(err) => {
            tracing::warn!(url, %err, "parse request failed");
            error_response(status_for(&err), err.to_string())
        }
    }
}

async fn get_settings(State(state): State<AppState>) -> Response {
    match state.settings.read() {
        Ok(settings) => Json(settings.clone()).into_response(),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "settings store poisoned"),
    }
}

async fn put_settings(
    State(state): State<AppState>,
    Json(incoming): Json<DisplaySettings>,
) -> Response {
    if let Err(reason) = incoming.validate() {
        return error_response(StatusCode::BAD_REQUEST, reason);
    }
    match state.settings.write() {
        Ok(mut settings) => {
            *settings = incoming;
            Json(settings.clone()).into_response()
        }
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "settings store poisoned"),
    }
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/parse", get(parse_handler))
        .route("/api/settings", get(get_settings).post(put_settings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

fn new_state() -> AppState {
    AppState {
        reader: Arc::new(Reader::new()),
        settings: Arc::new(RwLock::new(DisplaySettings::default())),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000u16);
    let addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, %err, "failed to bind");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "listening");
    if let Err(err) = axum::serve(listener, app(new_state())).await {
        tracing::error!(%err, "server exited with error");
    }
}
