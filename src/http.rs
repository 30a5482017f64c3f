use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::Instrument as _;

use crate::error::TelemetryError;
use crate::export::{EXPOSITION_CONTENT_TYPE, EndpointsReport, MetricsSummary};
use crate::telemetry::Telemetry;

static REQUEST_ID_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Routes serving both export formats plus a liveness probe. Every route is
/// wrapped in [`track_requests`], so scrapes show up in the request metrics.
pub fn router(telemetry: Arc<Telemetry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/api/metrics", get(api_metrics))
        .route("/api/metrics/endpoints", get(api_metrics_endpoints))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&telemetry),
            track_requests,
        ))
        .with_state(telemetry)
}

/// Times one request through the recorder. The endpoint label is the matched
/// route template, so path parameters do not fan out into new series.
pub async fn track_requests(
    State(telemetry): State<Arc<Telemetry>>,
    request: Request,
    next: Next,
) -> Response {
    let request_id = generate_request_id();
    let method = request.method().as_str().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let span = tracing::info_span!(
        "http_request",
        method = %method,
        path = %endpoint,
        request_id = %request_id,
        status = tracing::field::Empty,
    );

    async move {
        let recorder = telemetry.recorder();
        recorder.begin_request(&request_id);
        let response = next.run(request).await;
        let status = response.status().as_u16();
        let elapsed = recorder.end_request(&request_id, &method, &endpoint, status);

        tracing::Span::current().record("status", status);
        tracing::debug!(
            elapsed_ms = elapsed.map(|elapsed| elapsed.as_secs_f64() * 1000.0),
            "request completed"
        );
        response
    }
    .instrument(span)
    .await
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

async fn metrics(State(telemetry): State<Arc<Telemetry>>) -> impl IntoResponse {
    let rendered = telemetry.exporter().render_exposition();
    (
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static(EXPOSITION_CONTENT_TYPE))],
        rendered,
    )
}

async fn api_metrics(
    State(telemetry): State<Arc<Telemetry>>,
) -> Result<Json<MetricsSummary>, ApiError> {
    telemetry
        .exporter()
        .summary()
        .map(Json)
        .map_err(|err| export_failed(&telemetry, "/api/metrics", err))
}

async fn api_metrics_endpoints(
    State(telemetry): State<Arc<Telemetry>>,
) -> Result<Json<EndpointsReport>, ApiError> {
    telemetry
        .exporter()
        .endpoints()
        .map(Json)
        .map_err(|err| export_failed(&telemetry, "/api/metrics/endpoints", err))
}

fn export_failed(telemetry: &Telemetry, endpoint: &str, err: TelemetryError) -> ApiError {
    tracing::error!(endpoint, error = %err, "metrics export failed");
    telemetry.recorder().record_error("export_failed", endpoint);
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "export_failed",
        err.to_string(),
    )
}

fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
        }),
    )
}

fn generate_request_id() -> String {
    let seq = REQUEST_ID_SEQ.fetch_add(1, Ordering::Relaxed);
    let ts_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0);
    format!("req-{ts_ms}-{seq}")
}

/// Serves `router` until the listener fails.
pub async fn serve(listener: tokio::net::TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(listener, router).await
}
