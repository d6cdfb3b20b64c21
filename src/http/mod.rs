//! HTTP handlers and routing.
//!
//! Every request is authenticated before its method is looked at. Failed
//! authentication always yields the same bare `403`, whatever the reason.

mod metrics;
mod payload;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::Authenticator;
use crate::clipboard::ClipboardBackend;
use crate::config::PayloadFormat;
use crate::error::{ClipError, ClipboardErrorKind, RequestErrorKind};

pub use metrics::{InFlightGuard, RequestMetrics};
pub use payload::parse_payload;

/// Header carrying the request timestamp.
pub const TIMESTAMP_HEADER: &str = "Timestamp";

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<Authenticator>,
    pub clipboard: Arc<dyn ClipboardBackend>,
    pub payload: PayloadFormat,
    pub max_body_bytes: usize,
    pub metrics: Arc<RequestMetrics>,
}

pub fn router(app_state: AppState) -> Router {
    // The endpoint is path-agnostic: every path reaches the same handler
    Router::new()
        .route("/", any(handle_request))
        .fallback(handle_request)
        .with_state(app_state)
}

async fn handle_request(State(app_state): State<AppState>, request: Request) -> Response {
    let request_id = Uuid::new_v4();
    let _in_flight = app_state.metrics.begin();
    let (parts, body) = request.into_parts();

    info!(
        request_id = %request_id,
        method = %parts.method,
        path = %parts.uri.path(),
        "Received request"
    );

    // Missing headers are treated as empty strings and fail the same checks
    let timestamp = header_str(&parts.headers, TIMESTAMP_HEADER);
    let tag = header_str(&parts.headers, app_state.authenticator.tag_header());
    if let Err(kind) = app_state.authenticator.validate(timestamp, tag) {
        warn!(request_id = %request_id, reason = %kind, "Request authentication failed");
        app_state.metrics.record_rejected();
        return forbidden();
    }

    match parts.method {
        Method::GET => read_clipboard(&app_state, request_id).await,
        Method::POST => {
            let content_type = header_str(&parts.headers, header::CONTENT_TYPE.as_str());
            let content_type = (!content_type.is_empty()).then_some(content_type);
            write_clipboard(&app_state, request_id, content_type, body).await
        }
        other => reject_request(
            request_id,
            RequestErrorKind::UnsupportedMethod {
                method: other.to_string(),
            },
        ),
    }
}

async fn read_clipboard(app_state: &AppState, request_id: Uuid) -> Response {
    let clipboard = Arc::clone(&app_state.clipboard);
    match run_blocking(move || clipboard.read()).await {
        Ok(content) => {
            info!(request_id = %request_id, bytes = content.len(), "Clipboard read");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                content,
            )
                .into_response()
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Clipboard read failed");
            app_state.metrics.record_failed();
            internal_error()
        }
    }
}

async fn write_clipboard(
    app_state: &AppState,
    request_id: Uuid,
    content_type: Option<&str>,
    body: Body,
) -> Response {
    let bytes = match axum::body::to_bytes(body, app_state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return reject_request(
                request_id,
                RequestErrorKind::BodyUnreadable {
                    message: e.to_string(),
                },
            )
        }
    };

    let text = match parse_payload(app_state.payload, content_type, &bytes) {
        Ok(text) => text,
        Err(kind) => return reject_request(request_id, kind),
    };

    let clipboard = Arc::clone(&app_state.clipboard);
    let written = text.len();
    match run_blocking(move || clipboard.write(&text)).await {
        Ok(()) => {
            info!(request_id = %request_id, bytes = written, "Clipboard written");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Clipboard write failed");
            app_state.metrics.record_failed();
            internal_error()
        }
    }
}

/// Run a backend call on the blocking pool.
async fn run_blocking<T, F>(operation: F) -> Result<T, ClipError>
where
    F: FnOnce() -> Result<T, ClipError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|e| ClipError::Clipboard {
            kind: ClipboardErrorKind::TaskFailed {
                message: e.to_string(),
            },
        })?
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Log a malformed request and answer `400`.
fn reject_request(request_id: Uuid, kind: RequestErrorKind) -> Response {
    let error = ClipError::Request { kind };
    warn!(request_id = %request_id, error = %error, "Rejected request");
    bad_request()
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "403 Forbidden").into_response()
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, "400 Bad Request").into_response()
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
}
