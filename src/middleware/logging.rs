use std::any::Any;
use std::time::Instant;

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::error::{error_body, INTERNAL_ERROR_MESSAGE};

/// Logs the start and finish of every request under a millisecond
/// timestamp `request_id`.
pub async fn log_request_edges(request: Request, next: Next) -> Response {
    let request_id = Utc::now().timestamp_millis();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    tracing::debug!(request_id, %method, %path, "start request");
    let response = next.run(request).await;
    tracing::debug!(
        request_id,
        %method,
        %path,
        status = response.status().as_u16(),
        duration = ?started.elapsed(),
        "finish request"
    );

    response
}

/// Panic handler for `CatchPanicLayer`.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = message, "caught panic in handler");
    error_body(500, INTERNAL_ERROR_MESSAGE).into_response()
}
