use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::database;
use crate::router::AppState;

/// 200 when the database answers, 503 otherwise.
pub async fn healthz(State(state): State<AppState>) -> Response {
    match database::health_check(&state.pool).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            tracing::error!(err = %err, "health check failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
