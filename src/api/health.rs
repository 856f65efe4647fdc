//! Liveness endpoint

use axum::http::StatusCode;

/// Replies 200 with an empty body.
pub async fn health() -> StatusCode {
    StatusCode::OK
}
