//! API module for all HTTP handlers

pub mod health;
pub mod webhook;

use axum::{Router, routing};

use crate::SharedState;

// Re-export handlers
pub use health::health;
pub use webhook::handle_webhook;

/// Builds the application router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/webhook", routing::post(handle_webhook))
        .route("/health", routing::get(health))
        .with_state(state)
}
