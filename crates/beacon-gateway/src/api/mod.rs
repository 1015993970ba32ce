//! Gateway HTTP API

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Create the gateway router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/forward", post(handlers::forward))
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
