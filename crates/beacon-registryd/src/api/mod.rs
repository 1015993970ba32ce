//! Registry HTTP API

pub mod handlers;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Create the registry endpoint router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/registrations",
            get(handlers::lookup).put(handlers::register),
        )
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
