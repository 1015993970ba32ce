//! Registration endpoint handlers
//!
//! Both operations exchange the `Registration` envelope. Bodies are
//! deserialized by hand so malformed input maps to 400 rather than the
//! extractor's default rejection.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{debug, info};

use beacon_types::Registration;

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Announce one instance: `PUT /registrations`.
///
/// The envelope must carry exactly one service. Success is 201; a
/// malformed body or a rejected instance is 400; a store inconsistency
/// after the swap is 500.
pub async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<StatusCode> {
    let registration: Registration = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed registration: {}", e)))?;

    let mut services = registration.services;
    if services.len() != 1 {
        return Err(ApiError::BadRequest(format!(
            "Registration must carry exactly one service, got {}",
            services.len()
        )));
    }
    let instance = services.remove(0);

    info!(function = %registration.function, instance = %instance.name, "Registering instance");
    state.registry.upsert(&registration.function, instance)?;

    Ok(StatusCode::CREATED)
}

/// Look up a function's instances: `GET /registrations`.
///
/// The query rides in a JSON body naming the function. An unknown or
/// emptied function is 204 with no body; otherwise 200 with the full
/// envelope.
pub async fn lookup(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let query: Registration = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed query: {}", e)))?;

    let services = state.registry.query(&query.function);
    debug!(function = %query.function, instances = services.len(), "Registry queried");

    if services.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let envelope = Registration {
        function: query.function,
        services,
    };
    Ok((StatusCode::OK, Json(envelope)).into_response())
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub functions: usize,
}

/// Health check: `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        functions: state.registry.functions().len(),
    })
}
