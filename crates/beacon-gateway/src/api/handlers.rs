//! Forwarding handler
//!
//! Resolves the inbound envelope's function to a live instance through
//! the registry, forwards the payload, and relays whatever the instance
//! answered. Every path completes the caller's response exactly once:
//! resolution failures map to 4xx/5xx here, a backend's own non-2xx
//! answer is relayed as-is, and only an unreachable backend is 502.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use beacon_types::ForwardRequest;

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};

/// Forward a payload to one live instance of its function: `POST /forward`.
pub async fn forward(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let request: ForwardRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Malformed forward request: {}", e)))?;

    if request.function.trim().is_empty() {
        return Err(ApiError::BadRequest("Blank function name".to_string()));
    }

    let instances = state
        .registry
        .lookup(&request.function)
        .await
        .map_err(|e| {
            warn!(function = %request.function, error = %e, "Registry lookup failed");
            ApiError::Registry(e.to_string())
        })?;

    let instance = instances
        .choose(&mut rand::thread_rng())
        .ok_or_else(|| ApiError::NoInstances(request.function.clone()))?;

    let url = format!("http://{}{}", instance.authority(), state.forward_path);
    debug!(function = %request.function, instance = %instance.name, %url, "Forwarding");

    let upstream = state
        .forwarder
        .post(&url)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.clone())
        .send()
        .await
        .map_err(|e| {
            warn!(instance = %instance.name, error = %e, "Forward failed");
            ApiError::Forward(e.to_string())
        })?;

    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .cloned();
    let relayed = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::Forward(e.to_string()))?;

    info!(
        function = %request.function,
        instance = %instance.name,
        status = status.as_u16(),
        "Relaying instance response"
    );

    let mut response = Response::builder().status(status);
    if let Some(content_type) = content_type {
        response = response.header(header::CONTENT_TYPE, content_type);
    }
    response
        .body(Body::from(relayed))
        .map_err(|e| ApiError::Forward(e.to_string()))
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
}

/// Health check: `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use crate::config::{ForwardConfig, RegistryConfig};
    use crate::discovery::RegistryClient;
    use axum::extract::State as AxumState;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use beacon_types::{Instance, Registration};
    use http_body_util::BodyExt;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn spawn(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    /// Stub registry answering every lookup with a fixed response.
    async fn stub_registry(status: StatusCode, services: Vec<Instance>) -> SocketAddr {
        let router = Router::new().route(
            "/registrations",
            get(move |body: Bytes| {
                let services = services.clone();
                async move {
                    let query: Registration = serde_json::from_slice(&body).unwrap();
                    if services.is_empty() {
                        return status.into_response();
                    }
                    let envelope = Registration {
                        function: query.function,
                        services,
                    };
                    (status, Json(envelope)).into_response()
                }
            }),
        );
        spawn(router).await
    }

    /// Stub worker counting hits and echoing the inbound message.
    async fn stub_backend(status: StatusCode, hits: Arc<AtomicUsize>) -> SocketAddr {
        let router = Router::new().route(
            "/chat/messages",
            post(move |AxumState(hits): AxumState<Arc<AtomicUsize>>, body: Bytes| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                let request: ForwardRequest = serde_json::from_slice(&body).unwrap();
                let message = request
                    .requests
                    .first()
                    .map(|r| r.message.clone())
                    .unwrap_or_default();
                (status, format!("accepted: {}", message))
            })
            .with_state(hits),
        );
        spawn(router).await
    }

    fn gateway_for(registry: SocketAddr) -> Router {
        let client = RegistryClient::new(&RegistryConfig {
            host: registry.ip().to_string(),
            port: registry.port(),
            query_timeout_secs: 1,
        })
        .unwrap();
        let state = AppState::new(client, &ForwardConfig::default()).unwrap();
        create_router(state)
    }

    fn forward_body(function: &str) -> String {
        serde_json::json!({
            "function": function,
            "requests": [{
                "user": "u",
                "message": "hi",
                "timestamp": "2024-01-01T00:00:00Z",
                "recipients": []
            }]
        })
        .to_string()
    }

    fn forward_request(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/forward")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn blank_function_is_400_without_lookup() {
        // Registry at an unreachable port: a lookup attempt would fail.
        let app = gateway_for("127.0.0.1:9".parse().unwrap());
        let response = app
            .oneshot(forward_request(forward_body("   ")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_body_is_400() {
        let app = gateway_for("127.0.0.1:9".parse().unwrap());
        let response = app
            .oneshot(forward_request("{broken".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_registry_is_500() {
        let app = gateway_for("127.0.0.1:9".parse().unwrap());
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn registry_error_status_is_500() {
        let registry = stub_registry(StatusCode::INTERNAL_SERVER_ERROR, vec![]).await;
        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_instances_is_404_and_no_backend_contact() {
        let hits = Arc::new(AtomicUsize::new(0));
        let _backend = stub_backend(StatusCode::ACCEPTED, Arc::clone(&hits)).await;
        let registry = stub_registry(StatusCode::NO_CONTENT, vec![]).await;

        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn relays_backend_status_and_body_verbatim() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = stub_backend(StatusCode::ACCEPTED, Arc::clone(&hits)).await;
        let registry = stub_registry(
            StatusCode::OK,
            vec![Instance::new("pod-1", backend.ip().to_string(), backend.port())],
        )
        .await;

        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(response).await, "accepted: hi");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn backend_non_2xx_is_relayed_not_mapped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let backend = stub_backend(StatusCode::CONFLICT, Arc::clone(&hits)).await;
        let registry = stub_registry(
            StatusCode::OK,
            vec![Instance::new("pod-1", backend.ip().to_string(), backend.port())],
        )
        .await;

        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_string(response).await, "accepted: hi");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_backend_is_502() {
        let registry = stub_registry(
            StatusCode::OK,
            vec![Instance::new("pod-1", "127.0.0.1", 9)],
        )
        .await;

        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn selection_reaches_every_instance() {
        let hits_a = Arc::new(AtomicUsize::new(0));
        let hits_b = Arc::new(AtomicUsize::new(0));
        let backend_a = stub_backend(StatusCode::ACCEPTED, Arc::clone(&hits_a)).await;
        let backend_b = stub_backend(StatusCode::ACCEPTED, Arc::clone(&hits_b)).await;
        let registry = stub_registry(
            StatusCode::OK,
            vec![
                Instance::new("pod-a", backend_a.ip().to_string(), backend_a.port()),
                Instance::new("pod-b", backend_b.ip().to_string(), backend_b.port()),
            ],
        )
        .await;

        let app = gateway_for(registry);
        for _ in 0..40 {
            let response = app
                .clone()
                .oneshot(forward_request(forward_body("chat")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::ACCEPTED);
        }

        // Uniform-random over two instances: 40 draws all landing on one
        // side has probability 2^-39.
        assert!(hits_a.load(Ordering::SeqCst) > 0);
        assert!(hits_b.load(Ordering::SeqCst) > 0);
        assert_eq!(
            hits_a.load(Ordering::SeqCst) + hits_b.load(Ordering::SeqCst),
            40
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forwards_through_a_real_registry() {
        use beacon_registry::ServiceRegistry;
        use beacon_registryd::api as registry_api;

        let hits = Arc::new(AtomicUsize::new(0));
        let backend = stub_backend(StatusCode::ACCEPTED, Arc::clone(&hits)).await;

        // The registry daemon's actual router, not a stub of its wire shape.
        let registry = spawn(registry_api::create_router(registry_api::AppState::new(
            Arc::new(ServiceRegistry::new()),
        )))
        .await;

        // The worker announces itself the way a heartbeat would.
        let announce = Registration::announce(
            "chat",
            Instance::new("pod-1", backend.ip().to_string(), backend.port()),
        );
        let response = reqwest::Client::new()
            .put(format!("http://{}/registrations", registry))
            .json(&announce)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);

        // Caller -> gateway -> registry lookup -> backend -> relayed back.
        let app = gateway_for(registry);
        let response = app
            .oneshot(forward_request(forward_body("chat")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_string(response).await, "accepted: hi");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
