//! HTTP surface: `POST /register`, `GET /servers`, `GET /health`
//! (§6.5).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::state::RegistryState;

/// The registry service, wrapping shared state behind an `Arc`.
pub struct RegistryServer {
    state: Arc<RegistryState>,
}

impl RegistryServer {
    /// Wrap already-constructed (and possibly already-seeded) state.
    pub fn new(state: Arc<RegistryState>) -> Self {
        Self { state }
    }

    /// Shared state handle, for wiring the health monitor against the
    /// same map the HTTP server serves.
    pub fn state(&self) -> Arc<RegistryState> {
        Arc::clone(&self.state)
    }

    /// Build the axum router.
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }
}

/// Build the axum router over `state` directly, for callers that
/// don't need the [`RegistryServer`] wrapper (tests, `sage-cli`).
pub fn router(state: Arc<RegistryState>) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/servers", get(servers_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    name: String,
    url: String,
}

async fn register_handler(
    State(state): State<Arc<RegistryState>>,
    Json(body): Json<RegisterRequest>,
) -> impl IntoResponse {
    state.register(body.name, body.url.clone()).await;
    (StatusCode::OK, Json(json!({ "status": "ok", "url": body.url })))
}

async fn servers_handler(State(state): State<Arc<RegistryState>>) -> impl IntoResponse {
    Json(state.list().await)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(Arc::new(RegistryState::new()))
    }

    #[tokio::test]
    async fn register_then_list_round_trips() {
        let app = app();
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name":"mcp-database","url":"http://a/sse"}"#))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let list_request = Request::builder().uri("/servers").body(Body::empty()).unwrap();
        let list_response = app.oneshot(list_request).await.unwrap();
        assert_eq!(list_response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(list_response.into_body(), usize::MAX).await.unwrap();
        let providers: Vec<sage_protocol::registry::Provider> = serde_json::from_slice(&body).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].url, "http://a/sse");
    }

    #[tokio::test]
    async fn health_endpoint_reports_healthy() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
