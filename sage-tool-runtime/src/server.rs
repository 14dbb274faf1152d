//! Tool provider server: exposes a [`ToolRegistry`] over the `GET /sse`
//! plus `POST /messages` contract a [`McpClient`](crate::client::McpClient)
//! speaks (§6.4).
//!
//! Used by `sage-test-provider` to stand up a fake tool provider for
//! end-to-end tests, and by any real provider process built on this
//! crate instead of hand-rolling the transport.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::stream::{self, Stream};
use futures_util::StreamExt as _;
use sage_tool::ToolRegistry;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::error::McpError;

struct ServerState {
    registry: ToolRegistry,
    name: String,
    version: String,
    sessions: RwLock<HashMap<String, mpsc::UnboundedSender<String>>>,
    next_session: AtomicU64,
}

/// Serves a [`ToolRegistry`]'s tools to any [`McpClient`](crate::client::McpClient).
pub struct McpServer {
    state: Arc<ServerState>,
}

impl McpServer {
    /// Wrap a tool registry for serving.
    #[must_use]
    pub fn new(registry: ToolRegistry, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ServerState {
                registry,
                name: name.into(),
                version: version.into(),
                sessions: RwLock::new(HashMap::new()),
                next_session: AtomicU64::new(1),
            }),
        }
    }

    /// Build the axum router exposing `/sse`, `/messages`, `/health`,
    /// and `/metrics`.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/sse", get(sse_handler))
            .route("/messages", post(messages_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(Arc::clone(&self.state))
    }

    /// Bind `addr` and serve until the process is killed.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::Transport`] if the address cannot be bound.
    pub async fn serve(self, addr: SocketAddr) -> Result<(), McpError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        axum::serve(listener, self.router())
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Deserialize)]
struct JsonRpcFrame {
    id: String,
    method: String,
    #[serde(default)]
    params: Value,
}

async fn sse_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let session_id = state
        .next_session
        .fetch_add(1, Ordering::Relaxed)
        .to_string();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    state
        .sessions
        .write()
        .expect("lock poisoned")
        .insert(session_id.clone(), tx);

    let endpoint_event = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));
    let initial = stream::once(async move { Ok(endpoint_event) });
    let forwarded = UnboundedReceiverStream::new(rx)
        .map(|payload| Ok(Event::default().event("message").data(payload)));

    Sse::new(initial.chain(forwarded)).keep_alive(KeepAlive::default())
}

async fn messages_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SessionQuery>,
    Json(frame): Json<JsonRpcFrame>,
) -> impl IntoResponse {
    let response = match dispatch(&state.registry, &state.name, &state.version, &frame.method, frame.params).await {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": frame.id, "result": result }),
        Err(message) => json!({ "jsonrpc": "2.0", "id": frame.id, "error": { "message": message } }),
    };

    let sessions = state.sessions.read().expect("lock poisoned");
    match sessions.get(&query.session_id) {
        Some(sender) => {
            let _ = sender.send(response.to_string());
            StatusCode::ACCEPTED
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    format!(
        "# TYPE sage_tool_runtime_registered_tools gauge\nsage_tool_runtime_registered_tools {}\n",
        state.registry.len()
    )
}

/// Handle one JSON-RPC method against the registry. Shared by the axum
/// handler and the test suite below, which exercises it without a live
/// HTTP server.
async fn dispatch(
    registry: &ToolRegistry,
    name: &str,
    version: &str,
    method: &str,
    params: Value,
) -> Result<Value, String> {
    match method {
        "initialize" => Ok(json!({ "name": name, "version": version })),
        "list_tools" => {
            let tools: Vec<Value> = registry
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description(),
                        "inputSchema": tool.input_schema(),
                    })
                })
                .collect();
            Ok(json!({ "tools": tools }))
        }
        "call_tool" => {
            let tool_name = params
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| "call_tool requires a string `name`".to_string())?;
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

            let tool = registry
                .get(tool_name)
                .ok_or_else(|| format!("tool not found: {tool_name}"))?;

            match tool.call(arguments).await {
                Ok(result) => {
                    let text = result.as_str().map(str::to_string).unwrap_or_else(|| {
                        serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string())
                    });
                    Ok(json!({ "content": [{ "type": "text", "text": text }] }))
                }
                Err(e) => Ok(json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true,
                })),
            }
        }
        other => Err(format!("unknown method: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_tool::{ToolDyn, ToolError};
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;

    struct EchoTool;

    impl ToolDyn for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"msg": {"type": "string"}}})
        }
        fn call(
            &self,
            input: Value,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
            Box::pin(async move { Ok(input) })
        }
    }

    struct FailingTool;

    impl ToolDyn for FailingTool {
        fn name(&self) -> &str {
            "fail"
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn call(
            &self,
            _input: Value,
        ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
            Box::pin(async move { Err(ToolError::ExecutionFailed("deliberate".into())) })
        }
    }

    fn registry_with_echo() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(FailingTool));
        registry
    }

    #[test]
    fn server_constructs() {
        let server = McpServer::new(ToolRegistry::new(), "test-server", "0.1.0");
        assert_eq!(server.state.name, "test-server");
        assert_eq!(server.state.version, "0.1.0");
    }

    #[tokio::test]
    async fn initialize_reports_name_and_version() {
        let registry = ToolRegistry::new();
        let result = dispatch(&registry, "my-provider", "1.2.3", "initialize", json!({}))
            .await
            .unwrap();
        assert_eq!(result["name"], "my-provider");
        assert_eq!(result["version"], "1.2.3");
    }

    #[tokio::test]
    async fn list_tools_reflects_the_registry() {
        let registry = registry_with_echo();
        let result = dispatch(&registry, "p", "1", "list_tools", json!({}))
            .await
            .unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().any(|t| t["name"] == "echo"));
    }

    #[tokio::test]
    async fn call_tool_success_returns_text_content() {
        let registry = registry_with_echo();
        let result = dispatch(
            &registry,
            "p",
            "1",
            "call_tool",
            json!({"name": "echo", "arguments": {"msg": "hi"}}),
        )
        .await
        .unwrap();
        let content = result["content"][0]["text"].as_str().unwrap();
        assert!(content.contains("hi"));
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn call_tool_failure_sets_is_error() {
        let registry = registry_with_echo();
        let result = dispatch(&registry, "p", "1", "call_tool", json!({"name": "fail"}))
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
    }

    #[tokio::test]
    async fn call_tool_unknown_name_is_a_dispatch_error() {
        let registry = registry_with_echo();
        let err = dispatch(&registry, "p", "1", "call_tool", json!({"name": "nope"}))
            .await
            .unwrap_err();
        assert!(err.contains("nope"));
    }

    #[tokio::test]
    async fn unknown_method_is_a_dispatch_error() {
        let registry = ToolRegistry::new();
        let err = dispatch(&registry, "p", "1", "frobnicate", json!({}))
            .await
            .unwrap_err();
        assert!(err.contains("frobnicate"));
    }
}
