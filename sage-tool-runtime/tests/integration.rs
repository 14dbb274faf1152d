//! End-to-end test of the `GET /sse` + `POST /messages` transport:
//! a real [`McpServer`] on a loopback port, driven by a real
//! [`McpClient`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sage_tool::{ToolDyn, ToolError, ToolRegistry};
use sage_tool_runtime::{McpClient, McpServer};
use serde_json::{json, Value};

struct AddTool;

impl ToolDyn for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Adds two integers"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer"},
                "b": {"type": "integer"},
            },
            "required": ["a", "b"],
        })
    }

    fn call(
        &self,
        input: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let a = input.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = input.get("b").and_then(Value::as_i64).unwrap_or(0);
            Ok(json!({ "sum": a + b }))
        })
    }
}

async fn spawn_test_server(registry: ToolRegistry) -> String {
    let server = McpServer::new(registry, "test-provider", "0.1.0");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = server.router();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    format!("http://{addr}/sse")
}

#[tokio::test]
async fn client_discovers_and_calls_a_real_server_over_sse() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(AddTool));
    let sse_url = spawn_test_server(registry).await;

    let client = McpClient::new(sse_url);
    client.initialize().await.expect("initialize should succeed");

    let tools = client.list_tools().await.expect("list_tools should succeed");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, "add");
    assert_eq!(tools[0].input_schema.required, vec!["a".to_string(), "b".to_string()]);

    let result = client
        .call_tool("add", json!({"a": 2, "b": 3}))
        .await
        .expect("call_tool should succeed");
    let text = result.as_str().expect("call_tool returns textual content");
    assert!(text.contains('5'), "expected the sum in the response, got {text}");
}

#[tokio::test]
async fn calling_an_unknown_tool_surfaces_as_an_error() {
    let sse_url = spawn_test_server(ToolRegistry::new()).await;
    let client = McpClient::new(sse_url);

    let err = client
        .call_tool("nonexistent", json!({}))
        .await
        .expect_err("calling an unregistered tool should fail");
    assert!(err.to_string().contains("nonexistent"));
}
