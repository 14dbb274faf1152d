//! Acceptance tests for `ToolRegistry`.

use sage_tool::{ToolDyn, ToolError, ToolRegistry};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

struct DescribeTableTool;

impl ToolDyn for DescribeTableTool {
    fn name(&self) -> &str {
        "describe_table"
    }
    fn description(&self) -> &str {
        "Describe a table's columns"
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({"type": "object", "properties": {"table_name": {"type": "string"}}})
    }
    fn call(
        &self,
        input: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let table = input["table_name"].as_str().unwrap_or_default();
            Ok(json!({"columns": [format!("{table}.id"), format!("{table}.created_at")]}))
        })
    }
}

#[tokio::test]
async fn register_and_call_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DescribeTableTool));

    let tool = registry.get("describe_table").unwrap();
    let result = tool.call(json!({"table_name": "orders"})).await.unwrap();
    assert_eq!(
        result,
        json!({"columns": ["orders.id", "orders.created_at"]})
    );
}

#[test]
fn get_unknown_tool_returns_none() {
    let registry = ToolRegistry::new();
    assert!(registry.get("nonexistent").is_none());
}

#[test]
fn iter_lists_all_registered_names() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(DescribeTableTool));
    let names: Vec<&str> = registry.iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["describe_table"]);
}
